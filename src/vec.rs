//! A contiguous growable array type that stores its first `N` elements inline.
//!
//! [`InlinedVec`] behaves like `alloc::vec::Vec`, except that it does not
//! touch its allocator as long as it holds at most `N` elements. Once it
//! outgrows its inline buffer, the elements move to an allocated buffer that
//! at least doubles in size whenever it fills up. [`shrink_to_fit`] moves
//! them back inline when they fit again.
//!
//! Operations that may need to allocate or to construct elements from
//! fallible sources come in two flavors: a `try_` version returning an
//! [`Error`](crate::Error) (or an [`AllocError`]), and a convenience version
//! that panics instead. Failed operations leave the vector as it was, with
//! one exception noted on [`try_assign`].
//!
//! [`shrink_to_fit`]: InlinedVec::shrink_to_fit
//! [`try_assign`]: InlinedVec::try_assign

use crate::adapter::{
    CopySliceValueAdapter, DefaultValueAdapter, FillValueAdapter, FromFnValueAdapter,
    IteratorValueAdapter, MoveValueAdapter, SliceValueAdapter,
};
use crate::allocator::{Allocator, Global};
use crate::error::{handle_error, AllocError, ConstructionError, Error};
use crate::storage::Storage;

use core::hash::{Hash, Hasher};
use core::mem::ManuallyDrop;
use core::ops::{Bound, RangeBounds};
use core::ptr;
use core::slice::SliceIndex;

/// A contiguous growable array type with `N` elements of inline capacity.
///
/// Generic over the element type `T`, the inline capacity `N` and the
/// allocator `A` used once the inline buffer overflows.
///
/// See the [module-level documentation](crate::vec) for more.
pub struct InlinedVec<T, const N: usize, A: Allocator = Global> {
    storage: Storage<T, N, A>,
}

#[inline]
fn or_handle<R>(result: Result<R, Error>) -> R {
    match result {
        Ok(value) => value,
        Err(err) => handle_error(err),
    }
}

impl<T, const N: usize> InlinedVec<T, N> {
    /// Constructs a new, empty `InlinedVec` using the global allocator.
    ///
    /// # Examples
    /// ```
    /// let vec = inlined::InlinedVec::<u32, 6>::new();
    /// assert_eq!(vec.capacity(), 6);
    /// assert_eq!(vec.len(), 0);
    /// ```
    #[inline]
    pub const fn new() -> Self {
        Self::new_in(Global)
    }
}

impl<T, const N: usize, A: Allocator + Default> InlinedVec<T, N, A> {
    /// Constructs a vector holding `n` clones of `value`.
    ///
    /// # Panics
    /// Panics if the allocator fails. See [`try_from_elem`](InlinedVec::try_from_elem)
    /// for a checked version.
    pub fn from_elem(value: T, n: usize) -> Self
    where
        T: Clone,
    {
        or_handle(Self::try_from_elem(value, n))
    }

    /// Constructs a vector holding `n` clones of `value`, or returns an error
    /// if the allocator fails.
    ///
    /// # Examples
    /// ```
    /// let vec = inlined::InlinedVec::<u8, 4>::try_from_elem(7, 3).unwrap();
    /// assert_eq!(vec, [7, 7, 7]);
    /// ```
    pub fn try_from_elem(value: T, n: usize) -> crate::Result<Self>
    where
        T: Clone,
    {
        let mut vec = Self::default();
        vec.storage.initialize(FillValueAdapter::new(&value), n)?;
        Ok(vec)
    }

    /// Constructs a vector holding copies of the elements of `values`.
    ///
    /// # Examples
    /// ```
    /// let vec = inlined::InlinedVec::<u8, 2>::from_slice(&[1, 2, 3]);
    /// assert!(vec.is_allocated());
    /// assert_eq!(vec, [1, 2, 3]);
    /// ```
    pub fn from_slice(values: &[T]) -> Self
    where
        T: Copy,
    {
        let mut vec = Self::default();
        or_handle(
            vec.storage
                .initialize(CopySliceValueAdapter::new(values), values.len()),
        );
        vec
    }

    /// Constructs a vector holding `produce(0)`, `produce(1)`, ... up to
    /// `produce(n - 1)`, stopping at the first error.
    pub fn try_from_fn<F>(n: usize, produce: F) -> crate::Result<Self>
    where
        F: FnMut(usize) -> Result<T, ConstructionError>,
    {
        let mut vec = Self::default();
        vec.storage.initialize(FromFnValueAdapter::new(produce), n)?;
        Ok(vec)
    }

    /// Constructs a vector holding `n` default values.
    pub fn with_default(n: usize) -> Self
    where
        T: Default,
    {
        let mut vec = Self::default();
        or_handle(vec.storage.initialize(DefaultValueAdapter::new(), n));
        vec
    }
}

impl<T, const N: usize, A: Allocator> InlinedVec<T, N, A> {
    /// Constructs a new, empty `InlinedVec` that allocates from `allocator`
    /// once it outgrows its inline buffer.
    #[inline]
    pub const fn new_in(allocator: A) -> Self {
        InlinedVec {
            storage: Storage::new_in(allocator),
        }
    }

    /// Returns a reference to the underlying allocator.
    #[inline]
    pub fn allocator(&self) -> &A {
        self.storage.allocator()
    }

    /// Returns the number of elements in the vector.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.size()
    }

    /// Returns `true` if the vector contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of elements the vector can hold without allocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Returns the number of elements the inline buffer can hold.
    #[inline]
    pub const fn inline_capacity(&self) -> usize {
        N
    }

    /// Returns `true` if the elements live in an allocated buffer.
    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.storage.is_allocated()
    }

    /// Extracts a slice containing the entire vector.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.storage.as_slice()
    }

    /// Extracts a mutable slice of the entire vector.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.storage.as_mut_slice()
    }

    /// Returns a raw pointer to the vector's buffer.
    ///
    /// The pointer is invalidated by any operation that may move the
    /// elements, including moving the vector itself while it is inline.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.storage.data()
    }

    /// Returns an unsafe mutable pointer to the vector's buffer.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.storage.data_mut()
    }

    /// Appends an element to the back of the vector, returning a reference
    /// to it.
    ///
    /// # Panics
    /// Panics if the allocator fails. See [`try_push`](InlinedVec::try_push)
    /// for a checked version.
    ///
    /// # Examples
    /// ```
    /// let mut vec = inlined::InlinedVec::<u32, 2>::new();
    /// vec.push(1);
    /// vec.push(2);
    /// assert!(!vec.is_allocated());
    /// *vec.push(3) += 10;
    /// assert!(vec.is_allocated());
    /// assert_eq!(vec, [1, 2, 13]);
    /// ```
    #[inline]
    pub fn push(&mut self, value: T) -> &mut T {
        match self.storage.emplace_back(value) {
            Ok(last) => last,
            Err(err) => handle_error(err.into()),
        }
    }

    /// Appends an element to the back of the vector, or returns an error if
    /// the allocator fails.
    #[inline]
    pub fn try_push(&mut self, value: T) -> Result<&mut T, AllocError> {
        self.storage.emplace_back(value)
    }

    /// Appends the value produced by `make` to the back of the vector.
    ///
    /// Any room needed is made before `make` is called; if it fails, the
    /// vector is left unchanged.
    #[inline]
    pub fn try_push_with<F>(&mut self, make: F) -> crate::Result<&mut T>
    where
        F: FnOnce() -> Result<T, ConstructionError>,
    {
        self.storage.emplace_back_with(make)
    }

    /// Removes the last element from the vector and returns it, or [`None`]
    /// if it is empty.
    ///
    /// # Examples
    /// ```
    /// let mut vec = inlined::InlinedVec::<u32, 4>::from([1, 2, 3]);
    /// assert_eq!(vec.pop(), Some(3));
    /// assert_eq!(vec, [1, 2]);
    /// ```
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.storage.pop_back()
    }

    /// Inserts an element at position `index`, shifting all elements after
    /// it to the right, and returns a reference to it.
    ///
    /// # Panics
    /// Panics if `index > len`, or if the allocator fails.
    ///
    /// # Examples
    /// ```
    /// let mut vec = inlined::InlinedVec::<u32, 4>::from([1, 2, 3]);
    /// vec.insert(1, 4);
    /// assert_eq!(vec, [1, 4, 2, 3]);
    /// vec.insert(4, 5);
    /// assert_eq!(vec, [1, 4, 2, 3, 5]);
    /// ```
    pub fn insert(&mut self, index: usize, value: T) -> &mut T {
        or_handle(self.try_insert(index, value))
    }

    /// Inserts an element at position `index`, or returns an error if the
    /// allocator fails.
    ///
    /// # Panics
    /// Panics if `index > len`.
    pub fn try_insert(&mut self, index: usize, value: T) -> crate::Result<&mut T> {
        let values = IteratorValueAdapter::new(core::iter::once(value));
        let index = self.storage.insert(index, values, 1)?;
        Ok(&mut self.as_mut_slice()[index])
    }

    /// Inserts `n` clones of `value` at position `index`.
    ///
    /// # Panics
    /// Panics if `index > len`, or if the allocator fails.
    pub fn insert_n(&mut self, index: usize, n: usize, value: &T)
    where
        T: Clone,
    {
        or_handle(self.try_insert_n(index, n, value));
    }

    /// Inserts `n` clones of `value` at position `index`, or returns an error
    /// if the allocator fails.
    ///
    /// # Panics
    /// Panics if `index > len`.
    pub fn try_insert_n(&mut self, index: usize, n: usize, value: &T) -> crate::Result<()>
    where
        T: Clone,
    {
        self.storage.insert(index, FillValueAdapter::new(value), n)?;
        Ok(())
    }

    /// Inserts clones of the elements of `values` at position `index`.
    ///
    /// # Panics
    /// Panics if `index > len`, or if the allocator fails.
    ///
    /// # Examples
    /// ```
    /// let mut vec = inlined::InlinedVec::<u32, 4>::from([1, 5]);
    /// vec.insert_slice(1, &[2, 3, 4]);
    /// assert_eq!(vec, [1, 2, 3, 4, 5]);
    /// ```
    pub fn insert_slice(&mut self, index: usize, values: &[T])
    where
        T: Clone,
    {
        or_handle(self.try_insert_slice(index, values));
    }

    /// Inserts clones of the elements of `values` at position `index`, or
    /// returns an error if the allocator fails.
    ///
    /// # Panics
    /// Panics if `index > len`.
    pub fn try_insert_slice(&mut self, index: usize, values: &[T]) -> crate::Result<()>
    where
        T: Clone,
    {
        self.storage
            .insert(index, SliceValueAdapter::new(values), values.len())?;
        Ok(())
    }

    /// Inserts `produce(0)`, `produce(1)`, ... up to `produce(n - 1)` at
    /// position `index`.
    ///
    /// If `produce` fails, the elements produced so far are dropped and the
    /// vector is left unchanged.
    ///
    /// # Panics
    /// Panics if `index > len`.
    pub fn try_insert_with<F>(&mut self, index: usize, n: usize, produce: F) -> crate::Result<()>
    where
        F: FnMut(usize) -> Result<T, ConstructionError>,
    {
        self.storage
            .insert(index, FromFnValueAdapter::new(produce), n)?;
        Ok(())
    }

    /// Appends clones of the elements of `values` to the back of the vector.
    ///
    /// # Panics
    /// Panics if the allocator fails.
    pub fn extend_from_slice(&mut self, values: &[T])
    where
        T: Clone,
    {
        let len = self.len();
        self.insert_slice(len, values);
    }

    /// Moves all elements of `other` to the back of the vector, leaving
    /// `other` empty.
    ///
    /// # Panics
    /// Panics if the allocator fails.
    ///
    /// # Examples
    /// ```
    /// let mut a = inlined::InlinedVec::<u32, 2>::from([1, 2]);
    /// let mut b = inlined::InlinedVec::<u32, 8>::from([3, 4, 5]);
    /// a.append(&mut b);
    /// assert_eq!(a, [1, 2, 3, 4, 5]);
    /// assert!(b.is_empty());
    /// ```
    pub fn append<const M: usize, B: Allocator>(&mut self, other: &mut InlinedVec<T, M, B>) {
        if let Err(err) = self.try_append(other) {
            handle_error(err.into());
        }
    }

    /// Moves all elements of `other` to the back of the vector, or returns
    /// an error if the allocator fails, in which case neither vector changes.
    pub fn try_append<const M: usize, B: Allocator>(
        &mut self,
        other: &mut InlinedVec<T, M, B>,
    ) -> Result<(), AllocError> {
        let len = self.len();
        let count = other.len();
        let values = unsafe { MoveValueAdapter::new(other.as_ptr()) };

        match self.storage.insert(len, values, count) {
            Ok(_) => {
                unsafe { other.storage.set_size(0) };
                Ok(())
            }
            Err(Error::Alloc(err)) => Err(err),
            Err(Error::Construction(_)) => unreachable!("moving elements cannot fail"),
        }
    }

    /// Removes and returns the element at position `index`, shifting all
    /// elements after it to the left.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    ///
    /// # Examples
    /// ```
    /// let mut vec = inlined::InlinedVec::<u32, 4>::from([1, 2, 3]);
    /// assert_eq!(vec.remove(0), 1);
    /// assert_eq!(vec, [2, 3]);
    /// ```
    pub fn remove(&mut self, index: usize) -> T {
        #[cold]
        #[inline(never)]
        fn assert_failed(index: usize, len: usize) -> ! {
            panic!("removal index (is {}) should be < len (is {})", index, len);
        }

        let len = self.len();
        if index >= len {
            assert_failed(index, len);
        }

        unsafe {
            let p = self.as_mut_ptr().add(index);
            let ret = ptr::read(p);
            ptr::copy(p.add(1), p, len - index - 1);
            self.storage.set_size(len - 1);
            ret
        }
    }

    /// Removes the elements in `range`, shifting all elements after them to
    /// the left, and returns the index of the first element after the
    /// removed ones.
    ///
    /// # Panics
    /// Panics if the start of the range is greater than its end, or if the
    /// end is greater than the length of the vector.
    ///
    /// # Examples
    /// ```
    /// let mut vec = inlined::InlinedVec::<u32, 4>::from([1, 2, 3, 4, 5]);
    /// assert_eq!(vec.erase(1..3), 1);
    /// assert_eq!(vec, [1, 4, 5]);
    /// vec.erase(..=1);
    /// assert_eq!(vec, [5]);
    /// ```
    pub fn erase<R: RangeBounds<usize>>(&mut self, range: R) -> usize {
        let start = match range.start_bound() {
            Bound::Included(&x) => x,
            Bound::Excluded(&x) => x.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&x) => x.saturating_add(1),
            Bound::Excluded(&x) => x,
            Bound::Unbounded => self.len(),
        };

        self.storage.erase(start, end)
    }

    /// Shortens the vector, keeping the first `len` elements and dropping the
    /// rest.
    ///
    /// If `len` is greater than the vector's current length, this has no
    /// effect. The capacity is left unchanged.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        let old_len = self.len();
        if len < old_len {
            self.storage.erase(len, old_len);
        }
    }

    /// Clears the vector, dropping all values.
    #[inline]
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Resizes the vector in place so that its length equals `new_len`,
    /// filling any new slots with clones of `value`.
    ///
    /// # Panics
    /// Panics if the allocator fails.
    ///
    /// # Examples
    /// ```
    /// let mut vec = inlined::InlinedVec::<u32, 4>::from([1]);
    /// vec.resize(3, 9);
    /// assert_eq!(vec, [1, 9, 9]);
    /// vec.resize(1, 0);
    /// assert_eq!(vec, [1]);
    /// ```
    pub fn resize(&mut self, new_len: usize, value: T)
    where
        T: Clone,
    {
        or_handle(self.try_resize(new_len, value));
    }

    /// Like [`resize`](InlinedVec::resize), but returns an error if the
    /// allocator fails.
    pub fn try_resize(&mut self, new_len: usize, value: T) -> crate::Result<()>
    where
        T: Clone,
    {
        self.storage.resize(FillValueAdapter::new(&value), new_len)
    }

    /// Resizes the vector in place so that its length equals `new_len`,
    /// filling any new slots with `T::default()`.
    ///
    /// # Panics
    /// Panics if the allocator fails.
    pub fn resize_default(&mut self, new_len: usize)
    where
        T: Default,
    {
        or_handle(self.try_resize_default(new_len));
    }

    /// Like [`resize_default`](InlinedVec::resize_default), but returns an
    /// error if the allocator fails.
    pub fn try_resize_default(&mut self, new_len: usize) -> crate::Result<()>
    where
        T: Default,
    {
        self.storage.resize(DefaultValueAdapter::new(), new_len)
    }

    /// Resizes the vector in place so that its length equals `new_len`,
    /// filling any new slots with `produce(0)`, `produce(1)`, ...
    ///
    /// If `produce` fails, the vector is left unchanged.
    pub fn try_resize_with<F>(&mut self, new_len: usize, produce: F) -> crate::Result<()>
    where
        F: FnMut(usize) -> Result<T, ConstructionError>,
    {
        self.storage.resize(FromFnValueAdapter::new(produce), new_len)
    }

    /// Replaces the contents of the vector with `n` clones of `value`.
    ///
    /// # Panics
    /// Panics if the allocator fails.
    pub fn assign(&mut self, n: usize, value: &T)
    where
        T: Clone,
    {
        or_handle(self.try_assign(n, value));
    }

    /// Replaces the contents of the vector with `n` clones of `value`, or
    /// returns an error if the allocator fails.
    ///
    /// If the new contents fit into the current buffer, existing elements are
    /// assigned over in place; a panicking `clone` part way through leaves
    /// the elements assigned so far with their new values.
    pub fn try_assign(&mut self, n: usize, value: &T) -> crate::Result<()>
    where
        T: Clone,
    {
        self.storage.assign(FillValueAdapter::new(value), n)
    }

    /// Replaces the contents of the vector with clones of the elements of
    /// `values`.
    ///
    /// # Panics
    /// Panics if the allocator fails.
    ///
    /// # Examples
    /// ```
    /// let mut vec = inlined::InlinedVec::<u32, 2>::from([1, 2, 3, 4]);
    /// vec.assign_slice(&[5, 6]);
    /// assert_eq!(vec, [5, 6]);
    /// assert!(vec.is_allocated());
    /// ```
    pub fn assign_slice(&mut self, values: &[T])
    where
        T: Clone,
    {
        or_handle(self.try_assign_slice(values));
    }

    /// Like [`assign_slice`](InlinedVec::assign_slice), but returns an error
    /// if the allocator fails.
    pub fn try_assign_slice(&mut self, values: &[T]) -> crate::Result<()>
    where
        T: Clone,
    {
        self.storage
            .assign(SliceValueAdapter::new(values), values.len())
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// # Panics
    /// Panics if the new capacity overflows, or if the allocator fails.
    ///
    /// # Examples
    /// ```
    /// let mut vec = inlined::InlinedVec::<u32, 4>::from([1]);
    /// vec.reserve(3);
    /// assert!(!vec.is_allocated());
    /// vec.reserve(10);
    /// assert!(vec.capacity() >= 11);
    /// ```
    pub fn reserve(&mut self, additional: usize) {
        if let Err(err) = self.try_reserve(additional) {
            handle_error(err.into());
        }
    }

    /// Reserves capacity for at least `additional` more elements, or returns
    /// an error if that is not possible.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        let requested = self
            .len()
            .checked_add(additional)
            .ok_or(AllocError::CapacityOverflow)?;
        self.storage.reserve(requested)
    }

    /// Shrinks the capacity of the vector as much as possible, moving the
    /// elements back into the inline buffer if they fit.
    ///
    /// # Panics
    /// Panics if the allocator fails.
    ///
    /// # Examples
    /// ```
    /// let mut vec = inlined::InlinedVec::<u32, 4>::from([1, 2, 3, 4, 5]);
    /// vec.pop();
    /// vec.shrink_to_fit();
    /// assert!(!vec.is_allocated());
    /// assert_eq!(vec.capacity(), 4);
    /// ```
    pub fn shrink_to_fit(&mut self) {
        if let Err(err) = self.try_shrink_to_fit() {
            handle_error(err.into());
        }
    }

    /// Like [`shrink_to_fit`](InlinedVec::shrink_to_fit), but returns an
    /// error if the allocator fails.
    #[inline]
    pub fn try_shrink_to_fit(&mut self) -> Result<(), AllocError> {
        self.storage.shrink_to_fit()
    }

    /// Exchanges the contents of two vectors, including their allocators.
    ///
    /// Allocated buffers change hands without copying any elements.
    #[inline]
    pub fn swap_with(&mut self, other: &mut Self) {
        self.storage.swap(&mut other.storage);
    }
}

impl<T, const N: usize, A: Allocator> core::ops::Deref for InlinedVec<T, N, A> {
    type Target = [T];
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, const N: usize, A: Allocator> core::ops::DerefMut for InlinedVec<T, N, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, I, const N: usize, A> core::ops::Index<I> for InlinedVec<T, N, A>
where
    I: SliceIndex<[T]>,
    A: Allocator,
{
    type Output = I::Output;
    #[inline]
    fn index(&self, index: I) -> &Self::Output {
        core::ops::Index::index(self.as_slice(), index)
    }
}

impl<T, I, const N: usize, A> core::ops::IndexMut<I> for InlinedVec<T, N, A>
where
    I: SliceIndex<[T]>,
    A: Allocator,
{
    #[inline]
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        core::ops::IndexMut::index_mut(self.as_mut_slice(), index)
    }
}

impl<T, const N: usize, A: Allocator> core::convert::AsRef<[T]> for InlinedVec<T, N, A> {
    fn as_ref(&self) -> &[T] {
        self
    }
}

impl<T, const N: usize, A: Allocator> core::convert::AsMut<[T]> for InlinedVec<T, N, A> {
    fn as_mut(&mut self) -> &mut [T] {
        self
    }
}

impl<T, const N: usize, A: Allocator + Default> Default for InlinedVec<T, N, A> {
    #[inline]
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T, const N: usize, A> Clone for InlinedVec<T, N, A>
where
    T: Clone,
    A: Allocator + Clone,
{
    fn clone(&self) -> Self {
        let mut storage = Storage::new_in(self.allocator().clone());
        or_handle(storage.init_from(&self.storage));
        InlinedVec { storage }
    }

    fn clone_from(&mut self, source: &Self) {
        self.assign_slice(source.as_slice());
    }
}

impl<T: core::fmt::Debug, const N: usize, A: Allocator> core::fmt::Debug for InlinedVec<T, N, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.as_slice().fmt(f)
    }
}

impl<T: Hash, const N: usize, A: Allocator> Hash for InlinedVec<T, N, A> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        Hash::hash(self.as_slice(), state)
    }
}

impl<T, U, const N: usize, const M: usize, A, B> PartialEq<InlinedVec<U, M, B>>
    for InlinedVec<T, N, A>
where
    T: PartialEq<U>,
    A: Allocator,
    B: Allocator,
{
    #[inline]
    fn eq(&self, other: &InlinedVec<U, M, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, const N: usize, A: Allocator> Eq for InlinedVec<T, N, A> {}

impl<T, U, const N: usize, A> PartialEq<[U]> for InlinedVec<T, N, A>
where
    T: PartialEq<U>,
    A: Allocator,
{
    #[inline]
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<T, U, const N: usize, A> PartialEq<&[U]> for InlinedVec<T, N, A>
where
    T: PartialEq<U>,
    A: Allocator,
{
    #[inline]
    fn eq(&self, other: &&[U]) -> bool {
        self.as_slice() == *other
    }
}

impl<T, U, const N: usize, A> PartialEq<&mut [U]> for InlinedVec<T, N, A>
where
    T: PartialEq<U>,
    A: Allocator,
{
    #[inline]
    fn eq(&self, other: &&mut [U]) -> bool {
        self.as_slice() == &other[..]
    }
}

impl<T, U, const N: usize, const M: usize, A> PartialEq<[U; M]> for InlinedVec<T, N, A>
where
    T: PartialEq<U>,
    A: Allocator,
{
    #[inline]
    fn eq(&self, other: &[U; M]) -> bool {
        self.as_slice() == &other[..]
    }
}

impl<T, U, const N: usize, A> PartialEq<InlinedVec<U, N, A>> for &[T]
where
    T: PartialEq<U>,
    A: Allocator,
{
    #[inline]
    fn eq(&self, other: &InlinedVec<U, N, A>) -> bool {
        *self == other.as_slice()
    }
}

impl<T, U, const N: usize, const M: usize, A> PartialEq<InlinedVec<U, N, A>> for [T; M]
where
    T: PartialEq<U>,
    A: Allocator,
{
    #[inline]
    fn eq(&self, other: &InlinedVec<U, N, A>) -> bool {
        &self[..] == other.as_slice()
    }
}

impl<T: PartialOrd, const N: usize, A: Allocator> PartialOrd for InlinedVec<T, N, A> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        self.as_slice().partial_cmp(other.as_slice())
    }
}

impl<T: Ord, const N: usize, A: Allocator> Ord for InlinedVec<T, N, A> {
    #[inline]
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl<T, const N: usize, A: Allocator> core::iter::Extend<T> for InlinedVec<T, N, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for element in iter {
            self.push(element);
        }
    }
}

impl<'a, T: Copy + 'a, const N: usize, A: Allocator> core::iter::Extend<&'a T>
    for InlinedVec<T, N, A>
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T, const N: usize, A: Allocator + Default> FromIterator<T> for InlinedVec<T, N, A> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut vec = Self::default();
        vec.extend(iter);
        vec
    }
}

impl<T, const N: usize, const M: usize, A: Allocator + Default> From<[T; M]>
    for InlinedVec<T, N, A>
{
    fn from(array: [T; M]) -> Self {
        let array = ManuallyDrop::new(array);
        let mut vec = Self::default();

        let values = unsafe { MoveValueAdapter::new(array.as_ptr()) };
        if let Err(err) = vec.storage.initialize(values, M) {
            // nothing was moved out yet
            drop(ManuallyDrop::into_inner(array));
            handle_error(err);
        }

        vec
    }
}

impl<T: Clone, const N: usize, A: Allocator + Default> From<&[T]> for InlinedVec<T, N, A> {
    fn from(source: &[T]) -> Self {
        let mut vec = Self::default();
        or_handle(
            vec.storage
                .initialize(SliceValueAdapter::new(source), source.len()),
        );
        vec
    }
}

/// An iterator that moves out of an [`InlinedVec`].
///
/// This `struct` is created by the `into_iter` method on [`InlinedVec`]
/// (provided by the [`IntoIterator`](core::iter::IntoIterator) trait).
///
/// # Example
/// ```
/// let vec = inlined::InlinedVec::<u32, 4>::from([1, 2]);
/// let mut iter: inlined::vec::IntoIter<_, 4> = vec.into_iter();
/// # assert_eq!(iter.next(), Some(1));
/// # assert_eq!(iter.next(), Some(2));
/// # assert_eq!(iter.next(), None);
/// ```
pub struct IntoIter<T, const N: usize, A: Allocator = Global> {
    storage: Storage<T, N, A>,
    start: usize,
    end: usize,
}

impl<T, const N: usize, A: Allocator> IntoIter<T, N, A> {
    /// Returns the remaining items of this iterator as a slice.
    pub fn as_slice(&self) -> &[T] {
        unsafe {
            core::slice::from_raw_parts(self.storage.data().add(self.start), self.end - self.start)
        }
    }
}

impl<T, const N: usize, A: Allocator> Iterator for IntoIter<T, N, A> {
    type Item = T;

    fn size_hint(&self) -> (usize, Option<usize>) {
        let size = self.end - self.start;
        (size, Some(size))
    }

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.start >= self.end {
            return None;
        }

        let ret = unsafe { self.storage.data().add(self.start).read() };
        self.start += 1;
        Some(ret)
    }
}

impl<T, const N: usize, A: Allocator> core::iter::DoubleEndedIterator for IntoIter<T, N, A> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.start >= self.end {
            return None;
        }

        self.end -= 1;
        unsafe { Some(self.storage.data().add(self.end).read()) }
    }
}

impl<T, const N: usize, A: Allocator> core::iter::ExactSizeIterator for IntoIter<T, N, A> {}

impl<T, const N: usize, A: Allocator> core::iter::FusedIterator for IntoIter<T, N, A> {}

impl<T: core::fmt::Debug, const N: usize, A: Allocator> core::fmt::Debug for IntoIter<T, N, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}

impl<T, const N: usize, A: Allocator> Drop for IntoIter<T, N, A> {
    fn drop(&mut self) {
        self.for_each(drop);
    }
}

impl<T, const N: usize, A: Allocator> IntoIterator for InlinedVec<T, N, A> {
    type Item = T;
    type IntoIter = IntoIter<T, N, A>;

    fn into_iter(self) -> Self::IntoIter {
        let InlinedVec { mut storage } = self;
        let end = storage.size();
        // the iterator owns the elements from here on
        unsafe { storage.set_size(0) };

        IntoIter {
            storage,
            start: 0,
            end,
        }
    }
}

impl<'a, T, const N: usize, A: Allocator> IntoIterator for &'a InlinedVec<T, N, A> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<'a, T, const N: usize, A: Allocator> IntoIterator for &'a mut InlinedVec<T, N, A> {
    type Item = &'a mut T;
    type IntoIter = core::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_mut_slice().iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    use alloc::vec::Vec;

    #[test]
    fn sizes_of_instantiated_types() {
        use core::mem::size_of;

        assert_eq!(size_of::<InlinedVec<usize, 2>>(), 3 * size_of::<usize>());
        assert_eq!(size_of::<InlinedVec<u8, 1>>(), 3 * size_of::<usize>());
        assert_eq!(size_of::<InlinedVec<usize, 4>>(), 5 * size_of::<usize>());
    }

    #[test]
    fn push_spills_to_the_heap_and_pops_back() {
        let mut vec = InlinedVec::<u32, 3>::new();
        for i in 0..3 {
            vec.push(i);
        }
        assert!(!vec.is_allocated());
        vec.push(3);
        assert!(vec.is_allocated());
        assert_eq!(vec.capacity(), 6);
        assert_eq!(vec.inline_capacity(), 3);

        assert_eq!(vec.pop(), Some(3));
        assert_eq!(vec, [0, 1, 2]);
        vec.clear();
        assert_eq!(vec.pop(), None);
        assert!(vec.is_empty());
        assert!(vec.is_allocated());
    }

    #[test]
    fn insert_and_remove() {
        let mut vec = InlinedVec::<u32, 4>::from([1, 2, 3]);
        *vec.insert(0, 0) += 10;
        assert_eq!(vec, [10, 1, 2, 3]);
        vec.insert_n(2, 3, &7);
        assert_eq!(vec, [10, 1, 7, 7, 7, 2, 3]);
        vec.extend_from_slice(&[8, 9]);
        assert_eq!(vec.remove(1), 1);
        assert_eq!(vec.remove(7), 9);
        assert_eq!(vec, [10, 7, 7, 7, 2, 3, 8]);

        vec.erase(1..4);
        assert_eq!(vec, [10, 2, 3, 8]);
        vec.erase(2..);
        assert_eq!(vec, [10, 2]);
        vec.truncate(5);
        assert_eq!(vec, [10, 2]);
        vec.truncate(1);
        assert_eq!(vec, [10]);
    }

    #[test]
    #[should_panic(expected = "removal index (is 2) should be < len (is 2)")]
    fn remove_out_of_bounds_panics() {
        let mut vec = InlinedVec::<u32, 4>::from([1, 2]);
        vec.remove(2);
    }

    #[test]
    fn assign_survives_a_panicking_destructor() {
        use std::panic::{catch_unwind, AssertUnwindSafe};

        let drop_count = DropCounter::new();
        let source: Vec<_> = (0..5).map(|i| PanicOnDrop::new(&drop_count, i, false)).collect();
        {
            let mut vec = InlinedVec::<PanicOnDrop<'_>, 2>::new();
            vec.push(PanicOnDrop::new(&drop_count, 10, true));
            vec.push(PanicOnDrop::new(&drop_count, 11, false));

            let result = catch_unwind(AssertUnwindSafe(|| vec.assign_slice(&source)));
            assert!(result.is_err());
            assert!(vec.is_empty());
            assert_eq!(drop_count.dropped(), 7);
        }
        drop(source);
        assert_eq!(drop_count.created(), 12);
        assert_eq!(drop_count.dropped(), 12);
    }

    #[test]
    fn fallible_producers_leave_vector_unchanged() {
        let drop_count = DropCounter::new();
        let mut vec = InlinedVec::<Droppable<'_, u32>, 2>::new();
        vec.push(drop_count.new_droppable(1));
        vec.push(drop_count.new_droppable(2));

        let produce = |i: usize| {
            if i < 3 {
                Ok(drop_count.new_droppable(10 + i as u32))
            } else {
                Err(ConstructionError::new())
            }
        };

        assert!(vec.try_insert_with(1, 5, produce).is_err());
        assert!(vec.try_resize_with(6, produce).is_err());
        assert!(vec.try_push_with(|| Err(ConstructionError::new())).is_err());
        assert_eq!(vec.len(), 2);
        assert!(!vec.is_allocated());
        assert_eq!(drop_count.live(), 2);

        vec.try_insert_with(1, 3, produce).unwrap();
        let values: Vec<u32> = vec.iter().map(|d| d.value).collect();
        assert_eq!(values, [1, 10, 11, 12, 2]);
    }

    #[test]
    fn try_from_fn_drops_partial_results() {
        let drop_count = DropCounter::new();
        let result = InlinedVec::<Droppable<'_, usize>, 2>::try_from_fn(5, |i| {
            if i < 4 {
                Ok(drop_count.new_droppable(i))
            } else {
                Err(ConstructionError::new())
            }
        });

        assert_eq!(
            result.map(|vec| vec.len()),
            Err(Error::Construction(ConstructionError::new()))
        );
        assert_eq!(drop_count.created(), 4);
        assert_eq!(drop_count.dropped(), 4);
    }

    #[test]
    fn constructors() {
        let vec = InlinedVec::<u8, 2>::from_elem(5, 3);
        assert_eq!(vec, [5, 5, 5]);
        let vec = InlinedVec::<u8, 2>::with_default(2);
        assert_eq!(vec, [0, 0]);
        assert!(!vec.is_allocated());
        let vec = InlinedVec::<u8, 2>::from(&[1u8, 2, 3][..]);
        assert_eq!(vec, &[1, 2, 3][..]);
        let vec: InlinedVec<u8, 2> = (1..=4).collect();
        assert_eq!(vec, InlinedVec::<u8, 8>::from_slice(&[1, 2, 3, 4]));
    }

    #[test]
    fn resize_and_assign() {
        let mut vec = InlinedVec::<u32, 4>::new();
        vec.resize(6, 1);
        assert_eq!(vec, [1; 6]);
        vec.resize_default(8);
        assert_eq!(vec, [1, 1, 1, 1, 1, 1, 0, 0]);
        vec.assign(3, &4);
        assert_eq!(vec, [4, 4, 4]);
        assert_eq!(vec.capacity(), 8);
        vec.assign_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(vec.capacity(), 16);
        assert_eq!(vec.len(), 9);
    }

    #[test]
    fn reserve_and_shrink() {
        let mut vec = InlinedVec::<u32, 4>::from([1, 2]);
        vec.reserve(2);
        assert!(!vec.is_allocated());
        vec.reserve(3);
        assert_eq!(vec.capacity(), 8);
        assert_eq!(vec.try_reserve(usize::MAX), Err(AllocError::CapacityOverflow));

        vec.shrink_to_fit();
        assert!(!vec.is_allocated());
        assert_eq!(vec, [1, 2]);
    }

    #[test]
    fn failing_allocator_is_reported() {
        let stats = AllocStats::new();
        let mut vec = InlinedVec::<u32, 1, _>::new_in(CountingAllocator::new(&stats));
        vec.push(1);

        stats.fail_next_allocation();
        assert!(matches!(vec.try_push(2), Err(AllocError::AllocFailed { .. })));
        stats.fail_next_allocation();
        assert!(vec.try_insert(0, 2).is_err());
        assert_eq!(vec, [1]);

        let mut other = InlinedVec::<u32, 4>::from([2, 3]);
        stats.fail_next_allocation();
        assert!(vec.try_append(&mut other).is_err());
        assert_eq!(other, [2, 3]);

        vec.append(&mut other);
        assert_eq!(vec, [1, 2, 3]);
        assert!(other.is_empty());
        assert_eq!(stats.allocations(), 1);
    }

    #[test]
    fn append_moves_without_cloning() {
        let drop_count = DropCounter::new();
        let mut a = InlinedVec::<Droppable<'_, u32>, 2>::new();
        let mut b = InlinedVec::<Droppable<'_, u32>, 4>::new();
        a.push(drop_count.new_droppable(1));
        for i in 2..5 {
            b.push(drop_count.new_droppable(i));
        }

        a.append(&mut b);
        assert_eq!(drop_count.created(), 4);
        assert_eq!(drop_count.dropped(), 0);
        assert_eq!(a.len(), 4);
        assert!(b.is_empty());

        drop(b);
        assert_eq!(drop_count.dropped(), 0);
        drop(a);
        assert_eq!(drop_count.dropped(), 4);
    }

    #[test]
    fn iterators_take_and_drop_correctly() {
        let drop_count = DropCounter::new();
        let mut vec = InlinedVec::<Droppable<'_, usize>, 4>::new();
        for i in 1..=8 {
            vec.push(drop_count.new_droppable(i));
        }

        for d in &mut vec {
            d.value *= 10;
        }
        assert_eq!((&vec).into_iter().map(|d| d.value).sum::<usize>(), 360);

        let mut into_iter = vec.into_iter();
        assert_eq!(into_iter.next().unwrap().value, 10);
        assert_eq!(into_iter.next_back().unwrap().value, 80);
        assert_eq!(into_iter.len(), 6);
        assert_eq!(drop_count.dropped(), 2);

        drop(into_iter);
        assert_eq!(drop_count.dropped(), 8);
    }

    #[test]
    fn clone_mirrors_contents() {
        let drop_count = DropCounter::new();
        let mut vec = InlinedVec::<Droppable<'_, u32>, 2>::new();
        for i in 0..5 {
            vec.push(drop_count.new_droppable(i));
        }

        let copy = vec.clone();
        assert_eq!(copy, vec);
        assert!(copy.is_allocated());
        assert_eq!(drop_count.live(), 10);

        let mut target = InlinedVec::<Droppable<'_, u32>, 2>::new();
        target.push(drop_count.new_droppable(9));
        vec.truncate(2);
        target.clone_from(&vec);
        assert_eq!(target, vec);
        assert!(!target.is_allocated());
        assert_eq!(drop_count.live(), 9);
    }

    #[test]
    fn swap_with_exchanges_buffers() {
        let mut a = InlinedVec::<u32, 2>::from([1, 2, 3]);
        let mut b = InlinedVec::<u32, 2>::from([4]);
        let buffer = a.as_ptr();

        a.swap_with(&mut b);
        assert_eq!(a, [4]);
        assert_eq!(b, [1, 2, 3]);
        assert_eq!(b.as_ptr(), buffer);
    }

    #[test]
    fn comparisons_match_slices() {
        use core::cmp::Ordering;

        let a = InlinedVec::<u32, 2>::from([1, 2, 3]);
        let b = InlinedVec::<u32, 8>::from([1, 2, 3]);
        assert_eq!(a, b);
        assert_eq!(a, [1, 2, 3]);
        assert_eq!([1, 2, 3], a);
        assert_eq!(&[1, 2, 3][..], a);
        assert_eq!(a, &mut [1, 2, 3][..]);

        let c = InlinedVec::<u32, 2>::from([1, 2, 4]);
        assert_eq!(a.cmp(&c), Ordering::Less);
        assert_eq!(c.partial_cmp(&a), Some(Ordering::Greater));
        assert_eq!(a[1], 2);
        assert_eq!(a[1..], [2, 3]);
        assert_eq!(alloc::format!("{:?}", a), "[1, 2, 3]");
    }

    #[test]
    fn hash_agrees_with_slice() {
        use rustc_hash::FxHasher;

        fn hash_of<H: Hash + ?Sized>(value: &H) -> u64 {
            let mut hasher = FxHasher::default();
            value.hash(&mut hasher);
            hasher.finish()
        }

        let inline = InlinedVec::<u32, 8>::from([1, 2, 3]);
        let allocated = InlinedVec::<u32, 1>::from([1, 2, 3]);
        assert_eq!(hash_of(&inline), hash_of(&[1u32, 2, 3][..]));
        assert_eq!(hash_of(&allocated), hash_of(&[1u32, 2, 3][..]));
    }

    #[test]
    fn extend_by_value_and_reference() {
        let mut vec = InlinedVec::<u32, 2>::new();
        vec.extend([1, 2, 3]);
        vec.extend(&[4, 5]);
        assert_eq!(vec, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn matches_vec_on_random_operations() {
        use rand::{rngs::SmallRng, Rng, SeedableRng};

        let mut rng = SmallRng::from_seed(crate::test_utils::RNG_SEED);
        let mut vec = InlinedVec::<u16, 3>::new();
        let mut model = Vec::<u16>::new();

        for _ in 0..2000 {
            let len = model.len();
            let x: u16 = rng.gen();
            match rng.gen_range(0..6) {
                0 | 1 => {
                    vec.push(x);
                    model.push(x);
                }
                2 => assert_eq!(vec.pop(), model.pop()),
                3 => {
                    let index = rng.gen_range(0..=len);
                    vec.insert(index, x);
                    model.insert(index, x);
                }
                4 if len > 0 => {
                    let index = rng.gen_range(0..len);
                    assert_eq!(vec.remove(index), model.remove(index));
                }
                _ => {
                    let new_len = rng.gen_range(0..=len);
                    vec.truncate(new_len);
                    model.truncate(new_len);
                    if rng.gen_bool(0.5) {
                        vec.shrink_to_fit();
                    }
                }
            }

            assert_eq!(vec.as_slice(), model.as_slice());
        }
    }
}
