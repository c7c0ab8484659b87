//! Bulk element operations and the guards that roll them back.
//!
//! Every mutating operation of [`Storage`](crate::storage::Storage) builds
//! its new state off to the side before publishing it. Freshly allocated
//! buffers are owned by an [`AllocationTransaction`] and freshly constructed
//! runs of elements by a [`ConstructionTransaction`] until then. Both
//! release what they own when dropped, so an early return through `?` and
//! a panic unwinding out of user code take the same rollback path.

use crate::adapter::ValueAdapter;
use crate::allocator::{allocate_array, deallocate_array, Allocator};
use crate::error::{AllocError, ConstructionError};

use core::mem;
use core::ptr::NonNull;

/// Destroys `count` elements starting at `first`, highest index first.
///
/// Does nothing if `first` is null.
///
/// # Safety
/// All `count` elements must be initialized, and must not be used afterwards.
pub(crate) unsafe fn destroy_range<T, A: Allocator>(allocator: &A, first: *mut T, count: usize) {
    if first.is_null() || (A::IS_DEFAULT && !mem::needs_drop::<T>()) {
        return;
    }

    for i in (0..count).rev() {
        allocator.destroy(first.add(i));
    }
}

/// Destroys the elements constructed so far by [`construct_range`] if it
/// exits early.
struct PartialRange<'a, T, A: Allocator> {
    allocator: &'a A,
    first: *mut T,
    initialized: usize,
}

impl<T, A: Allocator> Drop for PartialRange<'_, T, A> {
    fn drop(&mut self) {
        unsafe { destroy_range(self.allocator, self.first, self.initialized) };
    }
}

/// Constructs `count` elements starting at `first` from `values`.
///
/// If constructing any element fails, the elements constructed by this call
/// are destroyed again, in reverse order, before the error is returned.
///
/// # Safety
/// `first` must be valid for writes of `count` elements, all of which must
/// be uninitialized.
pub(crate) unsafe fn construct_range<T, A, V>(
    allocator: &A,
    first: *mut T,
    values: &mut V,
    count: usize,
) -> Result<(), ConstructionError>
where
    A: Allocator,
    V: ValueAdapter<T>,
{
    if count == 0 || values.copy_bulk::<A>(first, count) {
        return Ok(());
    }

    let mut partial = PartialRange {
        allocator,
        first,
        initialized: 0,
    };

    while partial.initialized < count {
        values.construct_next(allocator, first.add(partial.initialized))?;
        partial.initialized += 1;
    }

    mem::forget(partial);
    Ok(())
}

/// Assigns over `count` live elements starting at `first` from `values`.
///
/// A failure part way through is not rolled back: elements before the
/// failing one hold their new values, the rest keep their old ones.
///
/// # Safety
/// All `count` elements must be initialized.
pub(crate) unsafe fn assign_range<T, V: ValueAdapter<T>>(
    first: *mut T,
    values: &mut V,
    count: usize,
) -> Result<(), ConstructionError> {
    for i in 0..count {
        values.assign_next(&mut *first.add(i))?;
    }

    Ok(())
}

/// Relocates `count` elements from `src` to `dst`.
///
/// The source slots are left logically uninitialized.
///
/// # Safety
/// Same as [`core::ptr::copy_nonoverlapping`].
#[inline]
pub(crate) unsafe fn move_range<T>(src: *const T, dst: *mut T, count: usize) {
    core::ptr::copy_nonoverlapping(src, dst, count);
}

/// Owns a buffer obtained from an allocator until it is accepted by a
/// storage, and releases it otherwise.
pub struct AllocationTransaction<'a, T, A: Allocator> {
    allocator: &'a A,
    data: Option<NonNull<T>>,
    capacity: usize,
}

impl<'a, T, A: Allocator> AllocationTransaction<'a, T, A> {
    /// Creates a transaction that has not allocated yet.
    #[inline]
    pub fn new(allocator: &'a A) -> Self {
        AllocationTransaction {
            allocator,
            data: None,
            capacity: 0,
        }
    }

    /// Returns `true` if this transaction owns a buffer.
    #[inline]
    pub fn did_allocate(&self) -> bool {
        self.data.is_some()
    }

    /// Returns the capacity of the owned buffer, or zero.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Allocates a buffer for `capacity` elements.
    ///
    /// # Panics
    /// Panics if this transaction already owns a buffer.
    pub fn allocate(&mut self, capacity: usize) -> Result<NonNull<T>, AllocError> {
        #[cold]
        #[inline(never)]
        fn assert_failed() -> ! {
            panic!("allocation transaction may only allocate once")
        }

        if self.did_allocate() {
            assert_failed();
        }

        let data = allocate_array::<T, A>(self.allocator, capacity)?;
        self.data = Some(data);
        self.capacity = capacity;
        Ok(data)
    }

    /// Takes over an already allocated buffer, so it is released when this
    /// transaction is dropped.
    ///
    /// # Safety
    /// `data` must have been allocated by the transaction's allocator with
    /// exactly `capacity` elements, and no one else may release it.
    pub(crate) unsafe fn adopt(&mut self, data: NonNull<T>, capacity: usize) {
        debug_assert!(!self.did_allocate());
        self.data = Some(data);
        self.capacity = capacity;
    }

    /// Clears the record of the owned buffer without releasing it, handing
    /// it over to the caller.
    ///
    /// Returns `None` if nothing was allocated.
    #[inline]
    pub fn reset(&mut self) -> Option<(NonNull<T>, usize)> {
        let capacity = mem::replace(&mut self.capacity, 0);
        self.data.take().map(|data| (data, capacity))
    }

    /// Ends the transaction, handing the owned buffer over to the caller.
    #[inline]
    pub fn accept(mut self) -> Option<(NonNull<T>, usize)> {
        self.reset()
    }
}

impl<T, A: Allocator> Drop for AllocationTransaction<'_, T, A> {
    fn drop(&mut self) {
        if let Some((data, capacity)) = self.reset() {
            unsafe { deallocate_array(self.allocator, data, capacity) };
        }
    }
}

/// Owns a run of freshly constructed elements until they are accounted for
/// in the size of a storage, and destroys them otherwise.
///
/// # Examples
/// ```
/// use inlined::adapter::FillValueAdapter;
/// use inlined::transaction::ConstructionTransaction;
/// use inlined::Global;
///
/// let mut buf: Vec<String> = Vec::with_capacity(3);
/// let fill = String::from("abc");
///
/// let mut tx = ConstructionTransaction::new(&Global);
/// unsafe { tx.construct(buf.as_mut_ptr(), &mut FillValueAdapter::new(&fill), 3) }.unwrap();
/// assert!(tx.did_construct());
///
/// tx.commit();
/// unsafe { buf.set_len(3) };
/// assert_eq!(buf, ["abc", "abc", "abc"]);
/// ```
pub struct ConstructionTransaction<'a, T, A: Allocator> {
    allocator: &'a A,
    data: *mut T,
    size: usize,
}

impl<'a, T, A: Allocator> ConstructionTransaction<'a, T, A> {
    /// Creates a transaction that owns no elements.
    #[inline]
    pub fn new(allocator: &'a A) -> Self {
        ConstructionTransaction {
            allocator,
            data: core::ptr::null_mut(),
            size: 0,
        }
    }

    /// Returns `true` if this transaction owns a run of elements.
    #[inline]
    pub fn did_construct(&self) -> bool {
        !self.data.is_null()
    }

    /// Constructs `size` elements at `data` from `values`, taking ownership
    /// of them if all constructions succeed.
    ///
    /// If constructing any element fails, the elements constructed so far are
    /// destroyed again and this transaction stays empty.
    ///
    /// # Safety
    /// `data` must be valid for writes of `size` elements, all of which must
    /// be uninitialized, and this transaction must not own any elements yet.
    pub unsafe fn construct<V: ValueAdapter<T>>(
        &mut self,
        data: *mut T,
        values: &mut V,
        size: usize,
    ) -> Result<(), ConstructionError> {
        debug_assert!(!self.did_construct());
        construct_range(self.allocator, data, values, size)?;
        self.data = data;
        self.size = size;
        Ok(())
    }

    /// Ends the transaction, releasing ownership of the constructed elements
    /// without destroying them.
    #[inline]
    pub fn commit(mut self) {
        self.data = core::ptr::null_mut();
        self.size = 0;
    }
}

impl<T, A: Allocator> Drop for ConstructionTransaction<'_, T, A> {
    fn drop(&mut self) {
        if self.did_construct() {
            unsafe { destroy_range(self.allocator, self.data, self.size) };
        }
    }
}
