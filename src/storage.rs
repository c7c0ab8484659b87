//! The storage engine behind [`InlinedVec`](crate::InlinedVec).
//!
//! A [`Storage`] keeps up to `N` elements in a buffer embedded in itself, and
//! moves them to a buffer obtained from its [`Allocator`] once more room is
//! needed. The element count and the mode (inline or allocated) are packed
//! into a single word; the mode selects which member of the buffer union is
//! active.
//!
//! All mutators that can fail are strongly exception-safe: they build their
//! result off to the side using the guards from the `transaction` module
//! and only publish it once nothing can fail anymore. If an element cannot be
//! constructed, or the allocator runs dry, the storage is left exactly as it
//! was before the call. The one documented exception is [`Storage::assign`],
//! which assigns over existing elements without being able to undo it.

use crate::adapter::{SliceValueAdapter, ValueAdapter};
use crate::allocator::{deallocate_array, Allocator, Global};
use crate::error::{AllocError, Error};
use crate::transaction::{
    assign_range, construct_range, destroy_range, move_range, AllocationTransaction,
    ConstructionTransaction,
};

use core::marker::PhantomData;
use core::mem::{ManuallyDrop, MaybeUninit};
use core::ptr::{self, NonNull};

/// A non-owning snapshot of the active buffer, taken at the start of a
/// mutating operation.
#[derive(Debug)]
pub struct StorageView<T> {
    /// Pointer to the first element.
    pub data: *mut T,
    /// Number of live elements.
    pub size: usize,
    /// Number of elements the buffer can hold.
    pub capacity: usize,
}

impl<T> Clone for StorageView<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StorageView<T> {}

struct Allocated<T> {
    data: NonNull<T>,
    capacity: usize,
}

impl<T> Clone for Allocated<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Allocated<T> {}

union Data<T, const N: usize> {
    allocated: Allocated<T>,
    inlined: ManuallyDrop<MaybeUninit<[T; N]>>,
}

/// Inline-or-allocated backing memory for a growable sequence of `T`.
///
/// Generic over the element type `T`, the inline capacity `N` and the
/// allocator `A`.
///
/// See the [module-level documentation](crate::storage) for more.
pub struct Storage<T, const N: usize, A: Allocator = Global> {
    allocator: A,
    size_and_mode: usize,
    data: Data<T, N>,
    elem: PhantomData<T>,
}

unsafe impl<T: Send, A: Allocator + Send, const N: usize> Send for Storage<T, N, A> {}
unsafe impl<T: Sync, A: Allocator + Sync, const N: usize> Sync for Storage<T, N, A> {}

impl<T, const N: usize, A: Allocator> Storage<T, N, A> {
    const INLINE_CAPACITY_IS_NONZERO: () = assert!(N > 0, "inline capacity must be at least 1");

    /// The capacity the storage grows to when it is full.
    #[inline]
    pub fn next_capacity(current_capacity: usize) -> usize {
        current_capacity.saturating_mul(2)
    }

    /// The capacity the storage grows to when at least `requested_capacity`
    /// elements are needed.
    #[inline]
    pub fn compute_capacity(current_capacity: usize, requested_capacity: usize) -> usize {
        usize::max(Self::next_capacity(current_capacity), requested_capacity)
    }

    /// Creates an empty, inline storage using the given allocator.
    #[inline]
    pub const fn new_in(allocator: A) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::INLINE_CAPACITY_IS_NONZERO;

        Storage {
            allocator,
            size_and_mode: 0,
            data: Data {
                inlined: ManuallyDrop::new(MaybeUninit::uninit()),
            },
            elem: PhantomData,
        }
    }

    /// Creates an empty, inline storage using a default-constructed allocator.
    #[inline]
    pub fn new() -> Self
    where
        A: Default,
    {
        Self::new_in(A::default())
    }

    /// Returns a reference to the allocator.
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Returns the size and mode packed into one word: the size shifted left
    /// by one, and the lowest bit set if the storage is allocated.
    #[inline]
    pub fn size_and_mode(&self) -> usize {
        self.size_and_mode
    }

    /// Returns the number of live elements.
    #[inline]
    pub fn size(&self) -> usize {
        self.size_and_mode >> 1
    }

    /// Returns `true` if the elements live in an allocated buffer.
    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.size_and_mode & 1 == 1
    }

    /// Returns the number of elements the inline buffer can hold.
    #[inline]
    pub const fn inlined_capacity(&self) -> usize {
        N
    }

    /// Returns the number of elements the active buffer can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        if self.is_allocated() {
            unsafe { self.data.allocated.capacity }
        } else {
            N
        }
    }

    /// Returns a pointer to the first slot of the active buffer.
    #[inline]
    pub fn data(&self) -> *const T {
        if self.is_allocated() {
            unsafe { self.data.allocated.data.as_ptr() }
        } else {
            ptr::addr_of!(self.data.inlined).cast::<T>()
        }
    }

    /// Returns a mutable pointer to the first slot of the active buffer.
    #[inline]
    pub fn data_mut(&mut self) -> *mut T {
        if self.is_allocated() {
            unsafe { self.data.allocated.data.as_ptr() }
        } else {
            self.inlined_data()
        }
    }

    #[inline]
    fn inlined_data(&mut self) -> *mut T {
        ptr::addr_of_mut!(self.data.inlined).cast::<T>()
    }

    /// Takes a snapshot of the active buffer.
    #[inline]
    pub fn make_storage_view(&mut self) -> StorageView<T> {
        StorageView {
            data: self.data_mut(),
            size: self.size(),
            capacity: self.capacity(),
        }
    }

    /// Extracts a slice over the live elements.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { core::slice::from_raw_parts(self.data(), self.size()) }
    }

    /// Extracts a mutable slice over the live elements.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let size = self.size();
        unsafe { core::slice::from_raw_parts_mut(self.data_mut(), size) }
    }

    #[inline]
    fn set_is_allocated(&mut self) {
        self.size_and_mode |= 1;
    }

    #[inline]
    fn unset_is_allocated(&mut self) {
        self.size_and_mode &= !1;
    }

    /// Forces the number of live elements to `size`, keeping the mode.
    ///
    /// # Safety
    /// `size` must not exceed the capacity, and exactly the first `size`
    /// slots of the active buffer must be initialized.
    #[inline]
    pub unsafe fn set_size(&mut self, size: usize) {
        debug_assert!(size <= self.capacity());
        self.size_and_mode = (size << 1) | (self.size_and_mode & 1);
    }

    #[inline]
    fn set_allocated_size(&mut self, size: usize) {
        self.size_and_mode = (size << 1) | 1;
    }

    #[inline]
    fn add_size(&mut self, count: usize) {
        self.size_and_mode += count << 1;
    }

    #[inline]
    fn subtract_size(&mut self, count: usize) {
        debug_assert!(count <= self.size());
        self.size_and_mode -= count << 1;
    }

    #[inline]
    fn set_allocated_data(&mut self, data: NonNull<T>, capacity: usize) {
        self.data.allocated = Allocated { data, capacity };
    }

    /// Releases the allocated buffer described by `view`, if the storage is
    /// currently allocated.
    ///
    /// # Safety
    /// `view` must describe the active buffer, and its elements must have
    /// been moved out or destroyed already.
    #[inline]
    unsafe fn deallocate_if_allocated(&self, view: StorageView<T>) {
        if self.is_allocated() {
            deallocate_array(
                &self.allocator,
                NonNull::new_unchecked(view.data),
                view.capacity,
            );
        }
    }

    /// Fills a freshly created, empty storage with `new_size` values.
    ///
    /// If construction fails, the storage may be left in allocated mode with
    /// no live elements; dropping it releases everything.
    pub fn initialize<V: ValueAdapter<T>>(
        &mut self,
        mut values: V,
        new_size: usize,
    ) -> Result<(), Error> {
        debug_assert!(!self.is_allocated());
        debug_assert_eq!(self.size(), 0);

        let construct_data = if new_size > N {
            let new_capacity = Self::compute_capacity(N, new_size);
            let mut allocation_tx = AllocationTransaction::<T, A>::new(&self.allocator);
            allocation_tx.allocate(new_capacity)?;
            let (data, capacity) = unpack(allocation_tx.accept());

            self.set_allocated_data(data, capacity);
            self.set_is_allocated();
            data.as_ptr()
        } else {
            self.inlined_data()
        };

        unsafe { construct_range(&self.allocator, construct_data, &mut values, new_size)? };

        self.add_size(new_size);
        Ok(())
    }

    /// Fills a freshly created, empty storage with clones of the elements of
    /// `other`, mirroring its mode.
    pub fn init_from(&mut self, other: &Self) -> Result<(), Error>
    where
        T: Clone,
    {
        debug_assert!(!self.is_allocated());
        debug_assert_eq!(self.size(), 0);

        let n = other.size();
        if n == 0 {
            return Ok(());
        }

        let dst = if other.is_allocated() {
            let new_capacity = Self::compute_capacity(N, n);
            let mut allocation_tx = AllocationTransaction::<T, A>::new(&self.allocator);
            allocation_tx.allocate(new_capacity)?;
            let (data, capacity) = unpack(allocation_tx.accept());

            self.set_allocated_data(data, capacity);
            self.set_is_allocated();
            data.as_ptr()
        } else {
            self.inlined_data()
        };

        let mut values = SliceValueAdapter::new(other.as_slice());
        unsafe { construct_range(&self.allocator, dst, &mut values, n)? };

        self.add_size(n);
        Ok(())
    }

    /// Replaces the contents with `new_size` values.
    ///
    /// If the new contents fit into the current buffer, existing elements
    /// are assigned over. A failure while assigning is not rolled back: the
    /// size is unchanged, but elements already assigned keep their new
    /// values. Failures in all other phases leave the storage untouched.
    pub fn assign<V: ValueAdapter<T>>(&mut self, mut values: V, new_size: usize) -> Result<(), Error> {
        let view = self.make_storage_view();

        if new_size > view.capacity {
            let new_capacity = Self::compute_capacity(view.capacity, new_size);
            let mut allocation_tx = AllocationTransaction::<T, A>::new(&self.allocator);
            let new_data = allocation_tx.allocate(new_capacity)?.as_ptr();

            let mut construction_tx = ConstructionTransaction::new(&self.allocator);
            unsafe {
                construction_tx.construct(new_data, &mut values, new_size)?;

                // a panicking destructor leaks the old run instead of
                // leaving it to be dropped again
                self.size_and_mode &= 1;
                destroy_range(&self.allocator, view.data, view.size);
            }

            construction_tx.commit();
            let (data, capacity) = unpack(allocation_tx.accept());
            unsafe { self.deallocate_if_allocated(view) };
            self.set_allocated_data(data, capacity);
            self.set_allocated_size(new_size);
        } else if new_size > view.size {
            unsafe {
                assign_range(view.data, &mut values, view.size)?;
                construct_range(
                    &self.allocator,
                    view.data.add(view.size),
                    &mut values,
                    new_size - view.size,
                )?;
                self.set_size(new_size);
            }
        } else {
            unsafe {
                assign_range(view.data, &mut values, new_size)?;
                self.set_size(new_size);
                destroy_range(&self.allocator, view.data.add(new_size), view.size - new_size);
            }
        }

        Ok(())
    }

    /// Changes the number of elements to `new_size`, constructing missing
    /// elements from `values` or destroying excess ones.
    ///
    /// When growing beyond the current capacity, the new elements are
    /// constructed into the new buffer before the existing ones are moved
    /// over, so a failure never disturbs the original buffer.
    pub fn resize<V: ValueAdapter<T>>(&mut self, mut values: V, new_size: usize) -> Result<(), Error> {
        let view = self.make_storage_view();
        let base = view.data;
        let size = view.size;

        if new_size <= size {
            unsafe {
                self.set_size(new_size);
                destroy_range(&self.allocator, base.add(new_size), size - new_size);
            }
        } else if new_size <= view.capacity {
            unsafe {
                construct_range(&self.allocator, base.add(size), &mut values, new_size - size)?;
                self.set_size(new_size);
            }
        } else {
            let new_capacity = Self::compute_capacity(view.capacity, new_size);
            let mut allocation_tx = AllocationTransaction::<T, A>::new(&self.allocator);
            let new_data = allocation_tx.allocate(new_capacity)?.as_ptr();

            let mut construction_tx = ConstructionTransaction::new(&self.allocator);
            unsafe {
                construction_tx.construct(new_data.add(size), &mut values, new_size - size)?;
                move_range(base, new_data, size);
            }

            construction_tx.commit();
            let (data, capacity) = unpack(allocation_tx.accept());
            unsafe { self.deallocate_if_allocated(view) };
            self.set_allocated_data(data, capacity);
            self.set_allocated_size(new_size);
        }

        Ok(())
    }

    /// Inserts `insert_count` values at `index`, shifting the elements after
    /// it towards the back.
    ///
    /// Returns the index of the first inserted element.
    ///
    /// # Panics
    /// Panics if `index > self.size()`.
    pub fn insert<V: ValueAdapter<T>>(
        &mut self,
        index: usize,
        mut values: V,
        insert_count: usize,
    ) -> Result<usize, Error> {
        #[cold]
        #[inline(never)]
        fn assert_failed(index: usize, len: usize) -> ! {
            panic!("insertion index (is {}) should be <= len (is {})", index, len);
        }

        let view = self.make_storage_view();
        if index > view.size {
            assert_failed(index, view.size);
        }

        let new_size = view
            .size
            .checked_add(insert_count)
            .ok_or(AllocError::CapacityOverflow)?;
        let insert_end_index = index + insert_count;

        if new_size > view.capacity {
            let new_capacity = Self::compute_capacity(view.capacity, new_size);
            let mut allocation_tx = AllocationTransaction::<T, A>::new(&self.allocator);
            let new_data = allocation_tx.allocate(new_capacity)?.as_ptr();

            let mut construction_tx = ConstructionTransaction::new(&self.allocator);
            unsafe {
                construction_tx.construct(new_data.add(index), &mut values, insert_count)?;
                move_range(view.data, new_data, index);
                move_range(
                    view.data.add(index),
                    new_data.add(insert_end_index),
                    view.size - index,
                );
            }

            construction_tx.commit();
            let (data, capacity) = unpack(allocation_tx.accept());
            unsafe { self.deallocate_if_allocated(view) };
            self.set_allocated_data(data, capacity);
            self.set_allocated_size(new_size);
        } else {
            unsafe {
                let gap = view.data.add(index);
                let tail = view.size - index;
                ptr::copy(gap, gap.add(insert_count), tail);

                // moves the tail back into place unless the gap gets filled
                let shifted = ShiftBack {
                    src: gap.add(insert_count),
                    dst: gap,
                    count: tail,
                };
                construct_range(&self.allocator, gap, &mut values, insert_count)?;
                core::mem::forget(shifted);
            }

            self.add_size(insert_count);
        }

        Ok(index)
    }

    /// Appends the value produced by `make` to the back.
    ///
    /// If the storage is full, a buffer of twice the capacity is allocated
    /// first and the value is constructed directly into it, so a failing
    /// `make` leaves the storage untouched.
    #[inline]
    pub fn emplace_back_with<F>(&mut self, make: F) -> Result<&mut T, Error>
    where
        F: FnOnce() -> Result<T, crate::error::ConstructionError>,
    {
        let view = self.make_storage_view();
        if view.size != view.capacity {
            unsafe {
                let last_ptr = view.data.add(view.size);
                self.allocator.construct(last_ptr, make()?);
                self.add_size(1);
                return Ok(&mut *last_ptr);
            }
        }

        self.emplace_back_slow(view, make)
    }

    /// Appends `value` to the back.
    #[inline]
    pub fn emplace_back(&mut self, value: T) -> Result<&mut T, AllocError> {
        match self.emplace_back_with(|| Ok(value)) {
            Ok(last) => Ok(last),
            Err(Error::Alloc(err)) => Err(err),
            Err(Error::Construction(_)) => unreachable!(),
        }
    }

    #[cold]
    #[inline(never)]
    fn emplace_back_slow<F>(&mut self, view: StorageView<T>, make: F) -> Result<&mut T, Error>
    where
        F: FnOnce() -> Result<T, crate::error::ConstructionError>,
    {
        let new_capacity = Self::next_capacity(view.capacity);
        let mut allocation_tx = AllocationTransaction::<T, A>::new(&self.allocator);
        let construct_data = allocation_tx.allocate(new_capacity)?.as_ptr();

        let last_ptr = unsafe { construct_data.add(view.size) };
        unsafe {
            self.allocator.construct(last_ptr, make()?);
            move_range(view.data, construct_data, view.size);
        }

        let (data, capacity) = unpack(allocation_tx.accept());
        unsafe { self.deallocate_if_allocated(view) };
        self.set_allocated_data(data, capacity);
        self.set_allocated_size(view.size + 1);
        Ok(unsafe { &mut *last_ptr })
    }

    /// Removes the elements in `from..to`, shifting the elements after them
    /// towards the front.
    ///
    /// Returns the index of the first element after the removed range, which
    /// is `from`.
    ///
    /// # Panics
    /// Panics if `from > to` or `to > self.size()`.
    pub fn erase(&mut self, from: usize, to: usize) -> usize {
        #[cold]
        #[inline(never)]
        fn assert_failed(from: usize, to: usize, len: usize) -> ! {
            panic!(
                "erase range (is {}..{}) should be ascending and end at or before len (is {})",
                from, to, len
            );
        }

        let view = self.make_storage_view();
        if from > to || to > view.size {
            assert_failed(from, to, view.size);
        }

        let erase_size = to - from;
        unsafe {
            // leak rather than double-drop if a destructor panics
            self.set_size(from);
            destroy_range(&self.allocator, view.data.add(from), erase_size);
            ptr::copy(view.data.add(to), view.data.add(from), view.size - to);
            self.set_size(view.size - erase_size);
        }

        from
    }

    /// Removes and returns the last element, or `None` if there is none.
    #[inline]
    pub fn pop_back(&mut self) -> Option<T> {
        if self.size() == 0 {
            return None;
        }

        self.subtract_size(1);
        let size = self.size();
        unsafe { Some(self.data_mut().add(size).read()) }
    }

    /// Ensures the storage can hold at least `requested_capacity` elements.
    ///
    /// Never reduces the capacity.
    pub fn reserve(&mut self, requested_capacity: usize) -> Result<(), AllocError> {
        let view = self.make_storage_view();
        if requested_capacity <= view.capacity {
            return Ok(());
        }

        let new_capacity = Self::compute_capacity(view.capacity, requested_capacity);
        let mut allocation_tx = AllocationTransaction::<T, A>::new(&self.allocator);
        let new_data = allocation_tx.allocate(new_capacity)?.as_ptr();
        unsafe { move_range(view.data, new_data, view.size) };

        let (data, capacity) = unpack(allocation_tx.accept());
        unsafe { self.deallocate_if_allocated(view) };
        self.set_allocated_data(data, capacity);
        self.set_is_allocated();
        Ok(())
    }

    /// Reduces the capacity to the number of live elements, moving them back
    /// into the inline buffer if they fit.
    ///
    /// Does nothing unless the storage is allocated and has spare capacity.
    pub fn shrink_to_fit(&mut self) -> Result<(), AllocError> {
        if !self.is_allocated() {
            return Ok(());
        }

        let view = self.make_storage_view();
        if view.size == view.capacity {
            return Ok(());
        }

        let mut allocation_tx = AllocationTransaction::<T, A>::new(&self.allocator);
        let construct_data = if view.size > N {
            allocation_tx.allocate(view.size)?.as_ptr()
        } else {
            // overwrites the allocated pointer, which is kept in `view`
            ptr::addr_of_mut!(self.data.inlined).cast::<T>()
        };

        unsafe {
            move_range(view.data, construct_data, view.size);
            deallocate_array(
                &self.allocator,
                NonNull::new_unchecked(view.data),
                view.capacity,
            );
        }

        match allocation_tx.accept() {
            Some((data, capacity)) => self.set_allocated_data(data, capacity),
            None => self.unset_is_allocated(),
        }

        Ok(())
    }

    /// Exchanges the contents of two storages, including their allocators.
    ///
    /// Allocated buffers change hands without being copied.
    pub fn swap(&mut self, other: &mut Self) {
        if self.is_allocated() && other.is_allocated() {
            unsafe { core::mem::swap(&mut self.data.allocated, &mut other.data.allocated) };
        } else if !self.is_allocated() && !other.is_allocated() {
            let (small, large) = if self.size() <= other.size() {
                (&mut *self, &mut *other)
            } else {
                (&mut *other, &mut *self)
            };

            let small_size = small.size();
            let large_size = large.size();
            let small_data = small.inlined_data();
            let large_data = large.inlined_data();
            unsafe {
                ptr::swap_nonoverlapping(small_data, large_data, small_size);
                move_range(
                    large_data.add(small_size),
                    small_data.add(small_size),
                    large_size - small_size,
                );
            }
        } else {
            let (allocated, inlined) = if self.is_allocated() {
                (&mut *self, &mut *other)
            } else {
                (&mut *other, &mut *self)
            };

            let allocated_view = unsafe { allocated.data.allocated };
            let inlined_size = inlined.size();
            let src = inlined.inlined_data();
            let dst = allocated.inlined_data();
            unsafe { move_range(src, dst, inlined_size) };

            inlined.set_allocated_data(allocated_view.data, allocated_view.capacity);
        }

        core::mem::swap(&mut self.size_and_mode, &mut other.size_and_mode);
        core::mem::swap(&mut self.allocator, &mut other.allocator);
    }
}

impl<T, const N: usize, A: Allocator + Default> Default for Storage<T, N, A> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize, A: Allocator> Drop for Storage<T, N, A> {
    fn drop(&mut self) {
        if self.size_and_mode == 0 {
            return;
        }

        let view = self.make_storage_view();
        let mut release = AllocationTransaction::<T, A>::new(&self.allocator);
        if self.is_allocated() {
            // released even if an element destructor panics
            unsafe { release.adopt(NonNull::new_unchecked(view.data), view.capacity) };
        }

        unsafe { destroy_range(&self.allocator, view.data, view.size) };
    }
}

impl<T: core::fmt::Debug, const N: usize, A: Allocator> core::fmt::Debug for Storage<T, N, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Storage")
            .field("size", &self.size())
            .field("capacity", &self.capacity())
            .field("is_allocated", &self.is_allocated())
            .field("elements", &self.as_slice())
            .finish()
    }
}

/// Moves a shifted tail back to where it came from, closing a gap that
/// could not be filled.
struct ShiftBack<T> {
    src: *const T,
    dst: *mut T,
    count: usize,
}

impl<T> Drop for ShiftBack<T> {
    fn drop(&mut self) {
        unsafe { ptr::copy(self.src, self.dst, self.count) };
    }
}

#[inline]
fn unpack<T>(accepted: Option<(NonNull<T>, usize)>) -> (NonNull<T>, usize) {
    match accepted {
        Some(buffer) => buffer,
        None => unreachable!("transaction did not allocate"),
    }
}
