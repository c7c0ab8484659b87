//! The allocator capability consumed by [`Storage`](crate::storage::Storage).
//!
//! An [`Allocator`] hands out raw memory blocks and takes them back; it also
//! owns the hooks used to place a value into a slot and to destroy it again.
//! The storage engine never touches the global heap directly, so a container
//! can be pointed at any memory source by swapping the allocator type.

use crate::error::AllocError;

use core::alloc::Layout;
use core::ptr::{self, NonNull};

/// An interface for a source of raw memory blocks.
///
/// # Safety
/// Implementors must ensure that a block returned from [`allocate`] is valid
/// for reads and writes of `layout.size()` bytes, is aligned to
/// `layout.align()`, and stays valid until it is passed to [`deallocate`]
/// on the same allocator (or a copy of it that was created by moving it).
///
/// [`allocate`]: Allocator::allocate
/// [`deallocate`]: Allocator::deallocate
pub unsafe trait Allocator {
    /// Whether this allocator is the default one, i.e. [`Global`].
    ///
    /// Containers may skip the per-element [`construct`](Allocator::construct)
    /// hook and copy trivially copyable values in bulk only if this is `true`.
    const IS_DEFAULT: bool = false;

    /// Attempts to allocate a block of memory fitting `layout`.
    ///
    /// Callers never request zero-sized blocks.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Releases a block previously returned by [`allocate`](Allocator::allocate).
    ///
    /// # Safety
    /// `ptr` must denote a block currently allocated by this allocator, and
    /// `layout` must be the layout it was allocated with.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Moves `value` into the uninitialized slot at `dst`.
    ///
    /// # Safety
    /// `dst` must be valid for writes and properly aligned.
    #[inline]
    unsafe fn construct<T>(&self, dst: *mut T, value: T) {
        dst.write(value);
    }

    /// Runs the destructor of the value at `ptr`, leaving the slot uninitialized.
    ///
    /// Implementations must not panic.
    ///
    /// # Safety
    /// `ptr` must point to an initialized value that is not used afterwards.
    #[inline]
    unsafe fn destroy<T>(&self, ptr: *mut T) {
        ptr::drop_in_place(ptr);
    }
}

/// The global memory allocator.
///
/// This forwards to the allocator registered with `#[global_allocator]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Global;

unsafe impl Allocator for Global {
    const IS_DEFAULT: bool = true;

    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(layout.size() != 0);
        let ptr = unsafe { alloc::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(AllocError::AllocFailed { layout })
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        alloc::alloc::dealloc(ptr.as_ptr(), layout);
    }
}

#[inline]
fn array_layout<T>(capacity: usize) -> Result<Layout, AllocError> {
    Layout::array::<T>(capacity).map_err(|_| AllocError::CapacityOverflow)
}

/// Allocates an uninitialized buffer for `capacity` values of type `T`.
///
/// Zero-sized requests are served with a dangling pointer without consulting
/// the allocator.
pub(crate) fn allocate_array<T, A: Allocator>(
    allocator: &A,
    capacity: usize,
) -> Result<NonNull<T>, AllocError> {
    // the packed size representation loses the highest bit
    if capacity > isize::MAX as usize {
        return Err(AllocError::CapacityOverflow);
    }

    let layout = array_layout::<T>(capacity)?;
    if layout.size() == 0 {
        return Ok(NonNull::dangling());
    }

    allocator.allocate(layout).map(NonNull::cast)
}

/// Releases a buffer obtained from [`allocate_array`].
///
/// # Safety
/// `ptr` and `capacity` must be exactly what was passed to and returned from
/// a previous call to `allocate_array` with the same allocator.
pub(crate) unsafe fn deallocate_array<T, A: Allocator>(
    allocator: &A,
    ptr: NonNull<T>,
    capacity: usize,
) {
    let layout = Layout::from_size_align_unchecked(
        core::mem::size_of::<T>() * capacity,
        core::mem::align_of::<T>(),
    );

    if layout.size() != 0 {
        allocator.deallocate(ptr.cast(), layout);
    }
}
