//! Value adapters supplying the elements of bulk operations.
//!
//! A [`ValueAdapter`] decides *what* values are produced, while the storage
//! engine decides *where* they go and how many of them are needed. Every
//! adapter can both construct a value into an uninitialized slot and assign
//! a value over an element that is already live.
//!
//! | Adapter                     | Produces                                     |
//! |-----------------------------|----------------------------------------------|
//! | [`IteratorValueAdapter`]    | successive items of an iterator              |
//! | [`SliceValueAdapter`]       | clones of successive slice elements          |
//! | [`CopySliceValueAdapter`]   | copies of successive slice elements          |
//! | [`MoveValueAdapter`]        | successive elements moved out of a buffer    |
//! | [`FillValueAdapter`]        | clones of one value                          |
//! | [`DefaultValueAdapter`]     | `T::default()`                               |
//! | [`FromFnValueAdapter`]      | results of a fallible closure                |

use crate::allocator::Allocator;
use crate::error::ConstructionError;

use core::marker::PhantomData;
use core::ptr;

/// A producer of values for bulk construction and assignment.
///
/// Each call produces exactly one element and leaves the adapter ready for
/// the next call. When a call fails, the adapter must not consider its
/// position advanced past the failed slot.
pub trait ValueAdapter<T> {
    /// Constructs the next value into the uninitialized slot at `dst`.
    ///
    /// # Safety
    /// `dst` must be valid for writes and properly aligned. On success, the
    /// slot is initialized; on failure, it is left uninitialized.
    unsafe fn construct_next<A: Allocator>(
        &mut self,
        allocator: &A,
        dst: *mut T,
    ) -> Result<(), ConstructionError>;

    /// Assigns the next value over the live element `dst`.
    fn assign_next(&mut self, dst: &mut T) -> Result<(), ConstructionError>;

    /// Attempts to construct the next `count` values with a single bytewise
    /// copy, returning `false` if this adapter does not support doing so for
    /// the allocator `A`.
    ///
    /// # Safety
    /// `dst` must be valid for writes of `count` values, and must not overlap
    /// the source of this adapter.
    #[inline]
    unsafe fn copy_bulk<A: Allocator>(&mut self, _dst: *mut T, _count: usize) -> bool {
        false
    }
}

/// Produces the items of an iterator.
///
/// Running out of items is reported as a [`ConstructionError`].
pub struct IteratorValueAdapter<I> {
    iter: I,
}

impl<I> IteratorValueAdapter<I> {
    /// Wraps `iter`.
    #[inline]
    pub fn new(iter: I) -> Self {
        IteratorValueAdapter { iter }
    }
}

impl<T, I: Iterator<Item = T>> ValueAdapter<T> for IteratorValueAdapter<I> {
    #[inline]
    unsafe fn construct_next<A: Allocator>(
        &mut self,
        allocator: &A,
        dst: *mut T,
    ) -> Result<(), ConstructionError> {
        let value = self.iter.next().ok_or(ConstructionError::new())?;
        allocator.construct(dst, value);
        Ok(())
    }

    #[inline]
    fn assign_next(&mut self, dst: &mut T) -> Result<(), ConstructionError> {
        *dst = self.iter.next().ok_or(ConstructionError::new())?;
        Ok(())
    }
}

/// Produces clones of the elements of a slice, in order.
pub struct SliceValueAdapter<'a, T> {
    src: core::slice::Iter<'a, T>,
}

impl<'a, T> SliceValueAdapter<'a, T> {
    /// Creates an adapter yielding clones of `src[0]`, `src[1]`, ...
    #[inline]
    pub fn new(src: &'a [T]) -> Self {
        SliceValueAdapter { src: src.iter() }
    }
}

impl<T: Clone> ValueAdapter<T> for SliceValueAdapter<'_, T> {
    #[inline]
    unsafe fn construct_next<A: Allocator>(
        &mut self,
        allocator: &A,
        dst: *mut T,
    ) -> Result<(), ConstructionError> {
        // peek first, so a panicking clone leaves the position untouched
        let value = self.src.as_slice().first().ok_or(ConstructionError::new())?.clone();
        self.src.next();
        allocator.construct(dst, value);
        Ok(())
    }

    #[inline]
    fn assign_next(&mut self, dst: &mut T) -> Result<(), ConstructionError> {
        let src = self.src.as_slice().first().ok_or(ConstructionError::new())?;
        dst.clone_from(src);
        self.src.next();
        Ok(())
    }
}

/// Produces copies of the elements of a slice, in order.
///
/// When used with the default allocator, runs of elements are constructed
/// with a single `memcpy`.
pub struct CopySliceValueAdapter<'a, T> {
    src: &'a [T],
}

impl<'a, T: Copy> CopySliceValueAdapter<'a, T> {
    /// Creates an adapter yielding copies of `src[0]`, `src[1]`, ...
    #[inline]
    pub fn new(src: &'a [T]) -> Self {
        CopySliceValueAdapter { src }
    }
}

impl<T: Copy> ValueAdapter<T> for CopySliceValueAdapter<'_, T> {
    #[inline]
    unsafe fn construct_next<A: Allocator>(
        &mut self,
        allocator: &A,
        dst: *mut T,
    ) -> Result<(), ConstructionError> {
        let (&first, rest) = self.src.split_first().ok_or(ConstructionError::new())?;
        allocator.construct(dst, first);
        self.src = rest;
        Ok(())
    }

    #[inline]
    fn assign_next(&mut self, dst: &mut T) -> Result<(), ConstructionError> {
        let (&first, rest) = self.src.split_first().ok_or(ConstructionError::new())?;
        *dst = first;
        self.src = rest;
        Ok(())
    }

    #[inline]
    unsafe fn copy_bulk<A: Allocator>(&mut self, dst: *mut T, count: usize) -> bool {
        if !A::IS_DEFAULT || count > self.src.len() {
            return false;
        }

        ptr::copy_nonoverlapping(self.src.as_ptr(), dst, count);
        self.src = &self.src[count..];
        true
    }
}

/// Moves elements out of a buffer, in order.
///
/// Relocating a value is a bitwise copy that cannot fail, so this adapter
/// bypasses the allocator's `construct` hook and always copies in bulk. The
/// caller becomes responsible for treating the moved-from slots as
/// uninitialized.
pub struct MoveValueAdapter<T> {
    src: *const T,
}

impl<T> MoveValueAdapter<T> {
    /// Creates an adapter moving values out of `src`, `src.add(1)`, ...
    ///
    /// # Safety
    /// Every slot this adapter is asked to produce must hold an initialized
    /// value that is neither used nor dropped afterwards.
    #[inline]
    pub unsafe fn new(src: *const T) -> Self {
        MoveValueAdapter { src }
    }
}

impl<T> ValueAdapter<T> for MoveValueAdapter<T> {
    #[inline]
    unsafe fn construct_next<A: Allocator>(
        &mut self,
        _allocator: &A,
        dst: *mut T,
    ) -> Result<(), ConstructionError> {
        ptr::copy_nonoverlapping(self.src, dst, 1);
        self.src = self.src.add(1);
        Ok(())
    }

    #[inline]
    fn assign_next(&mut self, dst: &mut T) -> Result<(), ConstructionError> {
        unsafe {
            *dst = self.src.read();
            self.src = self.src.add(1);
        }
        Ok(())
    }

    #[inline]
    unsafe fn copy_bulk<A: Allocator>(&mut self, dst: *mut T, count: usize) -> bool {
        ptr::copy_nonoverlapping(self.src, dst, count);
        self.src = self.src.add(count);
        true
    }
}

/// Produces clones of a single value.
pub struct FillValueAdapter<'a, T> {
    value: &'a T,
}

impl<'a, T: Clone> FillValueAdapter<'a, T> {
    /// Creates an adapter yielding clones of `value`.
    #[inline]
    pub fn new(value: &'a T) -> Self {
        FillValueAdapter { value }
    }
}

impl<T: Clone> ValueAdapter<T> for FillValueAdapter<'_, T> {
    #[inline]
    unsafe fn construct_next<A: Allocator>(
        &mut self,
        allocator: &A,
        dst: *mut T,
    ) -> Result<(), ConstructionError> {
        allocator.construct(dst, self.value.clone());
        Ok(())
    }

    #[inline]
    fn assign_next(&mut self, dst: &mut T) -> Result<(), ConstructionError> {
        dst.clone_from(self.value);
        Ok(())
    }
}

/// Produces default-constructed values.
pub struct DefaultValueAdapter<T> {
    elem: PhantomData<fn() -> T>,
}

impl<T: Default> DefaultValueAdapter<T> {
    /// Creates an adapter yielding `T::default()`.
    #[inline]
    pub fn new() -> Self {
        DefaultValueAdapter { elem: PhantomData }
    }
}

impl<T: Default> Default for DefaultValueAdapter<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default> ValueAdapter<T> for DefaultValueAdapter<T> {
    #[inline]
    unsafe fn construct_next<A: Allocator>(
        &mut self,
        allocator: &A,
        dst: *mut T,
    ) -> Result<(), ConstructionError> {
        allocator.construct(dst, T::default());
        Ok(())
    }

    #[inline]
    fn assign_next(&mut self, dst: &mut T) -> Result<(), ConstructionError> {
        *dst = T::default();
        Ok(())
    }
}

/// Produces the results of a fallible closure, which receives the number of
/// values produced so far.
///
/// # Examples
/// ```
/// use inlined::{ConstructionError, InlinedVec};
///
/// let squares = InlinedVec::<u32, 4>::try_from_fn(6, |i| Ok(i as u32 * i as u32)).unwrap();
/// assert_eq!(squares, [0, 1, 4, 9, 16, 25]);
///
/// let failed = InlinedVec::<u32, 4>::try_from_fn(6, |i| {
///     if i < 5 { Ok(i as u32) } else { Err(ConstructionError::new()) }
/// });
/// assert!(failed.is_err());
/// ```
pub struct FromFnValueAdapter<F> {
    produce: F,
    produced: usize,
}

impl<F> FromFnValueAdapter<F> {
    /// Creates an adapter yielding `produce(0)`, `produce(1)`, ...
    #[inline]
    pub fn new(produce: F) -> Self {
        FromFnValueAdapter {
            produce,
            produced: 0,
        }
    }

    /// Returns how many values were produced successfully.
    #[inline]
    pub fn produced(&self) -> usize {
        self.produced
    }
}

impl<T, F: FnMut(usize) -> Result<T, ConstructionError>> ValueAdapter<T>
    for FromFnValueAdapter<F>
{
    #[inline]
    unsafe fn construct_next<A: Allocator>(
        &mut self,
        allocator: &A,
        dst: *mut T,
    ) -> Result<(), ConstructionError> {
        let value = (self.produce)(self.produced)?;
        allocator.construct(dst, value);
        self.produced += 1;
        Ok(())
    }

    #[inline]
    fn assign_next(&mut self, dst: &mut T) -> Result<(), ConstructionError> {
        *dst = (self.produce)(self.produced)?;
        self.produced += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::Global;
    use crate::test_utils::{AllocStats, CountingAllocator};
    use core::mem::MaybeUninit;

    #[test]
    fn iterator_adapter_reports_exhaustion() {
        let mut slot = MaybeUninit::<u32>::uninit();
        let mut values = IteratorValueAdapter::new(1..2);
        unsafe {
            assert!(values.construct_next(&Global, slot.as_mut_ptr()).is_ok());
            assert_eq!(slot.assume_init(), 1);
            assert_eq!(
                values.construct_next(&Global, slot.as_mut_ptr()),
                Err(ConstructionError::new())
            );
        }

        let mut target = 7;
        assert!(values.assign_next(&mut target).is_err());
        assert_eq!(target, 7);
    }

    #[test]
    fn copy_slice_adapter_only_bulk_copies_for_default_allocator() {
        let stats = AllocStats::new();
        let counting = CountingAllocator::new(&stats);
        let src = [1u8, 2, 3, 4];
        let mut dst = [MaybeUninit::<u8>::uninit(); 4];
        let dst_ptr = dst.as_mut_ptr().cast::<u8>();

        let mut values = CopySliceValueAdapter::new(&src[..]);
        unsafe {
            assert!(!values.copy_bulk::<CountingAllocator>(dst_ptr, 2));
            assert!(values.copy_bulk::<Global>(dst_ptr, 2));
            assert!(!values.copy_bulk::<Global>(dst_ptr.add(2), 3));
            values.construct_next(&counting, dst_ptr.add(2)).unwrap();
            values.construct_next(&counting, dst_ptr.add(3)).unwrap();
        }

        let dst = unsafe { core::mem::transmute::<_, [u8; 4]>(dst) };
        assert_eq!(dst, src);
    }

    #[test]
    fn fill_and_default_adapters_assign_repeatedly() {
        let value = alloc::string::String::from("abc");
        let mut fill = FillValueAdapter::new(&value);
        let mut defaults = DefaultValueAdapter::<alloc::string::String>::new();

        let mut target = alloc::string::String::from("xyz");
        fill.assign_next(&mut target).unwrap();
        assert_eq!(target, "abc");
        fill.assign_next(&mut target).unwrap();
        assert_eq!(target, "abc");
        defaults.assign_next(&mut target).unwrap();
        assert!(target.is_empty());
    }

    #[test]
    fn from_fn_adapter_does_not_advance_on_failure() {
        let mut values = FromFnValueAdapter::new(|i| {
            if i == 1 {
                Err(ConstructionError::new())
            } else {
                Ok(i * 10)
            }
        });

        let mut target = 0;
        values.assign_next(&mut target).unwrap();
        assert_eq!(values.produced(), 1);
        assert!(values.assign_next(&mut target).is_err());
        assert!(values.assign_next(&mut target).is_err());
        assert_eq!(values.produced(), 1);
        assert_eq!(target, 0);
    }
}
