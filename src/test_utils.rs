//! Helpers shared by the unit tests.

use crate::allocator::Allocator;
use crate::error::AllocError;

use core::alloc::Layout;
use core::cell::Cell;
use core::ptr::NonNull;

pub const RNG_SEED: [u8; 32] = [
    0x8f, 0x1d, 0x6b, 0x22, 0xe4, 0x57, 0x90, 0x3c, 0x0a, 0xb7, 0x61, 0xd2, 0x4e, 0x19, 0xf3, 0x85,
    0x3b, 0xc8, 0x72, 0x06, 0x9d, 0x44, 0xaa, 0x1f, 0xe0, 0x5c, 0x27, 0xb3, 0x68, 0xfd, 0x91, 0x0e,
];

/// Counts how many [`Droppable`]s were created and dropped.
#[derive(Debug, Default)]
pub struct DropCounter {
    created: Cell<usize>,
    dropped: Cell<usize>,
}

impl DropCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_droppable<T>(&self, value: T) -> Droppable<'_, T> {
        self.created.set(self.created.get() + 1);
        Droppable {
            counter: self,
            value,
        }
    }

    pub fn created(&self) -> usize {
        self.created.get()
    }

    pub fn dropped(&self) -> usize {
        self.dropped.get()
    }

    pub fn live(&self) -> usize {
        self.created() - self.dropped()
    }
}

/// A value that reports its creation and destruction to a [`DropCounter`].
#[derive(Debug)]
pub struct Droppable<'a, T> {
    counter: &'a DropCounter,
    pub value: T,
}

impl<T: Clone> Clone for Droppable<'_, T> {
    fn clone(&self) -> Self {
        self.counter.new_droppable(self.value.clone())
    }
}

impl<T: PartialEq> PartialEq for Droppable<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Drop for Droppable<'_, T> {
    fn drop(&mut self) {
        self.counter.dropped.set(self.counter.dropped.get() + 1);
    }
}

/// A value that reports its destruction to a [`DropCounter`], and panics
/// while being dropped if it is armed. Clones are never armed.
#[derive(Debug)]
pub struct PanicOnDrop<'a> {
    counter: &'a DropCounter,
    pub value: usize,
    armed: bool,
}

impl<'a> PanicOnDrop<'a> {
    pub fn new(counter: &'a DropCounter, value: usize, armed: bool) -> Self {
        counter.created.set(counter.created.get() + 1);
        PanicOnDrop {
            counter,
            value,
            armed,
        }
    }
}

impl Clone for PanicOnDrop<'_> {
    fn clone(&self) -> Self {
        PanicOnDrop::new(self.counter, self.value, false)
    }
}

impl Drop for PanicOnDrop<'_> {
    fn drop(&mut self) {
        self.counter.dropped.set(self.counter.dropped.get() + 1);
        if self.armed {
            panic!("armed value dropped");
        }
    }
}

/// A clonable value whose `clone` panics once a shared budget runs out.
#[derive(Debug)]
pub struct PanicOnClone<'a> {
    pub value: u32,
    budget: &'a Cell<usize>,
}

impl<'a> PanicOnClone<'a> {
    pub fn new(value: u32, budget: &'a Cell<usize>) -> Self {
        PanicOnClone { value, budget }
    }
}

impl Clone for PanicOnClone<'_> {
    fn clone(&self) -> Self {
        let left = self.budget.get();
        if left == 0 {
            panic!("clone budget exhausted");
        }
        self.budget.set(left - 1);
        PanicOnClone {
            value: self.value,
            budget: self.budget,
        }
    }
}

/// Bookkeeping for a [`CountingAllocator`].
#[derive(Debug, Default)]
pub struct AllocStats {
    allocations: Cell<usize>,
    deallocations: Cell<usize>,
    live_bytes: Cell<usize>,
    fail_next: Cell<bool>,
}

impl AllocStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful allocations.
    pub fn allocations(&self) -> usize {
        self.allocations.get()
    }

    pub fn deallocations(&self) -> usize {
        self.deallocations.get()
    }

    /// Bytes currently handed out and not yet returned.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.get()
    }

    /// Makes the next allocation request fail.
    pub fn fail_next_allocation(&self) {
        self.fail_next.set(true);
    }
}

/// Forwards to the global allocator while recording every request in an
/// [`AllocStats`].
#[derive(Debug, Clone, Copy)]
pub struct CountingAllocator<'a> {
    stats: &'a AllocStats,
}

impl<'a> CountingAllocator<'a> {
    pub fn new(stats: &'a AllocStats) -> Self {
        CountingAllocator { stats }
    }
}

unsafe impl Allocator for CountingAllocator<'_> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if self.stats.fail_next.replace(false) {
            return Err(AllocError::AllocFailed { layout });
        }

        let ptr = unsafe { alloc::alloc::alloc(layout) };
        let ptr = NonNull::new(ptr).ok_or(AllocError::AllocFailed { layout })?;
        self.stats.allocations.set(self.stats.allocations.get() + 1);
        self.stats.live_bytes.set(self.stats.live_bytes.get() + layout.size());
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.stats.deallocations.set(self.stats.deallocations.get() + 1);
        self.stats.live_bytes.set(self.stats.live_bytes.get() - layout.size());
        alloc::alloc::dealloc(ptr.as_ptr(), layout);
    }
}
