//! Kernel Heap
//!
//! Uses `linked_list_allocator` for heap management. Descriptor entries,
//! process links and copied-in strings all come from here on bare metal.
//!
//! With the `global-heap` feature the heap is installed as the global
//! allocator; the embedding kernel must call [`init_heap`] before the first
//! allocation.

use linked_list_allocator::LockedHeap;

/// Kernel heap instance
#[cfg_attr(all(feature = "global-heap", not(test)), global_allocator)]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Heap occupancy snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    pub size: usize,
    pub used: usize,
    pub free: usize,
}

/// Hand a memory region to the kernel heap.
///
/// # Safety
/// - Must be called exactly once, before any heap allocation
/// - `start..start + size` must be valid, writable, otherwise unused memory
///   that lives for the rest of the kernel's lifetime
pub unsafe fn init_heap(start: *mut u8, size: usize) {
    // SAFETY: Caller guarantees the region is valid and exclusively ours
    unsafe {
        ALLOCATOR.lock().init(start, size);
    }
    log::debug!("heap: {} KiB at {:p}", size / 1024, start);
}

/// Report current heap usage
pub fn heap_stats() -> HeapStats {
    let heap = ALLOCATOR.lock();
    HeapStats {
        size: heap.size(),
        used: heap.used(),
        free: heap.free(),
    }
}
