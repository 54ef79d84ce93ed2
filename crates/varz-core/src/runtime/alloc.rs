//! Allocation accounting for `memstats`.
//!
//! `CountingAlloc` wraps the system allocator and keeps process-wide atomic
//! counters. A binary opts in with:
//!
//! ```ignore
//! #[global_allocator]
//! static GLOBAL: varz_core::CountingAlloc = varz_core::CountingAlloc;
//! ```
//!
//! Without it every counter reads zero and `installed()` is false.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Upper bound (inclusive) of each size class. Class 0 only counts
/// zero-sized requests; larger allocations than the last class are counted in
/// the totals but not in any class.
pub const SIZE_CLASSES: [u32; 14] = [
    0, 8, 16, 32, 64, 128, 256, 512, 1024, 2048, 4096, 8192, 16384, 32768,
];

const ZERO: AtomicU64 = AtomicU64::new(0);

static INSTALLED: AtomicBool = AtomicBool::new(false);
static IN_USE: AtomicU64 = ZERO;
static TOTAL: AtomicU64 = ZERO;
static MALLOCS: AtomicU64 = ZERO;
static FREES: AtomicU64 = ZERO;
static CLASS_MALLOCS: [AtomicU64; SIZE_CLASSES.len()] = [ZERO; SIZE_CLASSES.len()];
static CLASS_FREES: [AtomicU64; SIZE_CLASSES.len()] = [ZERO; SIZE_CLASSES.len()];

/// System allocator with allocation counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingAlloc;

fn size_class(size: usize) -> Option<usize> {
    SIZE_CLASSES.iter().position(|&max| size <= max as usize)
}

fn on_alloc(size: usize) {
    let n = size as u64;
    IN_USE.fetch_add(n, Ordering::Relaxed);
    TOTAL.fetch_add(n, Ordering::Relaxed);
    MALLOCS.fetch_add(1, Ordering::Relaxed);
    if let Some(i) = size_class(size) {
        CLASS_MALLOCS[i].fetch_add(1, Ordering::Relaxed);
    }
    if !INSTALLED.load(Ordering::Relaxed) {
        INSTALLED.store(true, Ordering::Relaxed);
    }
}

fn on_free(size: usize) {
    IN_USE.fetch_sub(size as u64, Ordering::Relaxed);
    FREES.fetch_add(1, Ordering::Relaxed);
    if let Some(i) = size_class(size) {
        CLASS_FREES[i].fetch_add(1, Ordering::Relaxed);
    }
}

// SAFETY: every call is forwarded unchanged to `System`; the bookkeeping
// only touches atomics and never allocates.
unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let p = System.alloc(layout);
        if !p.is_null() {
            on_alloc(layout.size());
        }
        p
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let p = System.alloc_zeroed(layout);
        if !p.is_null() {
            on_alloc(layout.size());
        }
        p
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        on_free(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let p = System.realloc(ptr, layout, new_size);
        if !p.is_null() {
            on_free(layout.size());
            on_alloc(new_size);
        }
        p
    }
}

/// Per-class counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassCounts {
    pub size: u32,
    pub mallocs: u64,
    pub frees: u64,
}

/// Point-in-time copy of the allocator counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocCounts {
    pub in_use: u64,
    pub total: u64,
    pub mallocs: u64,
    pub frees: u64,
    pub classes: Vec<ClassCounts>,
}

/// Whether `CountingAlloc` has served at least one allocation.
pub fn installed() -> bool {
    INSTALLED.load(Ordering::Relaxed)
}

pub fn counts() -> AllocCounts {
    let classes = SIZE_CLASSES
        .iter()
        .enumerate()
        .map(|(i, &size)| ClassCounts {
            size,
            mallocs: CLASS_MALLOCS[i].load(Ordering::Relaxed),
            frees: CLASS_FREES[i].load(Ordering::Relaxed),
        })
        .collect();

    AllocCounts {
        in_use: IN_USE.load(Ordering::Relaxed),
        total: TOTAL.load(Ordering::Relaxed),
        mallocs: MALLOCS.load(Ordering::Relaxed),
        frees: FREES.load(Ordering::Relaxed),
        classes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_class_boundaries() {
        assert_eq!(size_class(0), Some(0));
        assert_eq!(size_class(1), Some(1));
        assert_eq!(size_class(8), Some(1));
        assert_eq!(size_class(9), Some(2));
        assert_eq!(size_class(32768), Some(SIZE_CLASSES.len() - 1));
        assert_eq!(size_class(32769), None);
    }

    #[test]
    fn counts_cover_every_class() {
        let c = counts();
        assert_eq!(c.classes.len(), SIZE_CLASSES.len());
        assert_eq!(c.classes[1].size, 8);
    }
}
