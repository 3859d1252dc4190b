//! Arena blocks - system memory acquisition
//!
//! Each block is one zeroed allocation from the global allocator. Blocks never
//! move once acquired, so pointers into them stay valid until the block drops.

use core::ptr::NonNull;
use std::alloc::{alloc_zeroed, dealloc, Layout};

/// Alignment of every block start; covers all primitive types
pub const BLOCK_ALIGN: usize = 16;

/// One contiguous region owned by an arena
pub struct Block {
    start: NonNull<u8>,
    layout: Layout,
}

impl Block {
    /// Acquire a zeroed block of `size` bytes (None if the system refuses)
    pub fn new(size: usize) -> Option<Self> {
        if size == 0 {
            return None;
        }
        let layout = Layout::from_size_align(size, BLOCK_ALIGN).ok()?;

        // SAFETY: layout has non-zero size
        let start = NonNull::new(unsafe { alloc_zeroed(layout) })?;

        Some(Self { start, layout })
    }

    /// Block bounds for the bump allocator
    #[inline]
    pub fn bounds(&self) -> (*mut u8, *mut u8) {
        // SAFETY: one-past-the-end of the same allocation
        unsafe { (self.start.as_ptr(), self.start.as_ptr().add(self.layout.size())) }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Whether `ptr` points into this block
    #[inline]
    pub fn contains(&self, ptr: *const u8) -> bool {
        let (start, end) = self.bounds();
        ptr >= start as *const u8 && ptr < end as *const u8
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` with this exact layout
        unsafe {
            dealloc(self.start.as_ptr(), self.layout);
        }
    }
}
