//! Bump pointer allocation - O(1) fast path within the current block

use core::ptr::NonNull;

/// Bump state over one block: `current` advances toward `end`
#[derive(Debug, Clone, Copy)]
pub struct BumpAllocator {
    current: *mut u8,
    end: *mut u8,
}

impl BumpAllocator {
    /// Empty allocator; every request misses until `reset` gives it a block
    #[inline]
    pub const fn new() -> Self {
        Self {
            current: core::ptr::null_mut(),
            end: core::ptr::null_mut(),
        }
    }

    /// Fast path: returns None when the block is exhausted (caller grows)
    #[inline(always)]
    pub fn try_alloc(&mut self, size: usize, align: usize) -> Option<NonNull<u8>> {
        debug_assert!(align.is_power_of_two(), "alignment must be power of 2");

        if self.current.is_null() {
            return None;
        }

        let padding = padding_for(self.current as usize, align);
        let needed = padding.checked_add(size)?;
        if needed > self.remaining() {
            return None;
        }

        // SAFETY: current + padding + size stays within [current, end]
        unsafe {
            let ptr = self.current.add(padding);
            self.current = ptr.add(size);
            NonNull::new(ptr)
        }
    }

    /// Point at new block bounds
    #[inline]
    pub fn reset(&mut self, start: *mut u8, end: *mut u8) {
        debug_assert!(start <= end, "invalid block bounds");
        self.current = start;
        self.end = end;
    }

    /// Remaining capacity in the current block
    #[inline]
    pub fn remaining(&self) -> usize {
        (self.end as usize).saturating_sub(self.current as usize)
    }
}

impl Default for BumpAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Bytes needed to move `addr` up to the next multiple of `align`
#[inline(always)]
const fn padding_for(addr: usize, align: usize) -> usize {
    addr.wrapping_neg() & (align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_for() {
        assert_eq!(padding_for(0, 8), 0);
        assert_eq!(padding_for(1, 8), 7);
        assert_eq!(padding_for(8, 8), 0);
        assert_eq!(padding_for(9, 16), 7);
    }

    #[test]
    fn empty_allocator_misses() {
        let mut bump = BumpAllocator::new();
        assert!(bump.try_alloc(0, 1).is_none());
        assert_eq!(bump.remaining(), 0);
    }

    #[test]
    fn exhausts_then_misses() {
        let mut bump = BumpAllocator::new();
        let mut block = [0u64; 8];
        let start = block.as_mut_ptr() as *mut u8;
        bump.reset(start, unsafe { start.add(64) });

        bump.try_alloc(32, 8).expect("first");
        bump.try_alloc(32, 8).expect("second");
        assert!(bump.try_alloc(1, 1).is_none());
        assert_eq!(bump.remaining(), 0);
    }

    #[test]
    fn aligns_after_odd_sizes() {
        let mut bump = BumpAllocator::new();
        let mut block = [0u64; 16];
        let start = block.as_mut_ptr() as *mut u8;
        bump.reset(start, unsafe { start.add(128) });

        bump.try_alloc(3, 1).expect("odd");
        let ptr = bump.try_alloc(8, 8).expect("aligned");
        assert_eq!(ptr.as_ptr() as usize % 8, 0);
        assert_eq!(bump.remaining(), 128 - 16);
    }
}
