//! Arena - growable chain of blocks with bump allocation
//!
//! Design: Two-layer architecture:
//! 1. Bump allocation inside the current block (fast path)
//! 2. Block acquisition from the system allocator (slow path, doubling sizes)
//!
//! Allocations never move. Memory is reclaimed only in bulk, by `reset`
//! (keeps the largest block for reuse) or `release` (returns everything).

mod block;
mod bump;

#[cfg(test)]
mod tests;

pub use block::BLOCK_ALIGN;
use block::Block;
use bump::BumpAllocator;
use core::ptr::NonNull;
use std::alloc::Layout;
use std::cell::RefCell;

use crate::config::ArenaConfig;
use crate::error::PoolError;
use crate::logging;

/// Alignment used by `allocate` when the caller gives only a size
pub const DEFAULT_ALIGN: usize = 16;

/// A bump arena. Not thread-safe: one arena belongs to one pool.
///
/// Allocation takes `&self` so references handed out by a pool can coexist
/// with further allocation; `reset` and `release` take `&mut self`, so the
/// borrow checker rules out outstanding references when memory is recycled.
pub struct Arena {
    inner: RefCell<ArenaInner>,
    config: ArenaConfig,
}

struct ArenaInner {
    /// Block chain; the last block is the one being bumped
    blocks: Vec<Block>,
    bump: BumpAllocator,
    next_block_size: usize,
    bytes_served: usize,
}

/// Arena statistics for monitoring and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
    /// Bytes handed out since creation or the last reset
    pub bytes_served: usize,
    /// Total bytes of blocks currently held
    pub capacity: usize,
    pub blocks: usize,
    /// Bytes left in the current block
    pub remaining: usize,
}

impl Arena {
    /// Arena with default sizing (64KB first block, doubling to 4MB, no cap)
    pub fn new() -> Self {
        Self::build(ArenaConfig::default())
    }

    /// Arena with validated custom sizing
    pub fn with_config(config: &ArenaConfig) -> Result<Self, PoolError> {
        config.validate()?;
        Ok(Self::build(config.clone()))
    }

    fn build(config: ArenaConfig) -> Self {
        Self {
            inner: RefCell::new(ArenaInner {
                blocks: Vec::new(),
                bump: BumpAllocator::new(),
                next_block_size: config.initial_block_size,
                bytes_served: 0,
            }),
            config,
        }
    }

    /// Allocate `size` zeroed bytes aligned to `DEFAULT_ALIGN`
    pub fn allocate(&self, size: usize) -> Result<NonNull<u8>, PoolError> {
        let layout = Layout::from_size_align(size, DEFAULT_ALIGN)
            .map_err(|_| PoolError::AllocationFailure { requested: size })?;
        self.allocate_layout(layout)
    }

    /// Allocate zeroed memory for `layout` (fast path first, then a new block)
    pub fn allocate_layout(&self, layout: Layout) -> Result<NonNull<u8>, PoolError> {
        let mut inner = self.inner.borrow_mut();

        let ptr = match inner.bump.try_alloc(layout.size(), layout.align()) {
            Some(ptr) => ptr,
            None => inner.alloc_slow(layout, &self.config)?,
        };

        // Reused blocks hold bytes from before the last reset
        // SAFETY: ptr is valid for layout.size() bytes
        unsafe {
            core::ptr::write_bytes(ptr.as_ptr(), 0, layout.size());
        }
        inner.bytes_served += layout.size();

        logging::log_allocation(layout.size(), ptr.as_ptr());
        Ok(ptr)
    }

    /// Invalidate every allocation, keeping the largest block for reuse
    pub fn reset(&mut self) {
        let inner = self.inner.get_mut();
        let served = inner.bytes_served;

        let largest = inner
            .blocks
            .iter()
            .enumerate()
            .max_by_key(|(_, block)| block.size())
            .map(|(index, _)| index);

        let released = inner.blocks.len().saturating_sub(1);
        match largest {
            Some(index) => {
                let keep = inner.blocks.swap_remove(index);
                inner.blocks.clear();
                let (start, end) = keep.bounds();
                inner.bump.reset(start, end);
                inner.blocks.push(keep);
            }
            None => inner.bump = BumpAllocator::new(),
        }
        inner.bytes_served = 0;

        logging::log_arena_reset(served, released);
    }

    /// Return every block to the system
    pub fn release(&mut self) {
        let inner = self.inner.get_mut();
        let capacity = inner.capacity();

        inner.blocks.clear();
        inner.bump = BumpAllocator::new();
        inner.bytes_served = 0;
        inner.next_block_size = self.config.initial_block_size;

        logging::log_arena_release(capacity);
    }

    /// Whether `ptr` points into memory currently held by this arena
    pub fn owns(&self, ptr: *const u8) -> bool {
        self.inner.borrow().blocks.iter().any(|block| block.contains(ptr))
    }

    pub fn stats(&self) -> ArenaStats {
        let inner = self.inner.borrow();
        ArenaStats {
            bytes_served: inner.bytes_served,
            capacity: inner.capacity(),
            blocks: inner.blocks.len(),
            remaining: inner.bump.remaining(),
        }
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }
}

impl ArenaInner {
    fn capacity(&self) -> usize {
        self.blocks.iter().map(Block::size).sum()
    }

    /// Acquire a block large enough for `layout` and serve it from there
    fn alloc_slow(
        &mut self,
        layout: Layout,
        config: &ArenaConfig,
    ) -> Result<NonNull<u8>, PoolError> {
        let requested = layout.size();
        let failure = PoolError::AllocationFailure { requested };

        // Worst case padding when align exceeds the block alignment
        let needed = requested
            .checked_add(layout.align().saturating_sub(BLOCK_ALIGN))
            .ok_or_else(|| failure.clone())?
            .max(1);
        let mut size = self.next_block_size.max(needed);

        let capacity = self.capacity();
        if let Some(cap) = config.max_capacity {
            let headroom = cap.saturating_sub(capacity);
            if needed > headroom {
                logging::log_allocation_failure(requested, capacity);
                return Err(failure);
            }
            size = size.min(headroom);
        }

        let block = match Block::new(size) {
            Some(block) => block,
            None => {
                logging::log_allocation_failure(requested, capacity);
                return Err(failure);
            }
        };
        let (start, end) = block.bounds();
        self.blocks.push(block);
        self.bump.reset(start, end);
        self.next_block_size = (self.next_block_size.saturating_mul(2)).min(config.max_block_size);

        logging::log_block_acquired(size, capacity + size);

        self.bump.try_alloc(layout.size(), layout.align()).ok_or(failure)
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("stats", &self.stats())
            .field("config", &self.config)
            .finish()
    }
}
