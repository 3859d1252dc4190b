//! Allocator adapter - lets containers draw memory from a pool
//!
//! `PoolAllocator<T>` is a typed, rebindable allocator value bound to one
//! pool. It also implements `allocator_api2::alloc::Allocator`, so
//! `allocator_api2::vec::Vec`, `Box` and friends can be built on a pool:
//!
//! ```ignore
//! let pool = Pool::new()?;
//! let mut values = allocator_api2::vec::Vec::new_in(pool.allocator::<u32>());
//! values.push(7);
//! ```
//!
//! # Deallocation is a no-op
//!
//! An arena cannot reclaim one allocation, so `deallocate` releases nothing:
//! a container that frees or regrows its buffer leaves the old bytes in the
//! arena until the pool is cleared. Clearing the whole pool on every
//! deallocate would invalidate every other live allocation of that pool, so
//! it is deliberately not done. Long-lived containers that churn their buffers
//! should use a dedicated pool and clear it periodically.

use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;
use std::alloc::Layout;

use allocator_api2::alloc::{AllocError, Allocator};

use crate::arena::Arena;
use crate::error::PoolError;
use crate::pool::{Pool, PoolState};

/// Typed allocator handle over a pool. Holds no allocation state.
///
/// Borrows the pool's arena rather than the pool itself, so the pool cannot
/// be cleared or torn down while any copy is alive.
pub struct PoolAllocator<'p, T> {
    arena: &'p Arena,
    pool_id: u64,
    live: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<'p, T> PoolAllocator<'p, T> {
    pub fn new(pool: &'p Pool<'_>) -> Self {
        Self {
            arena: pool.arena(),
            pool_id: pool.id(),
            live: pool.state() == PoolState::Live,
            _marker: PhantomData,
        }
    }

    /// Id of the pool this allocator draws from
    pub fn pool_id(&self) -> u64 {
        self.pool_id
    }

    /// Uninitialized-by-contract (zeroed in practice) room for `count` values
    pub fn allocate(&self, count: usize) -> Result<NonNull<T>, PoolError> {
        let layout = Layout::array::<T>(count).map_err(|_| PoolError::AllocationFailure {
            requested: count.saturating_mul(core::mem::size_of::<T>()),
        })?;
        self.allocate_layout(layout).map(NonNull::cast)
    }

    /// No-op: bytes are reclaimed only by `Pool::clear` or teardown
    pub fn deallocate(&self, ptr: NonNull<T>, count: usize) {
        debug_assert!(
            count == 0
                || core::mem::size_of::<T>() == 0
                || self.arena.owns(ptr.as_ptr() as *const u8),
            "deallocating memory not served by this pool"
        );
        let _ = (ptr, count);
    }

    /// Same pool, different element type
    pub fn rebind<U>(self) -> PoolAllocator<'p, U> {
        PoolAllocator {
            arena: self.arena,
            pool_id: self.pool_id,
            live: self.live,
            _marker: PhantomData,
        }
    }

    /// Largest `count` that `allocate` can describe
    pub fn max_size(&self) -> usize {
        match core::mem::size_of::<T>() {
            0 => usize::MAX,
            size => isize::MAX as usize / size,
        }
    }

    // The pool state cannot change while the arena is borrowed
    fn allocate_layout(&self, layout: Layout) -> Result<NonNull<u8>, PoolError> {
        if !self.live {
            return Err(PoolError::UseAfterTeardown);
        }
        self.arena.allocate_layout(layout)
    }
}

impl<T> Clone for PoolAllocator<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PoolAllocator<'_, T> {}

/// Equal iff bound to the same pool, whatever the element types
impl<'p, T, U> PartialEq<PoolAllocator<'p, U>> for PoolAllocator<'p, T> {
    fn eq(&self, other: &PoolAllocator<'p, U>) -> bool {
        self.pool_id == other.pool_id
    }
}

impl<T> Eq for PoolAllocator<'_, T> {}

impl<T> fmt::Debug for PoolAllocator<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("pool_id", &self.pool_id)
            .field("element", &core::any::type_name::<T>())
            .finish()
    }
}

// SAFETY: returned blocks stay valid until the pool is cleared or torn down,
// both of which need `&mut Pool` and so cannot happen while this allocator
// (which borrows the pool's arena) or any container using it is alive. Copies
// share the arena and can free each other's blocks (freeing is a no-op).
unsafe impl<T> Allocator for PoolAllocator<'_, T> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        let ptr = self.allocate_layout(layout).map_err(|_| AllocError)?;
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocator_api2::vec::Vec as PoolVec;

    fn pool() -> Pool<'static> {
        crate::init().expect("subsystem init");
        Pool::new().expect("pool")
    }

    #[test]
    fn allocations_do_not_overlap() {
        let pool = pool();
        let ints = pool.allocator::<i32>();

        let first = ints.allocate(10).unwrap();
        let second = ints.allocate(5).unwrap();

        let a = first.as_ptr() as usize..first.as_ptr() as usize + 10 * 4;
        let b = second.as_ptr() as usize..second.as_ptr() as usize + 5 * 4;
        assert!(a.end <= b.start || b.end <= a.start);
        assert_eq!(first.as_ptr() as usize % core::mem::align_of::<i32>(), 0);
    }

    #[test]
    fn deallocate_keeps_other_allocations_valid() {
        let pool = pool();
        let ints = pool.allocator::<u64>();

        let keep = ints.allocate(4).unwrap();
        unsafe { keep.as_ptr().write(0xDEAD_BEEF) };

        let scratch = ints.allocate(4).unwrap();
        ints.deallocate(scratch, 4);

        assert_eq!(unsafe { keep.as_ptr().read() }, 0xDEAD_BEEF);
        assert_eq!(pool.generation(), 0);
    }

    #[test]
    fn rebind_preserves_pool_and_equality() {
        let pool = pool();
        let ints = pool.allocator::<i32>();
        let strings = ints.rebind::<String>();

        assert!(ints == strings);
        assert_eq!(strings.pool_id(), pool.id());
    }

    #[test]
    fn adapters_of_distinct_pools_differ() {
        let (p1, p2) = (pool(), pool());
        assert!(p1.allocator::<u8>() != p2.allocator::<u8>());
    }

    #[test]
    fn overflowing_count_is_allocation_failure() {
        let pool = pool();
        let err = pool.allocator::<u64>().allocate(usize::MAX).unwrap_err();
        assert!(matches!(err, PoolError::AllocationFailure { .. }));
    }

    #[test]
    fn max_size_reflects_element_size() {
        let pool = pool();
        assert_eq!(pool.allocator::<u32>().max_size(), isize::MAX as usize / 4);
        assert_eq!(pool.allocator::<()>().max_size(), usize::MAX);
    }

    #[test]
    fn torn_down_pool_refuses_allocation() {
        let mut pool = pool();
        pool.teardown().unwrap();

        let err = pool.allocator::<u32>().allocate(4).unwrap_err();
        assert_eq!(err, PoolError::UseAfterTeardown);
    }

    #[test]
    fn vec_grows_inside_pool() {
        let pool = pool();
        let mut values = PoolVec::new_in(pool.allocator::<u32>());
        for i in 0..1000 {
            values.push(i);
        }

        assert_eq!(values.iter().sum::<u32>(), 999 * 1000 / 2);
        assert!(pool.arena().owns(values.as_ptr() as *const u8));
    }

    #[test]
    fn container_of_rebound_type() {
        let pool = pool();
        let bytes = pool.allocator::<u8>();
        let mut words = PoolVec::new_in(bytes.rebind::<&str>());
        words.extend_from_slice(&["arena", "pool"]);
        assert_eq!(words.join(" "), "arena pool");
    }
}
