//! Arena tests
//!
//! Organized by component:
//! - Allocation: sizes, alignment, zeroing, distinctness
//! - Growth: block chaining, doubling, capacity limit
//! - Reset/Release: bulk reclamation

use super::*;
use crate::config::ArenaConfig;

fn small_arena() -> Arena {
    Arena::with_config(&ArenaConfig {
        initial_block_size: 256,
        max_block_size: 1024,
        max_capacity: None,
    })
    .expect("valid config")
}

// ===== Allocation =====

#[test]
fn arena_starts_empty() {
    let arena = Arena::new();
    let stats = arena.stats();
    assert_eq!(stats.bytes_served, 0);
    assert_eq!(stats.capacity, 0);
    assert_eq!(stats.blocks, 0);
}

#[test]
fn sequential_allocations_are_distinct_and_increasing() {
    let arena = Arena::new();

    let a = arena.allocate(64).expect("first").as_ptr() as usize;
    let b = arena.allocate(64).expect("second").as_ptr() as usize;
    let c = arena.allocate(64).expect("third").as_ptr() as usize;

    assert!(a < b && b < c);
    assert!(b - a >= 64);
}

#[test]
fn allocation_alignment_powers_of_two() {
    let arena = Arena::new();

    for align in [1, 2, 4, 8, 16, 32, 64, 128, 256] {
        let layout = Layout::from_size_align(24, align).unwrap();
        let ptr = arena.allocate_layout(layout).expect("aligned alloc");
        assert_eq!(ptr.as_ptr() as usize % align, 0, "not aligned to {}", align);
    }
}

#[test]
fn default_allocation_uses_default_align() {
    let arena = Arena::new();
    arena.allocate(3).unwrap();
    let ptr = arena.allocate(8).unwrap();
    assert_eq!(ptr.as_ptr() as usize % DEFAULT_ALIGN, 0);
}

#[test]
fn allocations_are_zeroed() {
    let arena = Arena::new();
    let ptr = arena.allocate(128).unwrap();
    let bytes = unsafe { core::slice::from_raw_parts(ptr.as_ptr(), 128) };
    assert!(bytes.iter().all(|&b| b == 0));
}

#[test]
fn zero_size_allocation() {
    let arena = Arena::new();
    assert!(arena.allocate(0).is_ok());
}

// ===== Growth =====

#[test]
fn large_allocation_exceeds_default_block() {
    let arena = Arena::new();

    let size = 128 * 1024;
    let ptr = arena.allocate(size).expect("large alloc");
    assert!(arena.stats().capacity >= size);

    unsafe {
        core::ptr::write_bytes(ptr.as_ptr(), 0xAA, size);
    }
}

#[test]
fn growth_chains_blocks_with_doubling() {
    let arena = small_arena();

    arena.allocate(200).unwrap();
    assert_eq!(arena.stats().capacity, 256);

    arena.allocate(200).unwrap();
    assert_eq!(arena.stats().blocks, 2);
    assert_eq!(arena.stats().capacity, 256 + 512);

    arena.allocate(600).unwrap();
    assert_eq!(arena.stats().capacity, 256 + 512 + 1024);

    // Capped at max_block_size
    arena.allocate(1000).unwrap();
    assert_eq!(arena.stats().capacity, 256 + 512 + 1024 + 1024);
}

#[test]
fn bytes_served_is_monotonic() {
    let arena = small_arena();
    let mut last = 0;

    for size in [1, 17, 300, 0, 1024, 5] {
        arena.allocate(size).unwrap();
        let served = arena.stats().bytes_served;
        assert!(served >= last);
        last = served;
    }
    assert_eq!(last, 1 + 17 + 300 + 1024 + 5);
}

#[test]
fn capacity_limit_signals_allocation_failure() {
    let arena = Arena::with_config(&ArenaConfig {
        initial_block_size: 256,
        max_block_size: 256,
        max_capacity: Some(512),
    })
    .unwrap();

    arena.allocate(200).unwrap();
    arena.allocate(200).unwrap();

    let err = arena.allocate(200).unwrap_err();
    assert_eq!(err, PoolError::AllocationFailure { requested: 200 });

    // Earlier allocations are untouched by the failure
    assert_eq!(arena.stats().bytes_served, 400);
}

#[test]
fn oversized_request_fails_without_growing() {
    let arena = Arena::with_config(&ArenaConfig {
        initial_block_size: 256,
        max_block_size: 256,
        max_capacity: Some(1024),
    })
    .unwrap();

    assert!(arena.allocate(4096).is_err());
    assert_eq!(arena.stats().blocks, 0);
}

#[test]
fn owns_tracks_block_membership() {
    let arena = Arena::new();
    let ptr = arena.allocate(8).unwrap();
    let local = 0u8;

    assert!(arena.owns(ptr.as_ptr()));
    assert!(!arena.owns(&local as *const u8));
}

// ===== Reset / Release =====

#[test]
fn reset_keeps_largest_block() {
    let mut arena = small_arena();
    arena.allocate(200).unwrap();
    arena.allocate(200).unwrap();
    arena.allocate(600).unwrap();

    arena.reset();

    let stats = arena.stats();
    assert_eq!(stats.blocks, 1);
    assert_eq!(stats.capacity, 1024);
    assert_eq!(stats.bytes_served, 0);
    assert_eq!(stats.remaining, 1024);
}

#[test]
fn reset_reuses_and_rezeroes_memory() {
    let mut arena = small_arena();
    let first = arena.allocate(64).unwrap();
    unsafe {
        core::ptr::write_bytes(first.as_ptr(), 0xFF, 64);
    }

    arena.reset();

    let again = arena.allocate(64).unwrap();
    assert_eq!(first, again);
    let bytes = unsafe { core::slice::from_raw_parts(again.as_ptr(), 64) };
    assert!(bytes.iter().all(|&b| b == 0));
}

#[test]
fn reset_on_empty_arena() {
    let mut arena = Arena::new();
    arena.reset();
    assert_eq!(arena.stats().blocks, 0);
    assert!(arena.allocate(16).is_ok());
}

#[test]
fn release_returns_everything() {
    let mut arena = small_arena();
    arena.allocate(200).unwrap();
    arena.allocate(900).unwrap();

    arena.release();

    let stats = arena.stats();
    assert_eq!(stats.capacity, 0);
    assert_eq!(stats.blocks, 0);

    // Growth restarts from the initial block size
    arena.allocate(1).unwrap();
    assert_eq!(arena.stats().capacity, 256);
}

#[test]
fn invalid_config_rejected() {
    let config = ArenaConfig {
        initial_block_size: 0,
        max_block_size: 16,
        max_capacity: None,
    };
    assert!(matches!(Arena::with_config(&config), Err(PoolError::InvalidConfig { .. })));
}
