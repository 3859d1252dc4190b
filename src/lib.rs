//! regionpool - region-based memory pools with ordered deferred cleanup
//!
//! A [`Pool`] bump-allocates from a growable [`Arena`] and keeps a
//! [`CleanupRegistry`] of type-erased destructors. Objects are released
//! together: `clear` (or dropping the pool) runs every pending cleanup in
//! reverse registration order, exactly once, then recycles the memory.
//!
//! ```ignore
//! regionpool::init()?;
//! let mut pool = regionpool::Pool::new()?;
//!
//! let name = pool.duplicate_string("session")?;
//! let state = pool.construct(vec![1, 2, 3])?;
//! assert_eq!(pool.get(&state)?.len(), 3);
//!
//! pool.clear()?; // drops the vec, invalidates `state`
//! ```
//!
//! Not thread-safe: a pool belongs to one thread at a time.

pub mod adapter;
pub mod arena;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod logging;
pub mod pool;
mod subsystem;

pub use adapter::PoolAllocator;
pub use arena::{Arena, ArenaStats};
pub use cleanup::{CleanupFn, CleanupKind, CleanupRegistry, CleanupReport};
pub use config::{ArenaConfig, PoolConfig};
pub use error::{CleanupFailure, CleanupStatus, ConstructError, PoolError};
pub use pool::{Adopted, Handle, Ownership, Pool, PoolState, PoolStats};
pub use subsystem::{init, is_initialized, shutdown};
