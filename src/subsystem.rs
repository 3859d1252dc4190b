//! Process-wide initialization - must succeed before any pool is created
//!
//! `init` is idempotent: the first successful call loads the default pool
//! configuration from the environment and probes the system allocator with
//! one block; later calls return immediately. `shutdown` is the explicit
//! teardown hook. Pools created afterwards fail until `init` runs again.

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::arena::Arena;
use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::logging;

static SUBSYSTEM: Lazy<Mutex<SubsystemState>> = Lazy::new(|| Mutex::new(SubsystemState::default()));

#[derive(Default)]
struct SubsystemState {
    /// Present while initialized
    default_config: Option<PoolConfig>,
}

/// Initialize the subsystem (idempotent). Failure is fatal for the caller.
pub fn init() -> Result<(), PoolError> {
    let mut state = SUBSYSTEM.lock();
    if state.default_config.is_some() {
        return Ok(());
    }

    let config = PoolConfig::from_env().map_err(|err| PoolError::init(err.to_string()))?;
    probe(&config)?;

    logging::log_subsystem_init(config.arena.initial_block_size);
    state.default_config = Some(config);
    Ok(())
}

/// Explicit teardown hook. Existing pools stay usable; new ones need `init`.
pub fn shutdown() {
    if SUBSYSTEM.lock().default_config.take().is_some() {
        logging::log_subsystem_shutdown();
    }
}

pub fn is_initialized() -> bool {
    SUBSYSTEM.lock().default_config.is_some()
}

pub(crate) fn ensure_initialized() -> Result<(), PoolError> {
    if is_initialized() {
        Ok(())
    } else {
        Err(PoolError::init("regionpool::init() has not been called"))
    }
}

/// Configuration used by `Pool::new`
pub(crate) fn default_config() -> Result<PoolConfig, PoolError> {
    SUBSYSTEM
        .lock()
        .default_config
        .clone()
        .ok_or_else(|| PoolError::init("regionpool::init() has not been called"))
}

/// Acquire and return one block so a broken allocator fails at startup
fn probe(config: &PoolConfig) -> Result<(), PoolError> {
    let mut arena =
        Arena::with_config(&config.arena).map_err(|err| PoolError::init(err.to_string()))?;
    arena
        .allocate(1)
        .map_err(|err| PoolError::init(format!("allocator probe failed: {}", err)))?;
    arena.release();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init().unwrap();
        init().unwrap();
        assert!(is_initialized());
        assert!(default_config().is_ok());
    }

    #[test]
    fn probe_rejects_invalid_config() {
        let mut config = PoolConfig::default();
        config.arena.initial_block_size = 0;
        assert!(matches!(probe(&config), Err(PoolError::InitializationFailure { .. })));
    }
}
