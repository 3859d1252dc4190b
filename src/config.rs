//! Pool configuration - loaded from TOML files or the environment
//!
//! ```toml
//! [arena]
//! initial_block_size = 65536
//! max_block_size = 4194304
//! max_capacity = 67108864
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::PoolError;

/// Arena sizing defaults (64KB first block, doubling up to 4MB)
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;
pub const MAX_BLOCK_SIZE: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default)]
    pub arena: ArenaConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Size of the first block acquired from the system
    #[serde(default = "default_block_size")]
    pub initial_block_size: usize,

    /// Upper bound for the doubling block-size strategy
    #[serde(default = "default_max_block_size")]
    pub max_block_size: usize,

    /// Hard cap on the total bytes of blocks held by one arena
    #[serde(default)]
    pub max_capacity: Option<usize>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            initial_block_size: DEFAULT_BLOCK_SIZE,
            max_block_size: MAX_BLOCK_SIZE,
            max_capacity: None,
        }
    }
}

fn default_block_size() -> usize {
    DEFAULT_BLOCK_SIZE
}

fn default_max_block_size() -> usize {
    MAX_BLOCK_SIZE
}

impl ArenaConfig {
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.initial_block_size == 0 {
            return Err(PoolError::config("initial_block_size must be non-zero"));
        }
        if self.max_block_size < self.initial_block_size {
            return Err(PoolError::config(format!(
                "max_block_size ({}) is smaller than initial_block_size ({})",
                self.max_block_size, self.initial_block_size
            )));
        }
        if let Some(cap) = self.max_capacity {
            if cap < self.initial_block_size {
                return Err(PoolError::config(format!(
                    "max_capacity ({}) cannot hold the first block ({})",
                    cap, self.initial_block_size
                )));
            }
        }
        Ok(())
    }
}

impl PoolConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, PoolError> {
        let content = fs::read_to_string(path)
            .map_err(|e| PoolError::config(format!("Failed to read config: {}", e)))?;

        Self::parse(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, PoolError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| PoolError::config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `REGIONPOOL_*` environment variables
    ///
    /// - `REGIONPOOL_CONFIG`: path to a TOML file, read first
    /// - `REGIONPOOL_BLOCK_SIZE`, `REGIONPOOL_MAX_BLOCK_SIZE`, `REGIONPOOL_MAX_CAPACITY`
    pub fn from_env() -> Result<Self, PoolError> {
        let mut config = match std::env::var("REGIONPOOL_CONFIG") {
            Ok(path) => Self::load(Path::new(&path))?,
            Err(_) => Self::default(),
        };

        if let Some(size) = env_usize("REGIONPOOL_BLOCK_SIZE")? {
            config.arena.initial_block_size = size;
        }
        if let Some(size) = env_usize("REGIONPOOL_MAX_BLOCK_SIZE")? {
            config.arena.max_block_size = size;
        }
        if let Some(cap) = env_usize("REGIONPOOL_MAX_CAPACITY")? {
            config.arena.max_capacity = Some(cap);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        self.arena.validate()
    }

    pub fn with_arena(mut self, arena: ArenaConfig) -> Self {
        self.arena = arena;
        self
    }
}

fn env_usize(key: &str) -> Result<Option<usize>, PoolError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| PoolError::config(format!("{} is not a byte count: {:?}", key, raw))),
        Err(_) => Ok(None),
    }
}
