//! Error types for pools, arenas and the cleanup protocol

use std::fmt;

/// Errors surfaced to the immediate caller of a pool operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Subsystem initialization failed or was never performed.
    InitializationFailure { reason: String },
    /// The arena could not grow to satisfy a request.
    AllocationFailure { requested: usize },
    /// `cancel`/`destroy` of a pair that is not pending in the registry.
    RegistrationNotFound,
    /// Operation attempted on a torn-down pool.
    UseAfterTeardown,
    /// Handle refers to a destroyed object, a cleared generation or another pool.
    StaleHandle,
    /// Configuration rejected by validation or parsing.
    InvalidConfig { reason: String },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializationFailure { reason } => {
                write!(f, "Subsystem initialization failed: {}", reason)
            }
            Self::AllocationFailure { requested } => {
                write!(f, "Arena cannot grow to serve {} bytes", requested)
            }
            Self::RegistrationNotFound => {
                write!(f, "Cleanup registration not found")
            }
            Self::UseAfterTeardown => {
                write!(f, "Pool used after teardown")
            }
            Self::StaleHandle => {
                write!(f, "Handle is stale (destroyed, cleared or foreign)")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "Invalid configuration: {}", reason)
            }
        }
    }
}

impl std::error::Error for PoolError {}

impl PoolError {
    pub fn init(reason: impl Into<String>) -> Self {
        Self::InitializationFailure {
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Failure reported by one cleanup callback. Never halts the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    pub message: String,
}

impl CleanupFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CleanupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cleanup failed: {}", self.message)
    }
}

impl std::error::Error for CleanupFailure {}

/// Status returned by a cleanup callback
pub type CleanupStatus = Result<(), CleanupFailure>;

/// Error from a fallible in-place construction
#[derive(Debug)]
pub enum ConstructError<E> {
    /// The pool refused the allocation or is torn down.
    Pool(PoolError),
    /// The initializer itself failed; nothing was registered.
    Init(E),
}

impl<E: fmt::Display> fmt::Display for ConstructError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pool(err) => write!(f, "{}", err),
            Self::Init(err) => write!(f, "Construction failed: {}", err),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for ConstructError<E> {}

impl<E> From<PoolError> for ConstructError<E> {
    fn from(err: PoolError) -> Self {
        Self::Pool(err)
    }
}
