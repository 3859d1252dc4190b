//! Logging infrastructure - structured tracing for pool lifecycles
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Configurable log levels per module
//! - Zero-cost when disabled
//! - Span-based timing of clear/teardown batches
//! - Console or file output, human-readable or JSON

use once_cell::sync::OnceCell;
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Keeps the non-blocking file writer flushing for the process lifetime
static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Log file path (console when `None`)
    pub log_path: Option<String>,
    /// Enable JSON format (vs human-readable)
    pub json_format: bool,
    /// Show span events (enter/exit)
    pub show_spans: bool,
    /// Log durations of clear/teardown batches
    pub track_performance: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_path: None,
            json_format: false,
            show_spans: false,
            track_performance: cfg!(debug_assertions),
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // REGIONPOOL_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level_str) = std::env::var("REGIONPOOL_LOG_LEVEL") {
            config.level = parse_level(&level_str);
        }

        if let Ok(path) = std::env::var("REGIONPOOL_LOG_FILE") {
            config.log_path = Some(path);
        }

        config.json_format = std::env::var("REGIONPOOL_LOG_JSON").is_ok();
        config.show_spans = std::env::var("REGIONPOOL_LOG_SPANS").is_ok();

        if let Ok(val) = std::env::var("REGIONPOOL_LOG_PERF") {
            config.track_performance = val == "1" || val.to_lowercase() == "true";
        }

        config
    }

    /// Minimal logging for hot allocation paths
    pub fn performance() -> Self {
        Self {
            level: Level::ERROR,
            log_path: None,
            json_format: false,
            show_spans: false,
            track_performance: false,
        }
    }

    /// Verbose logging to `regionpool.log`
    pub fn debug() -> Self {
        Self {
            level: Level::TRACE,
            log_path: Some("regionpool.log".to_string()),
            json_format: false,
            show_spans: true,
            track_performance: true,
        }
    }
}

fn parse_level(raw: &str) -> Level {
    match raw.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging with configuration from the environment
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with custom configuration (first call wins)
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        perf::set_enabled(config.track_performance);

        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("regionpool={}", config.level.as_str().to_lowercase()))
        });

        let span_events = if config.show_spans {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let layer = match &config.log_path {
            Some(path) => {
                let path = Path::new(path);
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or(Path::new("."));
                let file = path
                    .file_name()
                    .map(|f| f.to_os_string())
                    .unwrap_or_else(|| "regionpool.log".into());
                let appender = tracing_appender::rolling::never(dir, file);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let _ = FILE_GUARD.set(guard);

                let base = fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_span_events(span_events)
                    .with_target(true);
                if config.json_format {
                    base.json().boxed()
                } else {
                    base.boxed()
                }
            }
            None => {
                let base = fmt::layer()
                    .with_writer(io::stdout)
                    .with_span_events(span_events)
                    .with_target(true)
                    .with_line_number(cfg!(debug_assertions));
                if config.json_format {
                    base.json().boxed()
                } else {
                    base.boxed()
                }
            }
        };

        // Another subscriber may already be installed by the host application
        let _ = tracing_subscriber::registry().with(env_filter).with(layer).try_init();
    });
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

// ============================================================================
// Pool-specific logging functions
// ============================================================================

/// Log a block acquired from the system allocator
#[inline]
pub fn log_block_acquired(size: usize, total_capacity: usize) {
    use tracing::debug;
    debug!(
        event = "block_acquired",
        size_bytes = size,
        capacity_bytes = total_capacity,
        "Arena block acquired"
    );
}

/// Log an arena growth refused by the system or the capacity limit
#[inline]
pub fn log_allocation_failure(requested: usize, capacity: usize) {
    use tracing::warn;
    warn!(
        event = "allocation_failure",
        requested_bytes = requested,
        capacity_bytes = capacity,
        "Arena cannot grow"
    );
}

/// Log a raw allocation
#[inline]
pub fn log_allocation(size: usize, ptr: *const u8) {
    use tracing::trace;
    trace!(
        event = "allocation",
        size_bytes = size,
        address = ?ptr,
        "Memory allocated"
    );
}

/// Log an arena reset
pub fn log_arena_reset(bytes_served: usize, blocks_released: usize) {
    use tracing::debug;
    debug!(
        event = "arena_reset",
        bytes_served,
        blocks_released,
        "Arena reset"
    );
}

/// Log an arena release
pub fn log_arena_release(capacity: usize) {
    use tracing::debug;
    debug!(
        event = "arena_release",
        capacity_bytes = capacity,
        "Arena memory returned"
    );
}

/// Log pool creation
pub fn log_pool_created(pool_id: u64, view: bool) {
    use tracing::debug;
    debug!(
        event = "pool_created",
        pool_id,
        view,
        "Pool created"
    );
}

/// Log pool teardown
pub fn log_pool_teardown(pool_id: u64, cleanups_run: usize) {
    use tracing::debug;
    debug!(
        event = "pool_teardown",
        pool_id,
        cleanups_run,
        "Pool torn down"
    );
}

/// Log a completed cleanup batch
pub fn log_cleanup_batch(pool_id: u64, ran: usize, failed: usize) {
    use tracing::debug;
    debug!(
        event = "cleanup_batch",
        pool_id,
        ran,
        failed,
        "Cleanup batch complete"
    );
}

/// Log a failing cleanup callback
pub fn log_cleanup_failure(message: &str) {
    use tracing::error;
    error!(
        event = "cleanup_failure",
        error = message,
        "Cleanup callback failed"
    );
}

/// Log subsystem initialization
pub fn log_subsystem_init(block_size: usize) {
    use tracing::info;
    info!(
        event = "subsystem_init",
        block_size,
        "regionpool subsystem initialized"
    );
}

/// Log subsystem shutdown
pub fn log_subsystem_shutdown() {
    use tracing::info;
    info!(
        event = "subsystem_shutdown",
        "regionpool subsystem shutting down"
    );
}

/// Performance tracking utilities
pub mod perf {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;
    use tracing::debug;

    static ENABLED: AtomicBool = AtomicBool::new(cfg!(debug_assertions));

    pub(super) fn set_enabled(enabled: bool) {
        ENABLED.store(enabled, Ordering::Relaxed);
    }

    /// Track operation duration (returns guard that logs on drop)
    #[must_use]
    pub fn track(operation: &'static str) -> PerformanceGuard {
        PerformanceGuard {
            operation,
            start: ENABLED.load(Ordering::Relaxed).then(Instant::now),
        }
    }

    pub struct PerformanceGuard {
        operation: &'static str,
        start: Option<Instant>,
    }

    impl Drop for PerformanceGuard {
        fn drop(&mut self) {
            if let Some(start) = self.start {
                debug!(
                    operation = self.operation,
                    duration_us = start.elapsed().as_micros() as u64,
                    "operation completed"
                );
            }
        }
    }
}
