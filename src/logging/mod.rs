//! Logging infrastructure - structured tracing throughout the allocator
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Configurable log levels per module
//! - Zero-cost when disabled
//! - Console output (human-readable or JSON) and optional file output

use once_cell::sync::OnceCell;
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

pub use tracing::{debug, error, info, trace, warn};

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Log file path (file output disabled when `None`)
    pub log_path: Option<String>,
    /// Enable JSON format (vs human-readable)
    pub json_format: bool,
    /// Show span events (enter/exit)
    pub show_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_path: None,
            json_format: false,
            show_spans: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // SCOPEALLOC_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level_str) = std::env::var("SCOPEALLOC_LOG_LEVEL") {
            config.level = parse_level(&level_str);
        }

        // SCOPEALLOC_LOG_FILE: path to log file
        if let Ok(path) = std::env::var("SCOPEALLOC_LOG_FILE") {
            config.log_path = Some(path);
        }

        config.json_format = std::env::var("SCOPEALLOC_LOG_JSON").is_ok();
        config.show_spans = std::env::var("SCOPEALLOC_LOG_SPANS").is_ok();

        config
    }

    /// Create debug config (verbose logging)
    pub fn debug() -> Self {
        Self {
            level: Level::TRACE,
            log_path: Some("scopealloc.log".to_string()),
            json_format: false,
            show_spans: true,
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
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

/// Initialize logging with custom configuration
///
/// Only the first call has an effect. An already-installed global
/// subscriber is left in place.
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("scopealloc={}", config.level.as_str().to_lowercase()))
        });

        let span_events = if config.show_spans {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let console = (!config.json_format).then(|| {
            fmt::layer()
                .with_writer(io::stderr)
                .with_span_events(span_events.clone())
                .with_target(true)
                .with_thread_ids(cfg!(debug_assertions))
                .with_line_number(cfg!(debug_assertions))
        });

        let json = config.json_format.then(|| {
            fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_span_events(span_events.clone())
        });

        let file = config.log_path.as_deref().map(|path| {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(Path::new)
                .unwrap_or_else(|| Path::new("scopealloc.log"));

            fmt::layer()
                .with_writer(tracing_appender::rolling::never(dir, name))
                .with_ansi(false)
                .with_span_events(span_events)
        });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console)
            .with(json)
            .with(file)
            .try_init()
            .ok();
    });
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

// ============================================================================
// Allocator-specific logging functions
// ============================================================================

/// Log a successful allocation
#[inline]
pub fn log_allocation(owner: u32, size: usize, addr: usize) {
    trace!(
        event = "allocation",
        owner,
        size_bytes = size,
        address = addr,
        "Memory allocated"
    );
}

/// Log an ignored deallocation request
#[inline]
pub fn log_deallocation(addr: usize, size: usize) {
    trace!(
        event = "deallocation",
        address = addr,
        size_bytes = size,
        "Deallocation ignored; memory is reclaimed per owner"
    );
}

/// Log creation of a new region
#[inline]
pub fn log_region_created(owner: u32, start: usize, reserved: usize) {
    debug!(
        event = "region_created",
        owner,
        start,
        reserved_bytes = reserved,
        "Region created"
    );
}

/// Log a bulk owner release
pub fn log_release(owner: u32, regions: usize, bytes: usize, used: usize) {
    info!(
        event = "owner_release",
        owner,
        regions,
        reclaimed_bytes = bytes,
        handed_out_bytes = used,
        "Owner released"
    );
}

/// Log linear memory growth
pub fn log_growth(previous_pages: usize, added_pages: usize, page_size: usize) {
    debug!(
        event = "memory_growth",
        previous_pages,
        added_pages,
        total_bytes = (previous_pages + added_pages) * page_size,
        "Linear memory grown"
    );
}

/// Log an allocation that could not be satisfied
pub fn log_out_of_memory(owner: u32, size: usize, address_space: usize) {
    warn!(
        event = "out_of_memory",
        owner,
        requested_bytes = size,
        address_space_bytes = address_space,
        "Allocation failed: linear memory exhausted"
    );
}

/// Log a detected registry corruption
pub fn log_invariant_violation(detail: &str) {
    error!(
        event = "invariant_violation",
        detail,
        "Allocator invariant violated"
    );
}

/// Log a LIFO scope transition
#[inline]
pub fn log_scope(event: &'static str, depth: usize, mark: usize) {
    trace!(event, depth, mark, "Scope transition");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(config.log_path.is_none());

        let debug_config = LogConfig::debug();
        assert_eq!(debug_config.level, Level::TRACE);
        assert!(debug_config.show_spans);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_init_idempotent() {
        init_with_config(LogConfig::default());
        init_with_config(LogConfig::debug()); // Should not panic
        assert!(is_initialized());
    }
}
