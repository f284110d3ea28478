//! Structured logging setup for peelkit
//!
//! Logs always go to stderr: stdout is reserved for generated scripts and
//! JSON detection output.
//!
//! # Example
//!
//! ```no_run
//! use peelkit::util::logging;
//!
//! // Reads PEELKIT_LOG_LEVEL and PEELKIT_LOG_FORMAT
//! logging::init_from_env();
//!
//! tracing::info!(platform = "nodejs", version = "18.17.1", "Resolved version");
//! ```

use std::env;
use std::io;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for peelkit's own targets
    pub level: Level,

    /// Emit one JSON object per event
    pub use_json: bool,

    /// Include the module target (e.g. peelkit::detector) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,

    pub include_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            use_json: false,
            include_target: false,
            include_location: false,
            include_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// JSON output with full metadata, for build pipelines that collect logs.
    pub fn pipeline() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_target: true,
            include_location: true,
            include_thread_ids: false,
        }
    }
}

/// Parses a log level, case-insensitive. Unknown values fall back to WARN.
///
/// ```
/// use peelkit::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("bogus"), Level::WARN);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    try_parse_level(level_str).unwrap_or_else(|| {
        eprintln!(
            "Invalid log level '{}', defaulting to WARN. Valid levels: trace, debug, info, warn, error",
            level_str
        );
        Level::WARN
    })
}

/// Strict variant of [`parse_level`] used by configuration validation.
pub fn try_parse_level(level_str: &str) -> Option<Level> {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn build_filter(level: Level) -> EnvFilter {
    // RUST_LOG wins when set; otherwise only peelkit's targets are shown.
    if env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::new(format!("warn,peelkit={}", level))
}

/// Installs the global subscriber. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(config.level);

        let layer = fmt::layer()
            .with_writer(io::stderr)
            .with_target(config.include_target)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_thread_ids(config.include_thread_ids);

        let registry = tracing_subscriber::registry().with(filter);
        let result = if config.use_json {
            registry.with(layer.json()).try_init()
        } else {
            registry.with(layer).try_init()
        };

        if let Err(e) = result {
            eprintln!("Failed to initialise logging: {}", e);
        }
    });
}

pub fn init_default() {
    init_logging(LoggingConfig::default());
}

/// Reads `PEELKIT_LOG_LEVEL` and `PEELKIT_LOG_FORMAT` (`json` or `text`).
pub fn init_from_env() {
    init_logging(config_from_env());
}

pub fn config_from_env() -> LoggingConfig {
    let level = env::var("PEELKIT_LOG_LEVEL")
        .map(|v| parse_level(&v))
        .unwrap_or(Level::WARN);

    let use_json = env::var("PEELKIT_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    LoggingConfig {
        level,
        use_json,
        include_target: use_json,
        ..Default::default()
    }
}
