//! Trellis Logging
//!
//! Small, environment-controlled logger used while the route tree is being
//! declared. The route builder announces every registration through it when
//! debug mode is on, so the whole route space can be read off the startup log.
//!
//! # Usage
//!
//! ```rust
//! use trellis_log::{debug, info};
//!
//! info!("Declaring routes");
//! debug!(target: "trellis::router", "Entering group {}", "/api");
//! trellis_log::announce_route("GET", "/api/users");
//! ```
//!
//! # Environment Variables
//!
//! - `TRELLIS_DEBUG=1|true` - Enable debug logging
//! - `TRELLIS_LOG_LEVEL=trace|debug|info|warn|error|off` - Minimum level
//! - `TRELLIS_LOG_FORMAT=pretty|json|compact` - Output format
//! - `TRELLIS_LOG_TIMESTAMPS=1|0` - Include timestamps
//!
//! Route announcements are not log records: [`announce_route`] writes the bare
//! `Route : VERB\tpath` line to stdout regardless of level, format or the
//! `tracing` bridge.

use once_cell::sync::Lazy;
use std::env;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

// ============================================================================
// Levels and formats
// ============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    /// Nothing is written.
    Off = 5,
}

impl Level {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Off,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Timestamp, level, target and message on one line
    Pretty,
    /// Abbreviated level and short timestamp
    Compact,
    /// One JSON object per line
    Json,
}

impl Format {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Global state
// ============================================================================

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Logger configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub debug: bool,
    pub level: Level,
    pub format: Format,
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Pretty,
            timestamps: true,
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl LogConfig {
    /// Build the configuration from `TRELLIS_*` variables and publish the
    /// debug flag and level to the global atomics.
    pub fn from_env() -> Self {
        let debug = env_flag("TRELLIS_DEBUG").unwrap_or(false);

        let level = env::var("TRELLIS_LOG_LEVEL")
            .ok()
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = env::var("TRELLIS_LOG_FORMAT")
            .ok()
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Pretty);

        let timestamps = env_flag("TRELLIS_LOG_TIMESTAMPS").unwrap_or(true);

        DEBUG_ENABLED.store(debug, Ordering::SeqCst);
        LOG_LEVEL.store(level as u8, Ordering::SeqCst);

        Self {
            debug,
            level,
            format,
            timestamps,
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Force the lazy environment read.
pub fn init() {
    Lazy::force(&CONFIG);
}

// Every read of the atomics goes through here so the environment is applied
// before the first check, not after it.
#[inline]
fn loaded() {
    Lazy::force(&CONFIG);
}

#[inline]
pub fn is_debug_enabled() -> bool {
    loaded();
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    loaded();
    level != Level::Off && level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

pub fn current_level() -> Level {
    loaded();
    Level::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn set_level(level: Level) {
    loaded();
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Toggle debug mode. Turning it on also lowers the level to `Debug`.
pub fn set_debug(enabled: bool) {
    loaded();
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        set_level(Level::Debug);
    }
}

pub fn config() -> &'static LogConfig {
    &CONFIG
}

/// Render the announcement line for a registered route.
///
/// The method and path are separated by a single tab.
pub fn route_line(method: &str, path: &str) -> String {
    format!("Route : {}\t{}", method, path)
}

/// Write `line` followed by a newline and nothing else.
pub fn write_route_line<W: Write>(out: &mut W, line: &str) -> io::Result<()> {
    writeln!(out, "{}", line)
}

/// Print the announcement line for a registered route to stdout.
pub fn announce_route(method: &str, path: &str) {
    let _ = write_route_line(&mut io::stdout().lock(), &route_line(method, path));
}

// ============================================================================
// Output
// ============================================================================

#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    if !is_level_enabled(level) {
        return;
    }

    let config = config();

    #[cfg(feature = "tracing")]
    tracing_compat::forward(level, target, message);

    match config.format {
        Format::Pretty => write_pretty(level, target, message, config),
        Format::Compact => write_compact(level, target, message, config),
        Format::Json => write_json(level, target, message),
    }
}

fn write_pretty(level: Level, target: &str, message: &str, config: &LogConfig) {
    let mut stderr = std::io::stderr().lock();

    if config.timestamps {
        let now = chrono::Local::now();
        let _ = write!(stderr, "{} ", now.format("%Y-%m-%d %H:%M:%S%.3f"));
    }
    let _ = write!(stderr, "{:5} ", level.as_str());
    if !target.is_empty() {
        let _ = write!(stderr, "[{}] ", target);
    }
    let _ = writeln!(stderr, "{}", message);
}

fn write_compact(level: Level, target: &str, message: &str, config: &LogConfig) {
    let mut stderr = std::io::stderr().lock();

    if config.timestamps {
        let now = chrono::Local::now();
        let _ = write!(stderr, "{} ", now.format("%H:%M:%S"));
    }
    let _ = write!(stderr, "{} ", level.as_str().chars().next().unwrap_or('?'));
    if !target.is_empty() {
        let _ = write!(stderr, "{}: ", target);
    }
    let _ = writeln!(stderr, "{}", message);
}

#[cfg(feature = "json")]
fn write_json(level: Level, target: &str, message: &str) {
    use serde::Serialize;

    #[derive(Serialize)]
    struct Record<'a> {
        timestamp: String,
        level: &'a str,
        target: &'a str,
        message: &'a str,
    }

    let record = Record {
        timestamp: chrono::Utc::now().to_rfc3339(),
        level: level.as_str(),
        target,
        message,
    };

    if let Ok(line) = serde_json::to_string(&record) {
        eprintln!("{}", line);
    }
}

// Without serde the message is written as a pretty line instead of
// hand-escaped JSON.
#[cfg(not(feature = "json"))]
fn write_json(level: Level, target: &str, message: &str) {
    write_pretty(level, target, message, config());
}

// ============================================================================
// Macros
// ============================================================================

#[macro_export]
macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Trace) {
            $crate::log($crate::Level::Trace, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Trace) {
            $crate::log($crate::Level::Trace, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log a debug message.
///
/// Written when `TRELLIS_DEBUG` is set or the level is `debug` or lower.
#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_debug_enabled() || $crate::is_level_enabled($crate::Level::Debug) {
            $crate::log($crate::Level::Debug, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_debug_enabled() || $crate::is_level_enabled($crate::Level::Debug) {
            $crate::log($crate::Level::Debug, module_path!(), &format!($($arg)+));
        }
    };
}

#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Info) {
            $crate::log($crate::Level::Info, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Info) {
            $crate::log($crate::Level::Info, module_path!(), &format!($($arg)+));
        }
    };
}

#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Warn) {
            $crate::log($crate::Level::Warn, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Warn) {
            $crate::log($crate::Level::Warn, module_path!(), &format!($($arg)+));
        }
    };
}

#[macro_export]
macro_rules! error {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Error) {
            $crate::log($crate::Level::Error, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Error) {
            $crate::log($crate::Level::Error, module_path!(), &format!($($arg)+));
        }
    };
}

// ============================================================================
// Tracing bridge
// ============================================================================

#[cfg(feature = "tracing")]
pub mod tracing_compat {
    //! Mirrors records into `tracing` and builds a subscriber whose filter
    //! follows `TRELLIS_LOG_LEVEL`.

    use super::*;

    pub(crate) fn forward(level: Level, target: &str, message: &str) {
        match level {
            Level::Trace => tracing::trace!(origin = target, "{}", message),
            Level::Debug => tracing::debug!(origin = target, "{}", message),
            Level::Info => tracing::info!(origin = target, "{}", message),
            Level::Warn => tracing::warn!(origin = target, "{}", message),
            Level::Error => tracing::error!(origin = target, "{}", message),
            Level::Off => {}
        }
    }

    pub fn subscriber() -> impl tracing::Subscriber {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{EnvFilter, fmt};

        let directive = config().level.as_str().to_lowercase();
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

        tracing_subscriber::registry().with(filter).with(fmt::layer())
    }
}
