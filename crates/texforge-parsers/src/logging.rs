//! Logging and tracing utilities for texforge
//!
//! Structured logging through the `tracing` crate. Binaries call
//! [`init_with_config`] once at startup; libraries only emit events.

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether tracing has been initialized
static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize the default tracing subscriber
///
/// Multiple calls are safe and will be ignored.
pub fn init_default() {
    init_with_config(TracingConfig::default());
}

/// Initialize tracing with a custom configuration
pub fn init_with_config(config: TracingConfig) {
    if TRACING_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
        .is_ok()
    {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.show_target)
            .with_thread_ids(config.show_thread_ids)
            .with_file(config.show_file)
            .with_line_number(config.show_line_number);

        // a subscriber installed by an embedding application wins
        let _ = tracing_subscriber::registry()
            .with(fmt_layer)
            .with(filter)
            .try_init();
    }
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Default log level filter (e.g., "info", "debug", "warn")
    pub default_level: String,
    /// Show the target (module path) in log output
    pub show_target: bool,
    /// Show thread IDs in log output
    pub show_thread_ids: bool,
    /// Show source file in log output
    pub show_file: bool,
    /// Show line number in log output
    pub show_line_number: bool,
}

impl TracingConfig {
    /// Map a `-v` count onto a level and detail settings
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        Self {
            default_level: level.to_string(),
            show_target: verbosity >= 2,
            show_thread_ids: verbosity >= 3,
            show_file: verbosity >= 3,
            show_line_number: verbosity >= 3,
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: "warn,texforge=info".to_string(),
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
        }
    }
}

/// Instrument a parsing operation with timing
pub fn instrument_parse<T, F>(name: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let span = tracing::debug_span!("parse", parser = %name);
    let _guard = span.enter();

    let start = std::time::Instant::now();
    let result = f();
    let duration = start.elapsed();

    tracing::trace!(duration_us = %duration.as_micros(), "Parse operation complete");

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_config_default() {
        let config = TracingConfig::default();
        assert!(config.default_level.contains("info"));
        assert!(config.show_target);
        assert!(!config.show_thread_ids);
    }

    #[test]
    fn test_from_verbosity() {
        assert_eq!(TracingConfig::from_verbosity(0).default_level, "warn");
        assert_eq!(TracingConfig::from_verbosity(2).default_level, "debug");
        let loud = TracingConfig::from_verbosity(7);
        assert_eq!(loud.default_level, "trace");
        assert!(loud.show_line_number);
    }

    #[test]
    fn test_instrument_parse() {
        let result = instrument_parse("test", || 42);
        assert_eq!(result, 42);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_default();
        init_default();
    }
}
