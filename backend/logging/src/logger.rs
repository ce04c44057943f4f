//! Structured Logger
//!
//! Wraps `tracing` to provide console output, an optional daily-rolling
//! NDJSON file, and environment-based level control.

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
    /// Directory for `medsnap.log.YYYY-MM-DD`; no file logging when `None`.
    pub dir: Option<PathBuf>,
    /// Emit JSON on the console instead of human-readable lines.
    pub json: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            json: false,
        }
    }
}

/// Initialize the global structured logger.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logger(options: &LogOptions) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&options.level));

    let file_layer = options.dir.as_ref().map(|dir| {
        let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "medsnap.log");
        fmt::layer()
            .json()
            .with_writer(file_appender)
            .with_ansi(false)
    });

    let json_console = options
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stdout));

    let plain_console = (!options.json).then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
            .with_ansi(true)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_console)
        .with(plain_console)
        .with(file_layer)
        .try_init();
}
