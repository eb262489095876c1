use std::path::Path;

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;

/// Initialize structured logging based on configuration
///
/// Supports both JSON (production) and pretty (development) formats
/// with configurable log levels and optional file output. When a file is
/// configured the returned guard must be held until shutdown so buffered
/// records are flushed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let log_level = parse_log_level(&config.level)?;

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = build_env_filter(rust_log.as_deref(), log_level);

    let registry = tracing_subscriber::registry().with(env_filter);

    let (writer, guard) = match &config.file {
        Some(file_path) => {
            let (writer, guard) = tracing_appender::non_blocking(open_log_file(file_path)?);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    if config.format.as_str() == "json" {
        let json_layer = fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_line_number(true)
            .with_file(true);

        match writer {
            Some(writer) => registry.with(json_layer.with_writer(writer)).try_init()?,
            None => registry.with(json_layer).try_init()?,
        }
    } else {
        let pretty_layer = fmt::layer()
            .pretty()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_line_number(true)
            .with_file(false);

        match writer {
            Some(writer) => registry
                .with(pretty_layer.with_ansi(false).with_writer(writer))
                .try_init()?,
            None => registry.with(pretty_layer).try_init()?,
        }
    }

    Ok(guard)
}

fn open_log_file(path: &str) -> anyhow::Result<std::fs::File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?)
}

/// RUST_LOG directives win over the configured level. An unparsable
/// RUST_LOG falls back to the configured level.
fn build_env_filter(rust_log: Option<&str>, level: Level) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| {
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(level).into())
                .parse_lossy("")
        })
}

/// Parse log level string to tracing Level
fn parse_log_level(level: &str) -> anyhow::Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(anyhow::anyhow!("Invalid log level: {level}")),
    }
}
