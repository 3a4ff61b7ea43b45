//! tracing setup shared by the binaries

use std::fs::File;

use time::macros::format_description;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogConfig;
use crate::error::ConfigError;

/// Keeps the file writer's worker thread alive
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Install the global subscriber.
///
/// Call before spawning threads: the local UTC offset can't be read
/// reliably once the process is multi-threaded.
pub fn init(config: &LogConfig) -> Result<Option<LogGuard>, ConfigError> {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(
        offset,
        format_description!("[hour]:[minute]:[second].[subsecond digits:3]"),
    );

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .with_timer(timer.clone());

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let file = File::create(path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            let (non_blocking, worker_guard) = tracing_appender::non_blocking(file);

            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_timer(timer);

            (Some(layer), Some(LogGuard { _guard: worker_guard }))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ConfigError::Invalid(format!("logging already initialized: {}", e)))?;

    tracing::info!("[Log] Logging initialized at level: {}", config.level);
    if let Some(path) = &config.file {
        tracing::info!("[Log] Mirroring to {:?}", path);
    }

    Ok(guard)
}
