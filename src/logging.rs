use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Builds the default filter: `RUST_LOG` when set, otherwise the configured level
/// for this crate and `warn` for dependencies.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,cafebot={}", level.to_lowercase())))
}

/// Initializes the global subscriber.
///
/// Console output is always enabled. When a log directory is configured, a daily
/// rolling file is written through a non-blocking writer; the returned guard
/// flushes it and must be kept alive until shutdown.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let console = if config.json {
        fmt::layer()
            .with_target(false)
            .json()
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .compact()
            .boxed()
    };

    let (file_layer, guard) = match config.file.as_deref() {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::RollingFileAppender::new(
                tracing_appender::rolling::Rotation::DAILY,
                dir,
                "cafebot",
            );
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                // Disable ANSI colors for cleaner log files
                .with_ansi(false)
                .with_line_number(true)
                .with_file(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_target(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(console)
        .with(file_layer)
        .init();

    guard
}
