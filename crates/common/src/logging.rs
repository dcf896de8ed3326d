use std::io::IsTerminal;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
};

use crate::settings::Logger;

const LOG_FILE_PREFIX: &str = "attendance.log";

/// Installs the global subscriber: stdout plus a daily rolling file under
/// `logger.directory`. `RUST_LOG` takes precedence over `logger.level`.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process.
pub fn init_logging(logger: &Logger) -> Result<WorkerGuard, TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logger.level));

    let file_appender = tracing_appender::rolling::daily(&logger.directory, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(std::io::stdout().is_terminal()),
        )
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()?;

    Ok(guard)
}
