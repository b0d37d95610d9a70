//! Logging bootstrap.
//!
//! One subscriber with two outputs: human-readable lines on stderr and a
//! daily rolling file under the logs directory. `RUST_LOG` overrides the
//! default filter.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_FILE_PREFIX: &str = "hearth.log";

/// Installs the global subscriber.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the file writer.
///
/// # Errors
///
/// Fails if the logs directory cannot be created or a global subscriber is
/// already installed.
pub fn init_logging(
    log_dir: &Path,
    default_filter: &str,
) -> Result<WorkerGuard, Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .try_init()?;

    tracing::debug!(log_dir = %log_dir.display(), "Logging initialised");
    Ok(guard)
}
