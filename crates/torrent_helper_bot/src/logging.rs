use std::path::Path;

use torrent_helper::error::Error;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    fmt::{self, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log to stdout and to `log_file`. `RUST_LOG` overrides `level`.
///
/// Logs are written to the file by a background thread, the returned guard
/// flushes it when dropped and must be kept alive until exit.
pub fn init(log_file: &Path, level: &str) -> Result<WorkerGuard, Error> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| Error::Logging(format!("invalid log level `{level}`: {e}")))?;

    let name = log_file
        .file_name()
        .ok_or_else(|| {
            Error::Logging(format!("`{}` is not a file", log_file.display()))
        })?
        .to_string_lossy()
        .into_owned();

    let dir = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
        .map_err(|e| Error::Logging(e.to_string()))?;

    let (writer, guard) = tracing_appender::non_blocking(appender);

    let stdout = fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_target(false);

    let file = fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout)
        .with(file)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    Ok(guard)
}
