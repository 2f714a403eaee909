//! Utilities for logging.

use tracing::Level;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Output format for emitted logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    HumanReadable,
    Json,
}

/// Configure the global tracing subscriber.
///
/// `level` is the default maximum level; directives in `RUST_LOG` take
/// precedence when set. Panics if a global subscriber was already installed,
/// so binaries should call this exactly once at startup.
pub fn configure_global_logger<W>(level: Level, format: LogFormat, writer: W)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    try_configure_global_logger(level, format, writer).expect("no global subscriber set")
}

/// Like [`configure_global_logger`], but returns an error instead of
/// panicking when a subscriber is already installed.
///
/// Intended for tests, where multiple test functions may race to install the
/// subscriber and the loser just ignores the result.
pub fn try_configure_global_logger<W>(
    level: Level,
    format: LogFormat,
    writer: W,
) -> Result<(), SetGlobalDefaultError>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);

    match format {
        LogFormat::HumanReadable => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    }
}
