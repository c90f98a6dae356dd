//! Structured logging setup using the `tracing` ecosystem.
//!
//! Console output goes to stderr so it never interleaves with the
//! orchestration tool's own stdout. A copy of every event is written to a
//! daily-rotated file for post-mortems of failed `up` runs.

use std::path::Path;

use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::{CsResult, StackError};

/// Name of the rotated log file inside the log directory.
pub const LOG_FILE_NAME: &str = "chatstack.log";

/// Guard that keeps the non-blocking log writer alive.
/// Drop this to flush and close the log file.
pub struct LogGuard {
    _worker: WorkerGuard,
}

/// Filter from a level name or directive, falling back to `info` on garbage.
fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Terse stderr layer: no timestamps or targets, the operator reads these live.
fn console_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact()
}

fn file_layer<S>(writer: NonBlocking, json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);
    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

/// Initialize the global tracing subscriber.
///
/// `level` accepts anything `EnvFilter` does ("debug", "cs_services=trace").
/// When `json_output` is set only the file copy is JSON.
pub fn init_logging(level: &str, log_dir: &Path, json_output: bool) -> CsResult<LogGuard> {
    std::fs::create_dir_all(log_dir)?;

    let (writer, worker) = tracing_appender::non_blocking(rolling::daily(log_dir, LOG_FILE_NAME));

    tracing_subscriber::registry()
        .with(filter_for(level))
        .with(console_layer())
        .with(file_layer(writer, json_output))
        .try_init()
        .map_err(|e| StackError::Internal(format!("logging already initialized: {e}")))?;

    tracing::debug!("logging to {} at level {level}", log_dir.display());
    Ok(LogGuard { _worker: worker })
}

/// Console-only logger, used when the log directory is unusable.
/// Does nothing if a subscriber is already installed.
pub fn init_console_logging(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(filter_for(level))
        .with(console_layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_filter_falls_back() {
        assert_eq!(filter_for("not a valid filter [").to_string(), "info");
    }

    #[test]
    fn test_console_logging_is_idempotent() {
        init_console_logging("debug");
        init_console_logging("warn");
    }
}
