//! Structured logging.
//!
//! `start` writes to `<data_dir>/logs/server.log` through a non-blocking
//! appender; one-shot commands write to stderr. Environment:
//!
//! - `CLAUDE_FOCUS_LOG_FILTER` (falls back to `RUST_LOG`)
//! - `CLAUDE_FOCUS_LOG_FORMAT`: `json` (default) or `pretty`
//! - `CLAUDE_FOCUS_TRUNCATE_LOG_ON_START=1`
//! - `CLAUDE_FOCUS_RUN_ID`: tag for this process, generated when unset

use std::fs::OpenOptions;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "server.log";
const DEFAULT_FILTER: &str = "info,tower_http=warn,hyper=warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn from_env() -> Self {
        match std::env::var("CLAUDE_FOCUS_LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("pretty") => Self::Pretty,
            _ => Self::Json,
        }
    }
}

/// Keep alive for the lifetime of the server; dropping it flushes the file.
pub struct LoggingHandle {
    pub run_id: String,
    pub guard: WorkerGuard,
}

fn filter_directive() -> String {
    std::env::var("CLAUDE_FOCUS_LOG_FILTER")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| DEFAULT_FILTER.to_string())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_new(filter_directive()).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn run_id() -> String {
    std::env::var("CLAUDE_FOCUS_RUN_ID").unwrap_or_else(|_| {
        let started = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        format!("pid-{}-{started}", std::process::id())
    })
}

pub fn init_logging(log_dir: &Path) -> anyhow::Result<LoggingHandle> {
    std::fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(LOG_FILE);

    if std::env::var("CLAUDE_FOCUS_TRUNCATE_LOG_ON_START").is_ok_and(|v| v == "1") {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&log_path)?;
    }

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, LOG_FILE));
    let format = LogFormat::from_env();
    install_file_subscriber(writer, format);

    let run_id = run_id();
    tracing::info!(
        component = "logging",
        event = "logging.initialized",
        run_id = %run_id,
        log_path = %log_path.display(),
        format = ?format,
        filter = %filter_directive(),
    );

    Ok(LoggingHandle { run_id, guard })
}

fn install_file_subscriber(writer: NonBlocking, format: LogFormat) {
    let base = tracing_subscriber::registry().with(env_filter());
    match format {
        LogFormat::Json => base
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(writer),
            )
            .init(),
        LogFormat::Pretty => base
            .with(
                fmt::layer()
                    .pretty()
                    .with_ansi(false)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(writer),
            )
            .init(),
    }
}

/// stderr logging for one-shot CLI commands.
pub fn init_cli_logging() {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
