use anyhow::Context;
use chrono::{DateTime, Utc};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::task;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_RETENTION_DAYS: i64 = 7;
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Keeps the non-blocking file writer alive; drop it and buffered log
/// lines are lost
#[allow(dead_code)]
pub struct LoggerGuard(WorkerGuard);

/// Initialize the tracing subscriber
///
/// Logs go to a daily-rolling file under `log_dir` and to stdout. The
/// configured level seeds the filter; `RUST_LOG` overrides it per module.
pub fn init_logging(
    log_dir: impl AsRef<Path>,
    prefix: &str,
    level: &str,
) -> anyhow::Result<LoggerGuard> {
    let log_dir = log_dir.as_ref().to_path_buf();

    let requested_level = level;
    let level = match level {
        "trace" | "debug" | "info" | "warn" | "error" => level,
        _ => "info",
    };

    let directive = level
        .parse()
        .context(format!("Failed to parse log level '{}'", level))?;
    let builder = EnvFilter::builder().with_default_directive(directive);

    let rust_log = std::env::var("RUST_LOG").unwrap_or_default();
    let file_filter = builder.clone().parse_lossy(&rust_log);
    let console_filter = builder.parse_lossy(&rust_log);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(&log_dir)
        .context("Failed to create file appender")?;
    let (non_blocking, guard) = NonBlocking::new(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(file_filter);
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .init();

    if requested_level != level {
        tracing::warn!(
            "Invalid log level '{}', defaulting to '{}'",
            requested_level,
            level
        );
    }

    start_log_cleanup_task(log_dir, prefix.to_string());

    Ok(LoggerGuard(guard))
}

fn start_log_cleanup_task(log_dir: PathBuf, prefix: String) {
    task::spawn(async move {
        loop {
            match cleanup_old_logs(&log_dir, &prefix, LOG_RETENTION_DAYS) {
                Ok(removed) if removed > 0 => {
                    tracing::info!("Removed {} old log file(s)", removed);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Log cleanup failed: {}", e);
                }
            }
            tokio::time::sleep(CLEANUP_INTERVAL).await;
        }
    });
}

fn cleanup_old_logs(log_dir: &Path, prefix: &str, retention_days: i64) -> std::io::Result<usize> {
    let cutoff = Utc::now() - chrono::Duration::days(retention_days);
    let mut removed = 0;

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
            if file_name.starts_with(prefix) && file_name.ends_with(".log") {
                let modified: DateTime<Utc> = entry.metadata()?.modified()?.into();
                if modified < cutoff {
                    fs::remove_file(&path)?;
                    tracing::info!("Old log file deleted: {}", file_name);
                    removed += 1;
                }
            }
        }
    }

    Ok(removed)
}
