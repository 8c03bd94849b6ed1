//! Logging to stderr and to a per-session file.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::ServerConfig;

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the default `info` filter. The returned guard flushes
/// the file writer on drop and must live as long as the server.
pub fn init(config: &ServerConfig) -> Result<WorkerGuard> {
    let session_id = config.session_id.clone().unwrap_or_else(default_session_id);
    let base = config.log_dir.clone().unwrap_or_else(default_log_dir);
    let session_log_dir = base.join(&session_id);
    std::fs::create_dir_all(&session_log_dir).with_context(|| {
        format!("Failed to create log directory {}", session_log_dir.display())
    })?;

    let file_appender = tracing_appender::rolling::never(&session_log_dir, "server.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(session = %session_id, "logging initialized");
    tracing::info!("log file: {}", log_file(&session_log_dir).display());

    Ok(guard)
}

fn log_file(dir: &Path) -> PathBuf {
    dir.join("server.log")
}

fn default_session_id() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("session_{timestamp}")
}

/// Platform cache directory, falling back to the system temp dir.
fn default_log_dir() -> PathBuf {
    ProjectDirs::from("", "", "battle-server")
        .map(|dirs| dirs.cache_dir().join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("battle-server").join("logs"))
}
