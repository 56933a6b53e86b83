// crates/observability/src/lib.rs
//! Tracing setup for the rcview binary.
//!
//! The terminal belongs to the front end, so events go to a daily rolling
//! file instead of stderr. `RUST_LOG` overrides the configured filter.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "warn,rcview=info";
const LOG_FILE_PREFIX: &str = "rcview.log";

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory of the rolling log files; the user cache dir when `None`.
    pub dir: Option<PathBuf>,
    /// Filter directives used when `RUST_LOG` is unset.
    pub filter: String,
    /// Write JSON lines instead of the compact text format.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: None,
            filter: DEFAULT_FILTER.to_string(),
            json: false,
        }
    }
}

impl LogConfig {
    pub fn log_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_log_dir)
    }
}

/// `<cache dir>/rcview/logs`, or `./logs` when the platform has no cache dir.
pub fn default_log_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("rcview").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

fn filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter))
}

/// Install the global subscriber. Keep the guard alive for the life of the
/// process; dropping it flushes and stops the writer thread.
pub fn init_tracing(config: &LogConfig) -> Result<WorkerGuard> {
    let dir = config.log_dir();
    ensure_dir(&dir)?;

    let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let registry = tracing_subscriber::registry().with(filter(config));
    let result = if config.json {
        registry
            .with(fmt::layer().json().with_writer(writer).with_ansi(false))
            .try_init()
    } else {
        registry
            .with(fmt::layer().compact().with_writer(writer).with_ansi(false))
            .try_init()
    };
    result.context("installing tracing subscriber")?;

    tracing::info!(dir = %dir.display(), "logging initialised");
    Ok(guard)
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating log directory {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.filter, "warn,rcview=info");
        assert!(config.log_dir().ends_with("logs"));
    }

    #[test]
    fn test_explicit_dir_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let config = LogConfig {
            dir: Some(tmp.path().join("nested")),
            ..Default::default()
        };
        assert_eq!(config.log_dir(), tmp.path().join("nested"));
        ensure_dir(&config.log_dir()).unwrap();
        assert!(tmp.path().join("nested").is_dir());
    }
}
