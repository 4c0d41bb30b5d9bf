//! Shared observability helpers for binaries and integration tests.
//!
//! The logging initializer centralises our `tracing` setup: a colorised
//! console sink at debug level, plus optional rolling file sinks for
//! error-only and full runtime output. Call [`init_logging`] once near
//! process start and reuse its defaults; additional callers are treated
//! as no-ops and simply receive the originally resolved log location.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

static LOG_GUARDS: OnceLock<Vec<WorkerGuard>> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Configuration passed to [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Logical name of the component (used for defaults and file names).
    pub app_name: &'static str,
    /// Optional explicit directory for log output. If `None`, we consult
    /// `CHALLENGER_LOG_DIR` and finally fall back to
    /// `~/.local/share/<app_name>`.
    pub log_dir: Option<PathBuf>,
    /// Keep a rolling error-level file sink.
    pub error_sink: bool,
    /// Keep a rolling debug-level runtime file sink.
    pub runtime_sink: bool,
    /// Default filter applied when `RUST_LOG` is unset.
    pub default_filter: &'static str,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "challenger",
            log_dir: None,
            error_sink: true,
            runtime_sink: true,
            default_filter: "debug",
        }
    }
}

/// Initialise the global `tracing` subscriber.
///
/// The console sink is always installed; the file sinks follow the config.
/// Returns the runtime log path for the current day (or the resolved log
/// directory when the runtime sink is disabled). Subsequent calls are
/// cheap and simply hand back the originally resolved location.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    let resolved_dir = resolve_log_dir(config.app_name, config.log_dir.as_deref());
    std::fs::create_dir_all(&resolved_dir)
        .with_context(|| format!("failed to create log directory: {}", resolved_dir.display()))?;

    let mut guards = Vec::new();

    let error_layer = config.error_sink.then(|| {
        let appender = rolling::daily(&resolved_dir, format!("{}-error.log", config.app_name));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        guards.push(guard);
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(LevelFilter::ERROR)
    });

    let runtime_layer = config.runtime_sink.then(|| {
        let appender = rolling::daily(&resolved_dir, format!("{}-runtime.log", config.app_name));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        guards.push(guard);
        fmt::layer().with_writer(writer).with_ansi(false)
    });

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_ansi(true))
        .with(error_layer)
        .with(runtime_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let _ = LOG_GUARDS.set(guards);

    let today = Local::now().format("%Y-%m-%d").to_string();
    let resolved = if config.runtime_sink {
        resolved_dir.join(format!("{}-runtime.log.{}", config.app_name, today))
    } else {
        resolved_dir
    };
    let _ = LOG_PATH.set(resolved.clone());
    Ok(resolved)
}

fn resolve_log_dir(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return expand_home(dir);
    }

    if let Ok(env_dir) = std::env::var("CHALLENGER_LOG_DIR") {
        return expand_home(Path::new(&env_dir));
    }

    default_data_dir(app_name)
}

fn expand_home(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/")) {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

fn default_data_dir(app_name: &str) -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(app_name)
    } else {
        PathBuf::from(".").join(app_name)
    }
}
