//! Tracing bootstrap for hosts embedding the reading engine.
//!
//! `init` installs a registry with two sinks: a non-blocking rolling file under the engine's data
//! directory and stderr. Records emitted through the `log` facade are bridged into `tracing`.
//! Only the first call configures anything; later calls hand back the same handle.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use anyhow::{Context, Result, anyhow};
use tracing_appender::rolling::Rotation;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, util::SubscriberInitExt};

const FILTER_ENV_VARS: [&str; 2] = ["READER_ENGINE_LOG", "RUST_LOG"];

static HANDLE: OnceLock<LogHandle> = OnceLock::new();

pub use tracing_subscriber::filter::LevelFilter as LogLevel;

/// Settings for the log sinks.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub directory: PathBuf,
    pub file_prefix: String,
    /// Number of rolled files kept; `None` keeps everything.
    pub retention: Option<usize>,
    pub file_level: LevelFilter,
    pub console_level: LevelFilter,
    /// Explicit filter directive; falls back to the environment, then to a build-based default.
    pub env_filter: Option<String>,
    pub rotation: Rotation,
}

impl Default for LogConfig {
    fn default() -> Self {
        let directory = crate::config::data_dir()
            .map(|dir| dir.join("logs"))
            .unwrap_or_else(|_| std::env::temp_dir().join("reader-engine-logs"));
        Self {
            directory,
            file_prefix: "reader-engine".to_string(),
            retention: Some(7),
            file_level: LevelFilter::DEBUG,
            console_level: if cfg!(debug_assertions) { LevelFilter::INFO } else { LevelFilter::WARN },
            env_filter: None,
            rotation: Rotation::DAILY,
        }
    }
}

impl LogConfig {
    pub fn with_directory<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.directory = path.into();
        self
    }

    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    fn directive(&self) -> String {
        self.env_filter
            .clone()
            .or_else(|| FILTER_ENV_VARS.iter().find_map(|var| std::env::var(var).ok()))
            .filter(|directive| !directive.trim().is_empty())
            .unwrap_or_else(|| if cfg!(debug_assertions) { "debug" } else { "info" }.to_string())
    }
}

/// Keeps the background file writer alive for the lifetime of the process.
#[derive(Debug)]
pub struct LogHandle {
    _guard: tracing_appender::non_blocking::WorkerGuard,
    directory: PathBuf,
}

impl LogHandle {
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

/// Install the global subscriber. Idempotent.
pub fn init(config: LogConfig) -> Result<&'static LogHandle> {
    if let Some(handle) = HANDLE.get() {
        return Ok(handle);
    }
    let handle = install(config)?;
    let _ = HANDLE.set(handle);
    HANDLE.get().ok_or_else(|| anyhow!("log handle missing after initialisation"))
}

fn install(config: LogConfig) -> Result<LogHandle> {
    let widest = config.file_level.max(config.console_level);
    let _ = tracing_log::LogTracer::builder().with_max_level(to_log_level(widest)).init();

    fs::create_dir_all(&config.directory)
        .with_context(|| format!("creating log directory {}", config.directory.display()))?;
    if let Some(keep) = config.retention.filter(|keep| *keep > 0) {
        prune(&config.directory, &config.file_prefix, keep).context("pruning old log files")?;
    }

    let appender = tracing_appender::rolling::Builder::new()
        .rotation(config.rotation.clone())
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .build(&config.directory)
        .context("creating rolling log appender")?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_new(config.directive()).context("parsing log filter directive")?;
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_target(true)
        .with_filter(config.file_level);
    let console_layer =
        tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_filter(config.console_level);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(LogHandle { _guard: guard, directory: config.directory })
}

fn to_log_level(level: LevelFilter) -> log::LevelFilter {
    match level {
        LevelFilter::OFF => log::LevelFilter::Off,
        LevelFilter::ERROR => log::LevelFilter::Error,
        LevelFilter::WARN => log::LevelFilter::Warn,
        LevelFilter::INFO => log::LevelFilter::Info,
        LevelFilter::DEBUG => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn prune(dir: &Path, prefix: &str, keep: usize) -> Result<()> {
    let mut files: Vec<(PathBuf, SystemTime)> = fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            let path = entry.path();
            let ours = path.file_name().and_then(OsStr::to_str).is_some_and(|name| name.starts_with(prefix));
            (meta.is_file() && ours).then(|| (path, meta.modified().unwrap_or(SystemTime::UNIX_EPOCH)))
        })
        .collect();

    if files.len() <= keep {
        return Ok(());
    }
    files.sort_by_key(|(_, modified)| *modified);
    let excess = files.len() - keep;
    for (path, _) in files.into_iter().take(excess) {
        let _ = fs::remove_file(path);
    }
    Ok(())
}
