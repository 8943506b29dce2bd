// src/logging.rs

use anyhow::{Context, Result};
use std::{fs, path::Path};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{self, RollingFileAppender},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Daily-rotating file appender: `{dir}/{file}.YYYY-MM-DD`.
pub fn file_appender(dir: &Path, file: &str) -> Result<RollingFileAppender> {
    fs::create_dir_all(dir).with_context(|| format!("creating log dir {}", dir.display()))?;
    Ok(rolling::daily(dir, file))
}

/// Console plus run-log file. `RUST_LOG` overrides `cfg.log_level`.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the file writer.
pub fn init(cfg: &Config) -> Result<WorkerGuard> {
    let appender = file_appender(&cfg.log_dir, &cfg.log_file)?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let env =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));
    tracing_subscriber::registry()
        .with(env)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(guard)
}
