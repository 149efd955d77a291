use std::fs::{create_dir_all, File};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use chrono::Local;
use tracing_subscriber::{filter::LevelFilter, fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global subscriber. The configured level is the global
/// default; `RUST_LOG` directives override it.
///
/// With `quiet` set and no log file, output is discarded; the terminal
/// display owns the screen.
pub fn setup_logging(cfg: &LoggingConfig, quiet: bool) -> anyhow::Result<()> {
    let level = cfg
        .level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = env_filter(level, rust_log.as_deref());

    let installed = if cfg.save_logs {
        let path = log_file_path(cfg);
        if let Some(dir) = Path::new(&path).parent() {
            create_dir_all(dir)
                .with_context(|| format!("could not create log directory {}", dir.display()))?;
        }
        let file = File::create(&path).with_context(|| format!("could not create log file {path}"))?;

        fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
    } else if quiet {
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::sink)
            .try_init()
    } else {
        fmt().with_env_filter(env_filter).try_init()
    };

    installed.map_err(|e| anyhow::anyhow!("logging already initialised: {e}"))
}

/// `RUST_LOG` directives, plus the configured level as the global
/// default unless `RUST_LOG` sets one itself.
fn env_filter(level: tracing::Level, rust_log: Option<&str>) -> EnvFilter {
    let rust_log = rust_log.unwrap_or_default().trim();
    let sets_global = rust_log
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .any(|d| d.parse::<LevelFilter>().is_ok());

    let filter = EnvFilter::builder().parse_lossy(rust_log);
    if sets_global {
        filter
    } else {
        filter.add_directive(LevelFilter::from_level(level).into())
    }
}

/// Either the configured path, or the path with a start-time suffix so
/// earlier runs are kept.
fn log_file_path(cfg: &LoggingConfig) -> String {
    if cfg.rewrite_last_logs {
        cfg.log_file_path.clone()
    } else {
        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        format!(
            "{}-{}.log",
            cfg.log_file_path.trim_end_matches(".log"),
            timestamp
        )
    }
}
