//! Tracing setup: a console layer filtered by `RUST_LOG` and an error log file
//! that admins can download with `/logs`.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::Config;

pub const DEFAULT_LOG_FILTER: &str = "dexbot=info,teloxide=warn";

/// Open the error log for appending, creating it when missing
pub fn open_error_log(path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open error log {}", path.display()))
}

/// Install the global subscriber
pub fn init_tracing(config: &Config) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console: Box<dyn Layer<Registry> + Send + Sync> = if config.json_logs {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };

    let error_log = open_error_log(&config.error_log_path)?;
    let error_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(error_log))
        .with_filter(LevelFilter::ERROR);

    tracing_subscriber::registry()
        .with(console.with_filter(env_filter))
        .with(error_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_error_log_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.log");

        writeln!(open_error_log(&path).unwrap(), "first").unwrap();
        writeln!(open_error_log(&path).unwrap(), "second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_error_log_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();

        assert!(open_error_log(dir.path().join("missing").join("errors.log")).is_err());
    }
}
