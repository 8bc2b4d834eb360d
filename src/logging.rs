//! Logging setup for the command-line tool.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the binary.

use anyhow::{Result, bail};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Off,
    Stdout,
    Stderr,
    File(PathBuf),
}

impl FromStr for LogTarget {
    type Err = anyhow::Error;

    /// `0`/`off`, `1`/`stdout`, `2`/`stderr`, or a filename.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" => bail!("empty log target"),
            "0" | "off" => Ok(LogTarget::Off),
            "1" | "stdout" => Ok(LogTarget::Stdout),
            "2" | "stderr" => Ok(LogTarget::Stderr),
            filename => Ok(LogTarget::File(PathBuf::from(filename))),
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the level implied by `verbose`.
pub fn init(target: &LogTarget, verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()))
    };

    match target {
        LogTarget::Off => {}
        LogTarget::Stdout => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogTarget::Stderr => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}
