//! Logging setup
//!
//! Stdout carries command output (`analyze --json` must stay parseable) and
//! the TUI owns the terminal, so logs go to stderr or to a file.

use std::env;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Level used when RUST_LOG is unset
pub const DEFAULT_LEVEL: &str = "warn,workout_optimizer=info";

/// Where log lines are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Appended to; nothing is logged if the file cannot be opened
    File(PathBuf),
}

/// Filter from RUST_LOG (or `DEFAULT_LEVEL`) with HTTP client noise capped
pub fn env_filter(rust_log: Option<&str>) -> EnvFilter {
    EnvFilter::new(rust_log.unwrap_or(DEFAULT_LEVEL))
        .add_directive(
            "hyper=warn"
                .parse()
                .unwrap_or_else(|_| tracing::Level::WARN.into()),
        )
        .add_directive(
            "reqwest=warn"
                .parse()
                .unwrap_or_else(|_| tracing::Level::WARN.into()),
        )
}

/// Install the global subscriber
pub fn init(target: &LogTarget) -> Result<()> {
    let rust_log = env::var("RUST_LOG").ok();
    let registry = tracing_subscriber::registry().with(env_filter(rust_log.as_deref()));

    match target {
        LogTarget::Stderr => registry.with(fmt::layer().with_writer(io::stderr)).try_init()?,
        LogTarget::File(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => registry
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .try_init()?,
            Err(_) => registry.with(fmt::layer().with_writer(io::sink)).try_init()?,
        },
    }
    Ok(())
}
