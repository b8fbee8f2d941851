//! Tracing setup for the gateway binary.
//!
//! `RUST_LOG` wins over the configured level when it is set. Chatty
//! dependencies are capped at `warn` unless `RUST_LOG` says otherwise.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::{GatewayError, Result};

/// Dependencies whose debug output drowns the gateway's own events.
const QUIET_TARGETS: &[&str] = &["sqlx", "rustls", "async_imap", "hyper"];

/// Install the global subscriber.
///
/// Events go to stdout, and are also appended to `config.file` when it is set.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let file = open_log_file(&config.file)?;
    let ansi = file.is_none();
    let writer = match file {
        Some(file) => BoxMakeWriter::new(std::io::stdout.and(Arc::new(file))),
        None => BoxMakeWriter::new(std::io::stdout),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(true),
        )
        .with(build_filter(&config.level, std::env::var("RUST_LOG").ok()))
        .try_init()
        .map_err(|e| GatewayError::Config(format!("logging already initialized: {e}")))
}

/// Open `path` for appending, creating parent directories. Empty means no file.
fn open_log_file(path: &str) -> Result<Option<File>> {
    if path.is_empty() {
        return Ok(None);
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    Ok(Some(OpenOptions::new().create(true).append(true).open(path)?))
}

fn build_filter(level: &str, env: Option<String>) -> EnvFilter {
    if let Some(filter) = env.and_then(|directives| EnvFilter::try_new(directives).ok()) {
        return filter;
    }

    let level = match level.trim().to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        l @ ("trace" | "debug" | "info" | "warn" | "error") => l.to_string(),
        _ => "info".to_string(),
    };

    let mut directives = vec![level];
    directives.extend(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")));
    EnvFilter::new(directives.join(","))
}
