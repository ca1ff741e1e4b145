//! Tracing setup for the binary.
//!
//! Events go to `zkparams.log` in the XDG state directory when it can be
//! opened for append; the CLI falls back to [`init_logging_stderr`] otherwise.
//! `RUST_LOG` overrides [`DEFAULT_FILTER`].

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info,zkparams_core=debug,zkparams=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Shared append handle; every event borrows it, so no per-event `dup`.
struct LogFile(File);

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = &'a File;

    fn make_writer(&'a self) -> Self::Writer {
        &self.0
    }
}

fn install(writer: BoxMakeWriter) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .init();
}

/// `~/.local/state/zkparams/zkparams.log`; the directory is created on demand.
pub fn log_path() -> Result<PathBuf> {
    xdg::BaseDirectories::with_prefix("zkparams")?
        .place_state_file("zkparams.log")
        .context("create log directory")
}

/// Log to [`log_path`]. Errors leave no subscriber installed.
pub fn init_logging() -> Result<()> {
    let path = log_path()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;
    install(BoxMakeWriter::new(LogFile(file)));
    tracing::info!(path = %path.display(), "logging to file");
    Ok(())
}

pub fn init_logging_stderr() {
    install(BoxMakeWriter::new(std::io::stderr));
}
