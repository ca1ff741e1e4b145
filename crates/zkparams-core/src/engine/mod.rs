//! Orchestrates fetch and verification across the whole manifest.
//!
//! Each entry moves `Pending -> (Fetching -> Verifying | VerifyingOnly) ->
//! Verified | Failed`. Per-entry failures never stop the run; they end up in
//! the [`RunReport`] and as a `Failed` event. Only an unsupported platform or
//! an unusable destination directory fails the run as a whole.

mod job;
mod pool;
mod report;

pub use report::{EntryOutcome, EntryReport, RunReport};

use crate::control::AbortToken;
use crate::error::ParamsError;
use crate::events::EventSink;
use crate::fetcher::Fetcher;
use crate::lock;
use crate::manifest::Manifest;
use crate::state::{self, DownloadState};
use job::{Context, Plan};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Top-level operations, as exposed by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Verify what exists, fetch what does not.
    Check,
    /// Fetch everything, overwriting leftovers.
    Fetch,
    /// Verify what exists, never touch the network.
    Verify,
    /// `Fetch` into a fresh destination directory, `Check` otherwise.
    Auto,
}

pub struct ParamsEngine {
    manifest: Arc<Manifest>,
    dest_dir: PathBuf,
    fetcher: Fetcher,
    sink: Arc<dyn EventSink>,
    abort: AbortToken,
    max_parallel: usize,
}

impl ParamsEngine {
    pub fn new(manifest: Manifest, dest_dir: impl Into<PathBuf>, sink: impl EventSink + 'static) -> Self {
        ParamsEngine {
            manifest: Arc::new(manifest),
            dest_dir: dest_dir.into(),
            fetcher: Fetcher::default(),
            sink: Arc::new(sink),
            abort: AbortToken::new(),
            max_parallel: 1,
        }
    }

    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Number of entries processed concurrently (at least 1).
    pub fn with_max_parallel(mut self, n: usize) -> Self {
        self.max_parallel = n.max(1);
        self
    }

    pub fn with_abort_token(mut self, abort: AbortToken) -> Self {
        self.abort = abort;
        self
    }

    /// Token that cancels runs of this engine.
    pub fn abort_token(&self) -> AbortToken {
        self.abort.clone()
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Verify present entries and fetch absent ones.
    pub fn check_all(&self) -> Result<RunReport, ParamsError> {
        self.run_plan(Plan::Check)
    }

    /// Fetch and verify every entry, regardless of what is on disk.
    pub fn fetch_all(&self) -> Result<RunReport, ParamsError> {
        self.run_plan(Plan::Fetch)
    }

    /// Verify every entry in place; absent entries fail with `Missing`.
    pub fn verify_all(&self) -> Result<RunReport, ParamsError> {
        self.run_plan(Plan::VerifyOnly)
    }

    pub fn run(&self, mode: RunMode) -> Result<RunReport, ParamsError> {
        match mode {
            RunMode::Check => self.check_all(),
            RunMode::Fetch => self.fetch_all(),
            RunMode::Verify => self.verify_all(),
            RunMode::Auto if self.dest_dir.is_dir() => self.check_all(),
            RunMode::Auto => {
                tracing::info!(
                    path = %self.dest_dir.display(),
                    "destination does not exist, fetching all parameters"
                );
                self.fetch_all()
            }
        }
    }

    /// On-disk state of every entry, hashing present files. No mutation, no network.
    pub fn classify_all(&self) -> Vec<(String, Result<DownloadState, ParamsError>)> {
        self.manifest
            .iter()
            .map(|e| (e.name().to_string(), state::classify_verified(e, &self.dest_dir)))
            .collect()
    }

    fn run_plan(&self, plan: Plan) -> Result<RunReport, ParamsError> {
        lock::ensure_supported()?;
        if plan != Plan::VerifyOnly {
            std::fs::create_dir_all(&self.dest_dir)
                .map_err(ParamsError::io("create directory", &self.dest_dir))?;
        }
        tracing::info!(
            plan = ?plan,
            entries = self.manifest.len(),
            path = %self.dest_dir.display(),
            "starting parameter run"
        );
        let ctx = Arc::new(Context {
            manifest: Arc::clone(&self.manifest),
            dest_dir: self.dest_dir.clone(),
            fetcher: self.fetcher.clone(),
            sink: Arc::clone(&self.sink),
            abort: self.abort.clone(),
            plan,
        });
        let report = RunReport::new(pool::run_entries(ctx, self.max_parallel));
        tracing::info!(
            verified = report.verified_count(),
            fetched = report.fetched_count(),
            failed = report.failures().count(),
            "parameter run finished"
        );
        Ok(report)
    }
}
