//! Processing of a single manifest entry: fetch and/or verify, then exactly
//! one terminal event.

use super::report::EntryOutcome;
use crate::control::AbortToken;
use crate::error::ParamsError;
use crate::events::{EventSink, ParamsEvent};
use crate::fetcher::Fetcher;
use crate::manifest::{Manifest, ManifestEntry};
use crate::verify::{self, VerifyMode};
use std::path::PathBuf;
use std::sync::Arc;

/// What a run does with each entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Plan {
    /// Verify if the final file exists, otherwise fetch.
    Check,
    /// Always fetch.
    Fetch,
    /// Verify only; never fetch.
    VerifyOnly,
}

/// Everything a worker needs, shared across the pool.
pub(super) struct Context {
    pub manifest: Arc<Manifest>,
    pub dest_dir: PathBuf,
    pub fetcher: Fetcher,
    pub sink: Arc<dyn EventSink>,
    pub abort: AbortToken,
    pub plan: Plan,
}

impl Context {
    /// Run `entry` to its terminal state and emit the terminal event.
    pub(super) fn process(&self, entry: &ManifestEntry) -> EntryOutcome {
        let res = if self.abort.is_aborted() {
            Err(ParamsError::Cancelled {
                name: entry.name().to_string(),
            })
        } else {
            match self.plan {
                Plan::Check if entry.final_path(&self.dest_dir).is_file() => {
                    self.verify_existing(entry).map(|()| false)
                }
                Plan::Check | Plan::Fetch => self.fetch_and_promote(entry).map(|()| true),
                Plan::VerifyOnly => self.verify_existing(entry).map(|()| false),
            }
        };
        match res {
            Ok(fetched) => {
                self.sink.emit(ParamsEvent::Verified {
                    name: entry.name().to_string(),
                });
                EntryOutcome::Verified { fetched }
            }
            Err(e) => {
                self.report_failure(entry.name(), &e);
                EntryOutcome::Failed(e)
            }
        }
    }

    pub(super) fn report_failure(&self, name: &str, e: &ParamsError) {
        match e {
            ParamsError::Cancelled { .. } => tracing::warn!(entry = name, "{}", e),
            _ => tracing::error!(entry = name, kind = %e.kind(), "{}", e),
        }
        self.sink.emit(ParamsEvent::failed(name, e));
    }

    fn verify_existing(&self, entry: &ManifestEntry) -> Result<(), ParamsError> {
        verify::verify(entry, &self.dest_dir, VerifyMode::VerifyOnly)?;
        self.sink.emit(ParamsEvent::Progress {
            name: entry.name().to_string(),
            percent: 100,
        });
        Ok(())
    }

    fn fetch_and_promote(&self, entry: &ManifestEntry) -> Result<(), ParamsError> {
        let temp = entry.temp_path(&self.dest_dir);
        if temp.is_file() {
            tracing::info!(
                entry = entry.name(),
                path = %temp.display(),
                "discarding partial download from an earlier run"
            );
        }
        let name = entry.name();
        let sink = &self.sink;
        let download = self
            .fetcher
            .fetch_locked(entry, &temp, &self.abort, &mut |percent| {
                sink.emit(ParamsEvent::Progress {
                    name: name.to_string(),
                    percent,
                })
            })?;
        let result = download.result;
        if !result.is_complete() {
            return Err(ParamsError::LengthMismatch {
                name: name.to_string(),
                written: result.bytes_written,
                expected: result.total_bytes.unwrap_or_default(),
            });
        }
        // Hash and rename before the lock is let go.
        verify::verify_download(entry, &self.dest_dir, download.into_writer())?;
        Ok(())
    }
}
