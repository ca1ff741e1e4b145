//! Events delivered to the collaborator layer (UI, CLI, logger).
//!
//! Per entry the order is: zero or more `Progress` (non-decreasing within one
//! fetch), then exactly one of `Verified` or `Failed`. Events for different
//! entries may interleave when entries run in parallel.

use crate::error::{ErrorKind, ParamsError};
use std::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamsEvent {
    /// Download progress for one entry, 0..=100.
    Progress { name: String, percent: u8 },
    /// Entry's file is in place under its final name with a matching digest.
    Verified { name: String },
    /// Entry ended in `Failed`; the same error is in the run report.
    Failed {
        name: String,
        kind: ErrorKind,
        message: String,
    },
}

impl ParamsEvent {
    pub fn name(&self) -> &str {
        match self {
            ParamsEvent::Progress { name, .. }
            | ParamsEvent::Verified { name }
            | ParamsEvent::Failed { name, .. } => name,
        }
    }

    pub(crate) fn failed(name: &str, err: &ParamsError) -> Self {
        ParamsEvent::Failed {
            name: name.to_string(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Receiver of engine events. Called from worker threads, hence `Send + Sync`.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ParamsEvent);
}

impl<F> EventSink for F
where
    F: Fn(ParamsEvent) + Send + Sync,
{
    fn emit(&self, event: ParamsEvent) {
        self(event)
    }
}

/// Channel delivery; a dropped receiver just discards events.
impl EventSink for mpsc::Sender<ParamsEvent> {
    fn emit(&self, event: ParamsEvent) {
        let _ = self.send(event);
    }
}

/// `floor(done * 100 / total)` clamped to 100; `None` when the total is unknown or zero.
pub fn percent(done: u64, total: Option<u64>) -> Option<u8> {
    match total {
        Some(t) if t > 0 => {
            let p = (u128::from(done) * 100 / u128::from(t)).min(100);
            Some(p as u8)
        }
        _ => None,
    }
}
