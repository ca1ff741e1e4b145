//! Cancellation for a running engine.
//!
//! The host (e.g. a Ctrl-C handler) trips the token; workers stop taking new
//! entries and in-flight transfers stop at the next block, releasing their
//! lock and leaving the partial `.dl` file for the next run to overwrite.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared abort flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct AbortToken(Arc<AtomicBool>);

impl AbortToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the run stop as soon as possible.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
