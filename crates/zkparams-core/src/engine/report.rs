//! Per-run summary returned by the engine.

use crate::error::ParamsError;

/// Terminal state of one entry.
#[derive(Debug)]
pub enum EntryOutcome {
    /// Final file in place with a matching digest. `fetched` is false when an
    /// existing file was only re-verified.
    Verified { fetched: bool },
    Failed(ParamsError),
}

#[derive(Debug)]
pub struct EntryReport {
    pub name: String,
    pub outcome: EntryOutcome,
}

impl EntryReport {
    pub fn error(&self) -> Option<&ParamsError> {
        match &self.outcome {
            EntryOutcome::Failed(e) => Some(e),
            EntryOutcome::Verified { .. } => None,
        }
    }
}

/// Outcomes of a run, in manifest order.
#[derive(Debug, Default)]
pub struct RunReport {
    entries: Vec<EntryReport>,
}

impl RunReport {
    pub(crate) fn new(entries: Vec<EntryReport>) -> Self {
        RunReport { entries }
    }

    pub fn entries(&self) -> &[EntryReport] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<EntryReport> {
        self.entries
    }

    /// True if every entry ended `Verified` (vacuously true for an empty manifest).
    pub fn is_success(&self) -> bool {
        self.entries.iter().all(|e| e.error().is_none())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ParamsError)> {
        self.entries
            .iter()
            .filter_map(|e| e.error().map(|err| (e.name.as_str(), err)))
    }

    pub fn verified_count(&self) -> usize {
        self.entries.iter().filter(|e| e.error().is_none()).count()
    }

    /// Entries that were downloaded (not just re-verified) in this run.
    pub fn fetched_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, EntryOutcome::Verified { fetched: true }))
            .count()
    }

    pub fn get(&self, name: &str) -> Option<&EntryReport> {
        self.entries.iter().find(|e| e.name == name)
    }
}
