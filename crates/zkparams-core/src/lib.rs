//! Download, verify and resume engine for zkSNARK parameter files.
//!
//! Files named in a [`Manifest`] are streamed into `<name>.dl` under an
//! exclusive lock, checked against their SHA-256 digest and only then
//! renamed to `<name>`. [`ParamsEngine`] drives the whole manifest and
//! reports through an [`EventSink`].

pub mod config;
pub mod logging;
pub mod paths;

pub mod checksum;
pub mod control;
pub mod engine;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod lock;
pub mod manifest;
pub mod state;
pub mod storage;
pub mod verify;

#[cfg(test)]
mod test_support;

pub use control::AbortToken;
pub use engine::{EntryOutcome, EntryReport, ParamsEngine, RunMode, RunReport};
pub use error::{ErrorKind, ParamsError};
pub use events::{EventSink, ParamsEvent};
pub use fetcher::{Download, FetchOptions, FetchResult, Fetcher};
pub use manifest::{Manifest, ManifestEntry};
pub use state::DownloadState;
