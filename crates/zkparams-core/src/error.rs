//! Error taxonomy for the fetch/verify engine.
//!
//! Per-entry failures are values: the engine turns them into a `Failed` outcome
//! plus a `ParamsEvent::Failed` and keeps going with the remaining entries.
//! Only `UnsupportedPlatform` (and failure to create the destination directory)
//! aborts a whole run.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Coarse classification of a `ParamsError`, suitable for display and for
/// collaborators that only need to branch on the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection, transport or HTTP-level failure, including short bodies.
    Network,
    /// Local read/write/rename failure.
    Io,
    /// File present but its SHA-256 disagrees with the manifest.
    DigestMismatch,
    /// Stopped by the host before completion.
    Cancelled,
    /// No file lock implementation for this host.
    UnsupportedPlatform,
    /// Invalid manifest or configuration input.
    Config,
    /// A worker thread died while processing an entry.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Network => "network",
            ErrorKind::Io => "io",
            ErrorKind::DigestMismatch => "digest-mismatch",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::UnsupportedPlatform => "unsupported-platform",
            ErrorKind::Config => "config",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    /// libcurl (or another transport) reported a failure.
    #[error("GET {url} failed: {message}")]
    Transport { url: String, message: String },

    /// Final response had a non-2xx status.
    #[error("GET {url} returned HTTP {code}")]
    HttpStatus { url: String, code: u32 },

    /// Locator is not HTTPS and plain HTTP was not allowed.
    #[error("refusing to fetch {url}: only https locators are allowed")]
    UnsupportedScheme { url: String },

    /// The stream kept handing back empty blocks.
    #[error("GET {url}: {count} consecutive empty reads, giving up")]
    TooManyEmptyChunks { url: String, count: u32 },

    /// Body length disagrees with the declared `Content-Length`.
    #[error("{name}: received {written} of {expected} bytes")]
    LengthMismatch {
        name: String,
        written: u64,
        expected: u64,
    },

    #[error("{op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Verify-only on a file that is not there.
    #[error("{} does not exist", .path.display())]
    Missing { path: PathBuf },

    #[error("SHA-256 on {} does not match: expected {expected}, got {actual}", .path.display())]
    DigestMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("{name}: cancelled before completion")]
    Cancelled { name: String },

    #[error("file locking is not supported on {os}")]
    UnsupportedPlatform { os: &'static str },

    #[error("invalid manifest: {reason}")]
    Manifest { reason: String },

    #[error("{name}: worker thread panicked")]
    WorkerPanicked { name: String },
}

impl ParamsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParamsError::Transport { .. }
            | ParamsError::HttpStatus { .. }
            | ParamsError::UnsupportedScheme { .. }
            | ParamsError::TooManyEmptyChunks { .. }
            | ParamsError::LengthMismatch { .. } => ErrorKind::Network,
            ParamsError::Io { .. } | ParamsError::Missing { .. } => ErrorKind::Io,
            ParamsError::DigestMismatch { .. } => ErrorKind::DigestMismatch,
            ParamsError::Cancelled { .. } => ErrorKind::Cancelled,
            ParamsError::UnsupportedPlatform { .. } => ErrorKind::UnsupportedPlatform,
            ParamsError::Manifest { .. } => ErrorKind::Config,
            ParamsError::WorkerPanicked { .. } => ErrorKind::Internal,
        }
    }

    /// Build a closure for `map_err` that tags an `io::Error` with the operation and path.
    pub(crate) fn io(op: &'static str, path: &Path) -> impl FnOnce(io::Error) -> ParamsError {
        let path = path.to_path_buf();
        move |source| ParamsError::Io { op, path, source }
    }

    pub(crate) fn manifest(reason: impl Into<String>) -> ParamsError {
        ParamsError::Manifest {
            reason: reason.into(),
        }
    }
}
