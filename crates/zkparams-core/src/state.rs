//! On-disk state of a manifest entry, derived fresh from the destination
//! directory every time. Nothing is persisted besides the files themselves.

use crate::checksum;
use crate::error::ParamsError;
use crate::manifest::ManifestEntry;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadState {
    /// Neither `<name>` nor `<name>.dl` exists.
    Absent,
    /// Only `<name>.dl` exists (interrupted or failed download).
    PartialOnDisk,
    /// `<name>` exists; digest not checked or not matching.
    Present,
    /// `<name>` exists and its digest matches the manifest.
    Verified,
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DownloadState::Absent => "absent",
            DownloadState::PartialOnDisk => "partial",
            DownloadState::Present => "present",
            DownloadState::Verified => "verified",
        };
        f.write_str(s)
    }
}

/// Cheap classification from file existence only. Never returns `Verified`.
/// A final file wins over a leftover temp file.
pub fn classify(entry: &ManifestEntry, dir: &Path) -> DownloadState {
    if entry.final_path(dir).is_file() {
        DownloadState::Present
    } else if entry.temp_path(dir).is_file() {
        DownloadState::PartialOnDisk
    } else {
        DownloadState::Absent
    }
}

/// Like [`classify`], but hashes a present final file and reports `Verified` on a match.
pub fn classify_verified(entry: &ManifestEntry, dir: &Path) -> Result<DownloadState, ParamsError> {
    let state = classify(entry, dir);
    if state != DownloadState::Present {
        return Ok(state);
    }
    let path = entry.final_path(dir);
    let actual = checksum::sha256_path(&path).map_err(ParamsError::io("read", &path))?;
    if entry.expected_digest().matches(&actual) {
        Ok(DownloadState::Verified)
    } else {
        Ok(DownloadState::Present)
    }
}
