//! SHA-256 check of a downloaded or existing parameter file, with promotion
//! of a verified temp file to its final name.

use crate::checksum;
use crate::error::ParamsError;
use crate::manifest::ManifestEntry;
use crate::storage::TempFileWriter;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    /// Hash `<name>.dl` and rename it to `<name>` on a match.
    PostDownload,
    /// Hash `<name>` in place; never touches the filesystem.
    VerifyOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOutcome {
    /// Where the verified content now lives (always the final path).
    pub path: PathBuf,
    /// True if a temp file was renamed into place.
    pub promoted: bool,
    /// Lowercase hex digest that was computed.
    pub digest: String,
}

/// Verify `entry` inside `dir` according to `mode`.
///
/// PostDownload locks `<name>.dl` first and holds the lock until the rename.
/// A mismatch leaves the file exactly where and as it was.
pub fn verify(entry: &ManifestEntry, dir: &Path, mode: VerifyMode) -> Result<VerifyOutcome, ParamsError> {
    match mode {
        VerifyMode::PostDownload => {
            let writer = TempFileWriter::open_existing(&entry.temp_path(dir))?;
            verify_download(entry, dir, writer)
        }
        VerifyMode::VerifyOnly => {
            let final_path = entry.final_path(dir);
            let actual = checksum::sha256_path(&final_path).map_err(|e| read_error(&final_path, e))?;
            compare(entry, &final_path, actual).map(|digest| VerifyOutcome {
                path: final_path,
                promoted: false,
                digest,
            })
        }
    }
}

/// Hash a temp file the caller still holds locked and promote it on a match.
/// The lock is released only after the rename.
pub fn verify_download(
    entry: &ManifestEntry,
    dir: &Path,
    writer: TempFileWriter,
) -> Result<VerifyOutcome, ParamsError> {
    let digest = compare(entry, writer.path(), writer.digest()?)?;
    let final_path = entry.final_path(dir);
    writer.promote(&final_path)?;
    tracing::info!(entry = entry.name(), path = %final_path.display(), "promoted");
    Ok(VerifyOutcome {
        path: final_path,
        promoted: true,
        digest,
    })
}

fn compare(entry: &ManifestEntry, subject: &Path, actual: String) -> Result<String, ParamsError> {
    let expected = entry.expected_digest();
    if !expected.matches(&actual) {
        tracing::error!(
            entry = entry.name(),
            path = %subject.display(),
            "SHA-256 mismatch: expected {}, got {}",
            expected,
            actual
        );
        return Err(ParamsError::DigestMismatch {
            path: subject.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    tracing::info!(entry = entry.name(), path = %subject.display(), "SHA-256 verified");
    Ok(actual)
}

fn read_error(path: &Path, e: io::Error) -> ParamsError {
    if e.kind() == io::ErrorKind::NotFound {
        ParamsError::Missing {
            path: path.to_path_buf(),
        }
    } else {
        ParamsError::io("read", path)(e)
    }
}
