//! Temp-file lifecycle for parameter downloads.
//!
//! A download streams into `<name>.dl` under an exclusive lock, and only a
//! verified temp file is promoted to `<name>` by an atomic rename within the
//! same directory. Readers of the final name never see partial content.
//!
//! The lock is held from open through hashing and rename. A writer that had to
//! wait re-checks that its handle is still `<name>.dl` before touching it, so
//! it never truncates a file that was promoted while it slept.

use crate::checksum;
use crate::error::ParamsError;
use crate::lock::ScopedLock;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".dl";

/// Path for the temp file: appends `.dl` to the final path (e.g. `a.params` -> `a.params.dl`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Open `path`, lock it, and retry until the locked handle is the file the
/// path names. `create` decides whether a missing file is made or reported.
fn lock_current(path: &Path, create: bool) -> Result<ScopedLock, ParamsError> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(create).truncate(false);
    loop {
        let file = options.open(path).map_err(|e| open_error(path, e))?;
        let lock = ScopedLock::acquire_exclusive(file, path)?;
        if lock.still_names_path()? {
            return Ok(lock);
        }
        tracing::debug!(
            path = %path.display(),
            "file was renamed or replaced while waiting for the lock; reopening"
        );
    }
}

fn open_error(path: &Path, e: io::Error) -> ParamsError {
    if e.kind() == io::ErrorKind::NotFound {
        ParamsError::Missing {
            path: path.to_path_buf(),
        }
    } else {
        ParamsError::io("open", path)(e)
    }
}

/// Exclusive handle on a temp download file, held until promoted or dropped.
#[derive(Debug)]
pub struct TempFileWriter {
    lock: ScopedLock,
    written: u64,
}

impl TempFileWriter {
    /// Open (or create) `temp_path`, wait for the exclusive lock, then truncate.
    ///
    /// Leftovers from a crashed run are discarded; downloads always restart
    /// from byte zero.
    pub fn create(temp_path: &Path) -> Result<Self, ParamsError> {
        let lock = lock_current(temp_path, true)?;
        lock.file()
            .set_len(0)
            .map_err(ParamsError::io("truncate", temp_path))?;
        Ok(TempFileWriter { lock, written: 0 })
    }

    /// Lock an existing temp file as it is, for verification and promotion.
    /// A missing file is `Missing`.
    pub fn open_existing(temp_path: &Path) -> Result<Self, ParamsError> {
        let lock = lock_current(temp_path, false)?;
        let written = lock
            .file()
            .metadata()
            .map_err(ParamsError::io("stat", temp_path))?
            .len();
        Ok(TempFileWriter { lock, written })
    }

    /// Append `data` at the current end of the file.
    pub fn write_chunk(&mut self, data: &[u8]) -> Result<(), ParamsError> {
        let mut f: &File = self.lock.file();
        f.write_all(data)
            .map_err(ParamsError::io("write", self.lock.path()))?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Bytes written since `create` (file length for `open_existing`).
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Sync file data to disk. Call before verification so the digest covers durable bytes.
    pub fn sync(&self) -> Result<(), ParamsError> {
        self.lock
            .file()
            .sync_all()
            .map_err(ParamsError::io("sync", self.lock.path()))
    }

    /// SHA-256 of the whole file, read through the locked handle.
    pub fn digest(&self) -> Result<String, ParamsError> {
        let read_err = || ParamsError::io("read", self.lock.path());
        let mut f: &File = self.lock.file();
        f.seek(SeekFrom::Start(0)).map_err(read_err())?;
        let hex = checksum::sha256_reader(f).map_err(read_err())?;
        f.seek(SeekFrom::End(0)).map_err(read_err())?;
        Ok(hex)
    }

    /// Rename the temp file to `final_path` and only then release the lock.
    /// On failure the temp file stays where it is.
    pub fn promote(self, final_path: &Path) -> Result<(), ParamsError> {
        promote(self.lock.path(), final_path)
    }

    pub fn path(&self) -> &Path {
        self.lock.path()
    }
}

fn promote(temp_path: &Path, final_path: &Path) -> Result<(), ParamsError> {
    std::fs::rename(temp_path, final_path).map_err(ParamsError::io("rename", temp_path))?;
    tracing::debug!(
        "renamed '{}' -> '{}'",
        temp_path.display(),
        final_path.display()
    );
    Ok(())
}
