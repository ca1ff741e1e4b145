//! Advisory exclusive file locks held for the duration of a write.
//!
//! `ScopedLock` owns the file handle it locks; writers go through
//! [`ScopedLock::file`] and the lock is released when the guard drops, on every
//! exit path. Acquisition blocks until any other holder (another process, or
//! another handle in this process) lets go.
//!
//! A lock is taken on an open handle, not on a name. Whoever waited may wake
//! up holding a file that was renamed or replaced meanwhile;
//! [`ScopedLock::still_names_path`] tells the two apart.
//!
//! Backends (via `fs2`): `flock(LOCK_EX)` on Unix, `LockFileEx` on Windows.
//! Other targets have no backend; [`ensure_supported`] reports that up front.

use crate::error::ParamsError;
use same_file::Handle;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Fails with `UnsupportedPlatform` when this target has no lock backend.
/// Called once before a run touches any entry.
pub fn ensure_supported() -> Result<(), ParamsError> {
    if sys::SUPPORTED {
        Ok(())
    } else {
        Err(ParamsError::UnsupportedPlatform {
            os: std::env::consts::OS,
        })
    }
}

/// Exclusive lock on an open file; unlocked on drop.
#[derive(Debug)]
pub struct ScopedLock {
    file: File,
    path: PathBuf,
}

impl ScopedLock {
    /// Take an exclusive lock on `file` (opened from `path`), blocking until it is free.
    pub fn acquire_exclusive(file: File, path: &Path) -> Result<Self, ParamsError> {
        if !sys::SUPPORTED {
            return Err(ParamsError::UnsupportedPlatform {
                os: std::env::consts::OS,
            });
        }
        sys::lock_exclusive(&file).map_err(ParamsError::io("lock", path))?;
        tracing::trace!(path = %path.display(), "exclusive lock acquired");
        Ok(ScopedLock {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if the locked handle is the file `path` currently names. False
    /// once the path was renamed away, deleted or recreated.
    pub fn still_names_path(&self) -> Result<bool, ParamsError> {
        let held = self
            .file
            .try_clone()
            .and_then(Handle::from_file)
            .map_err(ParamsError::io("stat", &self.path))?;
        match Handle::from_path(&self.path) {
            Ok(current) => Ok(current == held),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ParamsError::io("stat", &self.path)(e)),
        }
    }
}

impl Drop for ScopedLock {
    fn drop(&mut self) {
        if let Err(e) = sys::unlock(&self.file) {
            // Closing the handle below drops the lock anyway.
            tracing::warn!(path = %self.path.display(), "unable to unlock: {}", e);
        }
    }
}

#[cfg(any(unix, windows))]
mod sys {
    use fs2::FileExt;
    use std::fs::File;
    use std::io;

    pub(super) const SUPPORTED: bool = true;

    pub(super) fn lock_exclusive(file: &File) -> io::Result<()> {
        loop {
            match FileExt::lock_exclusive(file) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                r => return r,
            }
        }
    }

    pub(super) fn unlock(file: &File) -> io::Result<()> {
        FileExt::unlock(file)
    }
}

#[cfg(not(any(unix, windows)))]
mod sys {
    use std::fs::File;
    use std::io;

    pub(super) const SUPPORTED: bool = false;

    pub(super) fn lock_exclusive(_file: &File) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "no lock backend"))
    }

    pub(super) fn unlock(_file: &File) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    fn open_rw(path: &Path) -> File {
        File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .unwrap()
    }

    #[test]
    fn supported_on_this_host() {
        assert!(ensure_supported().is_ok());
    }

    #[test]
    fn second_lock_blocks_until_first_drops() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.params.dl");
        let first = ScopedLock::acquire_exclusive(open_rw(&path), &path).unwrap();

        let (tx, rx) = mpsc::channel();
        let p = path.clone();
        let waiter = std::thread::spawn(move || {
            let second = ScopedLock::acquire_exclusive(open_rw(&p), &p).unwrap();
            tx.send(()).unwrap();
            drop(second);
        });

        assert!(
            rx.recv_timeout(Duration::from_millis(200)).is_err(),
            "second writer must wait while the first holds the lock"
        );
        drop(first);
        rx.recv_timeout(Duration::from_secs(5))
            .expect("second writer acquires after release");
        waiter.join().unwrap();
    }

    #[test]
    fn lock_released_on_early_return() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("y.params.dl");

        fn write_then_fail(path: &Path, file: File) -> Result<(), ParamsError> {
            let _lock = ScopedLock::acquire_exclusive(file, path)?;
            Err(ParamsError::Cancelled { name: "y".into() })
        }

        assert!(write_then_fail(&path, open_rw(&path)).is_err());
        // Would block forever if the failed scope had leaked the lock.
        let again = ScopedLock::acquire_exclusive(open_rw(&path), &path).unwrap();
        assert_eq!(again.path(), path.as_path());
    }

    #[test]
    fn renamed_or_replaced_file_no_longer_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("z.params.dl");
        let lock = ScopedLock::acquire_exclusive(open_rw(&path), &path).unwrap();
        assert!(lock.still_names_path().unwrap());

        std::fs::rename(&path, dir.path().join("z.params")).unwrap();
        assert!(!lock.still_names_path().unwrap());

        std::fs::write(&path, b"someone else's").unwrap();
        assert!(!lock.still_names_path().unwrap());
    }
}
