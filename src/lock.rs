//! Locked blob files for the file backend
//!
//! Each blob `<key>.json` is guarded by an advisory lock on a `<key>.json.lock`
//! sibling. Writers hold the lock across a temp-file write and rename, so a
//! reader sees either the previous blob or the new one, never a torn file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{Error, Result};

/// How long a blob operation waits for a contended lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const RETRY_EVERY: Duration = Duration::from_millis(50);

/// Held lock on one blob; released on drop
pub struct BlobLock {
    file: File,
    blob: PathBuf,
}

impl BlobLock {
    /// Lock `blob` exclusively, retrying until `timeout`
    pub fn acquire(blob: &Path, timeout: Duration) -> Result<Self> {
        let lock_path = lock_path_for(blob);
        if let Some(dir) = lock_path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(Self {
                        file,
                        blob: blob.to_path_buf(),
                    })
                }
                Err(err) if contended(&err) => {
                    if Instant::now() >= deadline {
                        tracing::warn!(blob = %blob.display(), "blob lock timed out");
                        return Err(Error::LockFailed(lock_path));
                    }
                    std::thread::sleep(RETRY_EVERY);
                }
                Err(err) => return Err(Error::Io(err)),
            }
        }
    }

    /// The blob this lock guards
    pub fn blob(&self) -> &Path {
        &self.blob
    }
}

impl Drop for BlobLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn contended(err: &io::Error) -> bool {
    // Windows reports a held lock as a sharing violation (32) or lock violation (33)
    err.kind() == io::ErrorKind::WouldBlock
        || (cfg!(windows) && matches!(err.raw_os_error(), Some(32) | Some(33)))
}

pub fn lock_path_for(blob: &Path) -> PathBuf {
    let mut name = blob.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

fn temp_path_for(blob: &Path) -> PathBuf {
    let mut name = blob.as_os_str().to_os_string();
    name.push(format!(".tmp.{}", std::process::id()));
    PathBuf::from(name)
}

/// Replace `blob` with `contents` under its lock
pub fn write_blob(blob: &Path, contents: &str, timeout: Duration) -> Result<()> {
    let _lock = BlobLock::acquire(blob, timeout)?;

    // Same directory as the target so the rename cannot cross filesystems
    let temp = temp_path_for(blob);
    let mut file = File::create(&temp)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    drop(file);

    if let Err(err) = fs::rename(&temp, blob) {
        let _ = fs::remove_file(&temp);
        return Err(Error::Io(err));
    }
    Ok(())
}

/// Read `blob` under its lock; `Ok(None)` when it does not exist
pub fn read_blob(blob: &Path, timeout: Duration) -> Result<Option<String>> {
    if !blob.exists() {
        return Ok(None);
    }
    let _lock = BlobLock::acquire(blob, timeout)?;
    match fs::read_to_string(blob) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(Error::Io(err)),
    }
}
