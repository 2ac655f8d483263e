//! # Locking Primitives
//!
//! Two independent layers protect a table and its side files:
//!
//! 1. **Per-handle intrinsic lock** ([`HandleLock`]): a reentrant mutex that
//!    public methods acquire for their duration when thread safety is
//!    enabled. Reentrancy lets internal helpers re-enter the lock freely. A
//!    DBF and the indexes opened against it may share one `HandleLock` so
//!    their operations serialize against each other.
//!
//! 2. **Advisory file-region locks** ([`RegionLock`]): POSIX `fcntl`
//!    byte-range locks taken around individual header, record, and memo
//!    accesses when file locking is enabled. These coordinate with other
//!    processes; they do nothing against threads of the same process, which
//!    is what layer 1 is for.
//!
//! Region locks are blocking (`F_SETLKW`) and release on drop, so they
//! cannot leak across an error return.
//!
//! POSIX locks are per-process, not per-descriptor: two handles to the same
//! file inside one process silently share (and can silently release) each
//! other's locks. Callers must not open the same table twice in-process.

use std::fs::File;
use std::os::fd::AsRawFd;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::error::Result;

/// A cloneable, optionally-armed reentrant lock shared by one or more
/// open handles.
#[derive(Debug, Clone)]
pub struct HandleLock {
    inner: Arc<ReentrantMutex<()>>,
    armed: bool,
}

impl HandleLock {
    /// Creates a new lock. When `armed` is false, [`acquire`](Self::acquire)
    /// is a no-op; this mirrors the thread-safety configuration flag.
    pub fn new(armed: bool) -> Self {
        Self {
            inner: Arc::new(ReentrantMutex::new(())),
            armed,
        }
    }

    /// Acquires the lock for the lifetime of the returned guard, or returns
    /// `None` immediately when the lock is not armed.
    pub fn acquire(&self) -> Option<ReentrantMutexGuard<'_, ()>> {
        self.armed.then(|| self.inner.lock())
    }
}

/// An advisory byte-range lock on an open file, released on drop.
#[derive(Debug)]
pub struct RegionLock<'a> {
    file: &'a File,
    start: u64,
    len: u64,
}

fn fcntl_lock(file: &File, lock_type: i16, start: u64, len: u64) -> std::io::Result<()> {
    let flock = libc::flock {
        l_type: lock_type,
        l_whence: libc::SEEK_SET as i16,
        l_start: start as libc::off_t,
        l_len: len as libc::off_t,
        l_pid: 0,
    };
    loop {
        // SAFETY: fd is valid for the lifetime of `file`; flock is a plain
        // initialized struct the kernel only reads.
        let rc = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_SETLKW, &flock) };
        if rc == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.kind() != std::io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Blocks until an advisory lock over `[start, start + len)` is granted.
pub fn lock_region(file: &File, start: u64, len: u64, shared: bool) -> Result<RegionLock<'_>> {
    let lock_type = if shared { libc::F_RDLCK } else { libc::F_WRLCK };
    fcntl_lock(file, lock_type as i16, start, len)?;
    Ok(RegionLock { file, start, len })
}

/// Takes a region lock only when `enabled` is set, mirroring the file
/// locking configuration flag.
pub fn lock_region_if(
    enabled: bool,
    file: &File,
    start: u64,
    len: u64,
    shared: bool,
) -> Result<Option<RegionLock<'_>>> {
    if enabled {
        lock_region(file, start, len, shared).map(Some)
    } else {
        Ok(None)
    }
}

impl Drop for RegionLock<'_> {
    fn drop(&mut self) {
        // Unlock failure leaves the lock to die with the descriptor.
        let _ = fcntl_lock(self.file, libc::F_UNLCK as i16, self.start, self.len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn unarmed_handle_lock_returns_no_guard() {
        let lock = HandleLock::new(false);
        assert!(lock.acquire().is_none());
    }

    #[test]
    fn armed_handle_lock_is_reentrant() {
        let lock = HandleLock::new(true);
        let outer = lock.acquire();
        let inner = lock.acquire();
        assert!(outer.is_some());
        assert!(inner.is_some());
    }

    #[test]
    fn shared_handle_lock_serializes_clones() {
        let lock = HandleLock::new(true);
        let clone = lock.clone();
        let _guard = lock.acquire();
        // Same thread, same underlying mutex: reacquiring must not deadlock.
        assert!(clone.acquire().is_some());
    }

    #[test]
    fn region_lock_acquires_and_releases() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locked.bin");
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .unwrap();
        file.set_len(64).unwrap();

        {
            let _shared = lock_region(&file, 0, 32, true).unwrap();
        }
        let _exclusive = lock_region(&file, 0, 32, false).unwrap();
    }

    #[test]
    fn disabled_region_lock_is_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("unlocked.bin");
        let file = File::create(&path).unwrap();
        assert!(lock_region_if(false, &file, 0, 8, true).unwrap().is_none());
    }
}
