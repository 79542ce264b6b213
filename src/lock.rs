//! Exclusive locking of the header coordination range.
//!
//! Bytes `[0, HEAD_RESERVED)` serve as the coordination range for exclusive
//! open bootstrap and cursor update. `fs2` exposes whole-file advisory
//! locking (`flock` on Unix, `LockFileEx` on Windows) rather than true
//! byte-range locks; since this crate only ever needs to exclude other
//! holders of the *same* range, locking the whole file is equivalent in
//! practice and avoids reaching for raw `libc::fcntl` byte-range calls,
//! which this workspace's `unsafe_code = "deny"` lint forbids.
//!
//! A caveat worth stating plainly: `flock`-family locks are associated with
//! the open file description, not the path or inode, so two independently
//! opened handles to the same file do not automatically share a lock's
//! exclusion unless derived from one another (e.g. via `try_clone`). The
//! store's single-writer model and the specification's own open question on
//! concurrent cursor updates mean this is an accepted simplification rather
//! than a true multi-process mutex.

use std::fs::File;

use fs2::FileExt;

/// An RAII guard releasing an exclusive advisory lock on drop.
pub struct HeaderLock<'a> {
    file: &'a File,
}

impl<'a> HeaderLock<'a> {
    /// Acquires an exclusive lock, blocking until available.
    pub fn acquire(file: &'a File) -> std::io::Result<Self> {
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for HeaderLock<'_> {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
