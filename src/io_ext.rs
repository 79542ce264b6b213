//! Positional file I/O.
//!
//! Every component in this crate addresses the file by explicit byte offset
//! rather than relying on (or advancing) the OS file cursor: the store
//! appends at a computed end-of-file offset, the scanner reads sequential
//! chunks starting at `HEAD_RESERVED`, and the cursor tracks its own `pos`.
//! Using `pread`/`pwrite`-equivalent calls means none of these views can
//! perturb one another even when they share a duplicated handle.

use std::fs::File;
use std::io;

/// Reads into `buf` starting at `offset`, without moving the file's cursor.
///
/// Returns the number of bytes read, which may be less than `buf.len()` at
/// end of file.
pub fn read_at(file: &File, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileExt;
        file.read_at(buf, offset)
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::FileExt;
        file.seek_read(buf, offset)
    }
}

/// Writes `buf` starting at `offset`, without moving the file's cursor.
///
/// Returns the number of bytes actually written by the single underlying
/// syscall, which may be less than `buf.len()` on a partial write; callers
/// that require a full write check this against `buf.len()` themselves
/// (see `StoreError::ShortWrite`).
pub fn write_at(file: &File, offset: u64, buf: &[u8]) -> io::Result<usize> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileExt;
        file.write_at(buf, offset)
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::FileExt;
        file.seek_write(buf, offset)
    }
}
