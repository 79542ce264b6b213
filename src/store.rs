//! The append-only store: owns the file handle, validates the header on
//! open, and exposes append/flush/close.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use tempfile::TempPath;

use crate::aligned::AlignedBuffer;
use crate::error::{Result, StoreError};
use crate::header::{FileHeader, HEAD_RESERVED, HEADER_SIZE, ID_SIZE, MAX_BLOB_SIZE};
use crate::id::{Id, Score};
use crate::io_ext::{read_at, write_at};
use crate::lock::HeaderLock;
use crate::{Cursor, scanner};

/// How a store's backing file should be opened, mirroring the `"r"`/`"a"`/
/// `"a+"`/`"a++"` string modes at the external boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// `"r"` — read only, must exist.
    Read,
    /// `"a"` — read+append, must exist.
    AppendExisting,
    /// `"a+"` — read+append, create if missing.
    AppendOrCreate,
    /// `"a++"` — read+append, truncate/create always.
    CreateAlways,
}

impl std::str::FromStr for OpenMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" => Ok(Self::Read),
            "a" => Ok(Self::AppendExisting),
            "a+" => Ok(Self::AppendOrCreate),
            "a++" => Ok(Self::CreateAlways),
            other => Err(StoreError::bad_arg(format!("unknown open mode {other:?}"))),
        }
    }
}

/// Typed options for [`Store::open`], replacing loose positional parameters.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Backing file path. `None`, an empty path, or the sentinel `:temp:`
    /// requests an ephemeral file in the OS temp area, deleted on close.
    pub path: Option<PathBuf>,
    pub mode: OpenMode,
    /// Vector length in float32 lanes; `blob_size = dim * 4`.
    pub dim: u32,
}

impl StoreOptions {
    pub fn ephemeral(dim: u32) -> Self {
        Self {
            path: None,
            mode: OpenMode::CreateAlways,
            dim,
        }
    }

    fn wants_ephemeral(&self) -> bool {
        match &self.path {
            None => true,
            Some(p) => p.as_os_str().is_empty() || p == Path::new(":temp:"),
        }
    }
}

/// An open, append-only embedding store backed by a single file.
#[derive(Debug)]
pub struct Store {
    file: Option<File>,
    header: FileHeader,
    temp_path: Option<TempPath>,
}

impl Store {
    /// Opens, bootstraps, or validates a store according to `options`.
    pub fn open(options: StoreOptions) -> Result<Self> {
        let blob_size = options
            .dim
            .checked_mul(4)
            .ok_or_else(|| StoreError::bad_arg("dim too large: dim * 4 overflows u32"))?;
        if blob_size > MAX_BLOB_SIZE {
            return Err(StoreError::bad_arg(format!(
                "blob size {blob_size} exceeds the maximum of {MAX_BLOB_SIZE}"
            )));
        }
        let page_size = page_size::get() as u32;

        let (file, temp_path) = if options.wants_ephemeral() {
            let named = tempfile::Builder::new()
                .prefix("embeddings")
                .suffix(".dat")
                .tempfile()?;
            let (file, path) = named.into_parts();
            (file, Some(path))
        } else {
            let path = options.path.as_deref().expect("checked above");
            (open_with_mode(path, options.mode)?, None)
        };

        let header = bootstrap(&file, blob_size, page_size)?;
        tracing::debug!(
            dim = options.dim,
            blob_size,
            alignment = header.alignment,
            ephemeral = temp_path.is_some(),
            "store opened"
        );

        Ok(Self {
            file: Some(file),
            header,
            temp_path,
        })
    }

    fn file_ref(&self) -> Result<&File> {
        self.file
            .as_ref()
            .ok_or_else(|| StoreError::state("store is closed"))
    }

    pub(crate) fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Duplicates the underlying file handle for an independent read (or
    /// read+write) view, as used by [`Store::search`] and [`Store::cursor`].
    pub(crate) fn try_clone_file(&self) -> Result<File> {
        Ok(self.file_ref()?.try_clone()?)
    }

    /// Appends one record: `id` followed by `blob`, zero-padded to stride.
    pub fn append(&self, id: Id, blob: &[f32], flush: bool) -> Result<()> {
        let file = self.file_ref()?;
        let expected_len = self.header.blob_size as usize / 4;
        if blob.len() != expected_len {
            return Err(StoreError::bad_arg(format!(
                "blob has {} lanes, store expects {}",
                blob.len(),
                expected_len
            )));
        }

        let stride = self.header.stride();
        let mut record = AlignedBuffer::zeroed(stride as usize, self.header.alignment as usize);
        let buf = record.as_mut_slice();
        buf[0..ID_SIZE as usize].copy_from_slice(id.as_bytes());
        for (i, lane) in blob.iter().enumerate() {
            let off = ID_SIZE as usize + i * 4;
            buf[off..off + 4].copy_from_slice(&lane.to_le_bytes());
        }

        let offset = file.metadata()?.len();
        let written = write_at(file, offset, record.as_slice())?;
        if written != record.len() {
            return Err(StoreError::ShortWrite {
                expected: record.len(),
                actual: written,
            });
        }
        if flush {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Forces durability of all prior writes.
    pub fn flush(&self) -> Result<()> {
        self.file_ref()?.sync_all()?;
        Ok(())
    }

    /// Closes the store. Idempotent; deletes the backing file immediately
    /// if it was ephemeral.
    pub fn close(&mut self) {
        self.file = None;
        self.temp_path = None;
        tracing::debug!("store closed");
    }

    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// Runs a brute-force cosine top-k search over an independent read view
    /// of the file. See [`scanner::search`] for the algorithm.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        min_score: f32,
        normalise: bool,
    ) -> Result<Vec<Score>> {
        let file = self.try_clone_file()?;
        scanner::search(&file, &self.header, query, k, min_score, normalise)
    }

    /// Opens a [`Cursor`] for sequential traversal, optionally read-only.
    pub fn cursor(&self, read_only: bool) -> Result<Cursor> {
        self.file_ref()?;
        Cursor::open(self, read_only)
    }
}

/// Opens the backing file for `mode`.
///
/// `AppendExisting`/`AppendOrCreate` deliberately use `.write(true)` rather
/// than `.append(true)`: every write in this crate is already
/// offset-addressed (`Store::append` seeks explicitly via
/// `metadata().len()`, `Cursor::update` writes at a remembered record
/// offset), and `O_APPEND` would make `pwrite`-equivalent calls ignore their
/// given offset on Linux, always writing at EOF instead.
fn open_with_mode(path: &Path, mode: OpenMode) -> Result<File> {
    let mut opts = OpenOptions::new();
    match mode {
        OpenMode::Read => {
            opts.read(true);
        }
        OpenMode::AppendExisting => {
            opts.read(true).write(true);
        }
        OpenMode::AppendOrCreate => {
            opts.read(true).write(true).create(true);
        }
        OpenMode::CreateAlways => {
            opts.read(true).write(true).create(true).truncate(true);
        }
    }
    Ok(opts.open(path)?)
}

/// Reads or writes the 4096-byte header block under an exclusive lock,
/// per the open-bootstrap protocol: a zero-length file gets a fresh header
/// synthesised and flushed; a non-zero file must already hold a valid one.
fn bootstrap(file: &File, requested_blob_size: u32, page_size: u32) -> Result<FileHeader> {
    let _lock = HeaderLock::acquire(file)?;
    let len = file.metadata()?.len();
    if len == 0 {
        let header = FileHeader::new(requested_blob_size, page_size);
        let mut block = AlignedBuffer::zeroed(HEAD_RESERVED as usize, HEAD_RESERVED as usize);
        block.as_mut_slice()[0..HEADER_SIZE as usize].copy_from_slice(&header.to_bytes());
        let written = write_at(file, 0, block.as_slice())?;
        if written != block.len() {
            return Err(StoreError::ShortWrite {
                expected: block.len(),
                actual: written,
            });
        }
        file.sync_all()?;
        Ok(header)
    } else {
        let mut buf = [0u8; HEADER_SIZE as usize];
        let n = read_at(file, 0, &mut buf)?;
        if (n as u32) < HEADER_SIZE {
            return Err(StoreError::format("header block is truncated"));
        }
        let header = FileHeader::from_bytes(&buf)?;
        header.validate_reopen(requested_blob_size, page_size)?;
        Ok(header)
    }
}
