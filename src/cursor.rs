//! Sequential read/write traversal over a store, independent of any other
//! open view.

use std::fs::File;

use crate::aligned::AlignedBuffer;
use crate::error::{Result, StoreError};
use crate::header::{FileHeader, HEAD_RESERVED, split_record};
use crate::id::Id;
use crate::io_ext::{read_at, write_at};
use crate::lock::HeaderLock;
use crate::store::Store;

/// A view into the current record, valid only until the next cursor
/// operation (the next `read` overwrites the buffer it borrows from).
#[derive(Debug)]
pub struct RecordView<'a> {
    pub id: Id,
    blob_bytes: &'a [u8],
}

impl<'a> RecordView<'a> {
    /// Raw little-endian float32 bytes of the blob.
    pub fn blob_bytes(&self) -> &'a [u8] {
        self.blob_bytes
    }

    /// Decodes the blob into an owned `Vec<f32>`.
    pub fn blob(&self) -> Vec<f32> {
        self.blob_bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
            .collect()
    }
}

/// Offline sequential traversal over a store's records, with optional
/// in-place blob updates by id.
///
/// Designed for offline processing: running a cursor concurrently with a
/// writer appending to the same file is unsupported (the visible tail may
/// move during traversal).
#[derive(Debug)]
pub struct Cursor {
    file: Option<File>,
    header: FileHeader,
    buffer: AlignedBuffer,
    pos: u64,
    last_record_offset: Option<u64>,
    read_only: bool,
}

impl Cursor {
    pub(crate) fn open(store: &Store, read_only: bool) -> Result<Self> {
        let file = store.try_clone_file()?;
        let header = *store.header();
        let stride = header.stride() as usize;
        let buffer = AlignedBuffer::zeroed(stride, header.alignment as usize);
        Ok(Self {
            file: Some(file),
            header,
            buffer,
            pos: HEAD_RESERVED,
            last_record_offset: None,
            read_only,
        })
    }

    fn file_ref(&self) -> Result<&File> {
        self.file
            .as_ref()
            .ok_or_else(|| StoreError::state("cursor is closed"))
    }

    /// Reads the next record, or `None` at end of file (including a torn
    /// tail shorter than one stride).
    pub fn read(&mut self) -> Result<Option<RecordView<'_>>> {
        let stride = self.header.stride() as usize;
        let offset = self.pos;
        let n = {
            let file = self
                .file
                .as_ref()
                .ok_or_else(|| StoreError::state("cursor is closed"))?;
            read_at(file, offset, self.buffer.as_mut_slice())?
        };
        if n < stride {
            return Ok(None);
        }
        self.last_record_offset = Some(offset);
        self.pos = offset + stride as u64;

        let (id, _) = split_record(self.buffer.as_slice(), self.header.blob_size);
        let blob_bytes = &self.buffer.as_slice()[16..16 + self.header.blob_size as usize];
        Ok(Some(RecordView { id, blob_bytes }))
    }

    /// Rewinds to the first record. Clears the remembered update offset.
    pub fn reset(&mut self) -> Result<()> {
        self.file_ref()?;
        self.pos = HEAD_RESERVED;
        self.last_record_offset = None;
        Ok(())
    }

    /// Overwrites the blob of the most recently read record, verifying `id`
    /// still matches what is stored there.
    ///
    /// The specification describes saving the current file position before
    /// seeking to the record and restoring it afterward; this crate never
    /// relies on (or moves) the OS file cursor in the first place — every
    /// read and write is addressed by explicit offset — so there is no
    /// position to save or restore. The cursor's own `pos` bookkeeping,
    /// which plays that role, is untouched by `update`.
    pub fn update(&mut self, id: Id, new_blob: &[f32], flush: bool) -> Result<()> {
        if self.read_only {
            return Err(StoreError::state("cursor was opened read-only"));
        }
        let expected_len = self.header.blob_size as usize / 4;
        if new_blob.len() != expected_len {
            return Err(StoreError::bad_arg(format!(
                "blob has {} lanes, store expects {}",
                new_blob.len(),
                expected_len
            )));
        }
        let offset = self
            .last_record_offset
            .ok_or_else(|| StoreError::state("update requires a prior successful read"))?;

        let file = self
            .file
            .as_ref()
            .ok_or_else(|| StoreError::state("cursor is closed"))?;
        let _lock = HeaderLock::acquire(file)?;

        let mut on_disk = [0u8; 16];
        read_at(file, offset, &mut on_disk)?;
        if on_disk != *id.as_bytes() {
            return Err(StoreError::IdMismatch {
                offset,
                expected: *id.as_bytes(),
                found: on_disk,
            });
        }

        let mut blob_bytes = vec![0u8; new_blob.len() * 4];
        for (i, lane) in new_blob.iter().enumerate() {
            blob_bytes[i * 4..i * 4 + 4].copy_from_slice(&lane.to_le_bytes());
        }
        write_at(file, offset + 16, &blob_bytes)?;
        if flush {
            file.sync_all()?;
        }
        tracing::debug!(offset, "cursor updated record");
        Ok(())
    }

    /// Releases the buffer and handle. Idempotent.
    pub fn close(&mut self) {
        self.file = None;
        self.buffer.clear();
    }
}
