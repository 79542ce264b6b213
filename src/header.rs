//! The fixed on-disk file header and record stride arithmetic.
//!
//! The header is bit-exact and packed: no field relies on Rust's natural
//! struct layout or `#[repr(packed)]` tricks. It is serialized and parsed
//! through explicit little-endian byte slicing, matching the "no reflection"
//! requirement for the on-disk format.

use crate::error::{Result, StoreError};
use crate::id::Id;

/// ASCII magic, zero-padded to 16 bytes.
const MAGIC: &[u8; 16] = b"EMBEDDINGS\0\0\0\0\0\0";

/// Current on-disk format version.
pub const VERSION: u32 = 1;

/// Logical (unpadded) size of [`FileHeader`] on disk, in bytes.
pub const HEADER_SIZE: u32 = 33;

/// Fixed size of the zero-padded header block, regardless of record alignment.
pub const HEAD_RESERVED: u64 = 4096;

/// Size in bytes of an [`Id`].
pub const ID_SIZE: u32 = 16;

/// Largest accepted `blob_size`, in bytes.
pub const MAX_BLOB_SIZE: u32 = 65_536;

/// Smallest accepted record stride alignment.
const MIN_ALIGNMENT: u32 = 64;

/// `1e-6`, the minimum vector norm treated as non-degenerate.
pub const EPSILON: f32 = 1e-6;

/// The parsed, validated file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u32,
    pub alignment: u32,
    pub blob_size: u32,
    pub dtype: u8,
}

impl FileHeader {
    /// Derives the alignment rule from `blob_size` and the system page size.
    ///
    /// If `16 + blob_size >= page_size`, alignment is the page size.
    /// Otherwise it is the smallest power of two `>= 64` that is also
    /// `>= 16 + blob_size`.
    pub fn compute_alignment(blob_size: u32, page_size: u32) -> u32 {
        let header_plus_blob = ID_SIZE + blob_size;
        if header_plus_blob >= page_size {
            return page_size;
        }
        let align = if blob_size == 0 {
            ID_SIZE
        } else {
            header_plus_blob.next_power_of_two()
        };
        align.max(MIN_ALIGNMENT)
    }

    /// Builds a fresh header for a newly created store.
    pub fn new(blob_size: u32, page_size: u32) -> Self {
        Self {
            version: VERSION,
            alignment: Self::compute_alignment(blob_size, page_size),
            blob_size,
            dtype: 0,
        }
    }

    /// Record stride: `align_up(id_size + blob_size, alignment)`. Never
    /// stored on disk; always recomputed from `alignment` and `blob_size`.
    pub fn stride(&self) -> u64 {
        crate::aligned::round_up((ID_SIZE + self.blob_size) as usize, self.alignment as usize)
            as u64
    }

    /// Serializes the header into its logical (unpadded) byte form.
    pub fn to_bytes(self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];
        buf[0..16].copy_from_slice(MAGIC);
        buf[16..20].copy_from_slice(&self.version.to_le_bytes());
        buf[20..24].copy_from_slice(&HEADER_SIZE.to_le_bytes());
        buf[24..28].copy_from_slice(&self.alignment.to_le_bytes());
        buf[28..32].copy_from_slice(&self.blob_size.to_le_bytes());
        buf[32] = self.dtype;
        buf
    }

    /// Parses and validates a header previously written by [`FileHeader::to_bytes`].
    ///
    /// Checks magic, version, and stored size (I1) but does not compare
    /// against the caller's requested `blob_size`; use
    /// [`FileHeader::validate_reopen`] for that.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE as usize {
            return Err(StoreError::format("header block is shorter than 33 bytes"));
        }
        if &buf[0..16] != MAGIC {
            return Err(StoreError::format("bad magic"));
        }
        let version = u32::from_le_bytes(buf[16..20].try_into().unwrap());
        if version != VERSION {
            return Err(StoreError::format(format!(
                "unsupported version {version}"
            )));
        }
        let size = u32::from_le_bytes(buf[20..24].try_into().unwrap());
        if size != HEADER_SIZE {
            return Err(StoreError::format(format!(
                "unexpected header size {size}, expected {HEADER_SIZE}"
            )));
        }
        let alignment = u32::from_le_bytes(buf[24..28].try_into().unwrap());
        if !alignment.is_power_of_two() || alignment < ID_SIZE {
            return Err(StoreError::format(format!(
                "stored alignment {alignment} is not a power of two >= {ID_SIZE}"
            )));
        }
        let blob_size = u32::from_le_bytes(buf[28..32].try_into().unwrap());
        let dtype = buf[32];
        if dtype != 0 {
            return Err(StoreError::format(format!(
                "dtype {dtype} is not supported (only float32 / dtype=0 is defined)"
            )));
        }
        Ok(Self {
            version,
            alignment,
            blob_size,
            dtype,
        })
    }

    /// Validates this (freshly-read) header against the dimensions and page
    /// size requested by the caller reopening the file (I2, I6).
    pub fn validate_reopen(&self, requested_blob_size: u32, page_size: u32) -> Result<()> {
        if self.blob_size != requested_blob_size {
            return Err(StoreError::format(format!(
                "blob size mismatch: file has {}, requested {}",
                self.blob_size, requested_blob_size
            )));
        }
        if self.alignment > page_size {
            return Err(StoreError::format(format!(
                "file alignment {} exceeds system page size {}",
                self.alignment, page_size
            )));
        }
        if self.alignment < page_size {
            tracing::warn!(
                stored_alignment = self.alignment,
                system_page_size = page_size,
                "store was created with a smaller alignment than the current system page size"
            );
        }
        Ok(())
    }
}

/// Splits a raw `stride`-length record into its id and raw little-endian
/// float32 blob bytes. Decoding the blob into `f32` lanes is the scoring
/// path's responsibility (see [`crate::scanner`]).
pub fn split_record(record: &[u8], blob_size: u32) -> (Id, &[u8]) {
    let id_bytes: [u8; 16] = record[0..16].try_into().unwrap();
    (Id::new(id_bytes), &record[16..16 + blob_size as usize])
}
