//! Aligned scratch buffers for record and chunk I/O.
//!
//! Record and chunk buffers must be padded to the store's record `alignment`
//! (a power of two derived from `blob_size` and the system page size, see
//! [`crate::header`]). This module provides an [`AlignedBuffer`] that pads its
//! logical length up to a caller-supplied alignment on ordinary heap memory,
//! rather than performing raw pointer-alignment tricks: `Vec<u8>`'s own
//! allocator already rounds up generously, and the store never issues
//! platform `O_DIRECT`/`FILE_FLAG_NO_BUFFERING` I/O that would require true
//! memory-address alignment.

/// A buffer whose logical length is always a multiple of its alignment.
#[derive(Debug)]
pub struct AlignedBuffer {
    data: Vec<u8>,
    alignment: usize,
}

impl AlignedBuffer {
    /// Creates a new aligned buffer with the given capacity, not yet padded.
    pub fn with_capacity(capacity: usize, alignment: usize) -> Self {
        debug_assert!(alignment > 0 && alignment.is_power_of_two());
        Self {
            data: Vec::with_capacity(round_up(capacity, alignment)),
            alignment,
        }
    }

    /// Creates an aligned, zero-filled buffer of exactly `alignment`-padded `len` bytes.
    pub fn zeroed(len: usize, alignment: usize) -> Self {
        debug_assert!(alignment > 0 && alignment.is_power_of_two());
        let padded = round_up(len, alignment);
        Self {
            data: vec![0u8; padded],
            alignment,
        }
    }

    /// Creates an aligned buffer from existing data, padding with zeros to alignment.
    pub fn from_data(data: &[u8], alignment: usize) -> Self {
        debug_assert!(alignment > 0 && alignment.is_power_of_two());
        let aligned_len = round_up(data.len(), alignment);
        let mut buf = Vec::with_capacity(aligned_len);
        buf.extend_from_slice(data);
        buf.resize(aligned_len, 0);
        Self {
            data: buf,
            alignment,
        }
    }

    /// Returns the buffer contents as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Returns the buffer contents as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Returns the length of the data in the buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Extends the buffer with the given data.
    pub fn extend_from_slice(&mut self, data: &[u8]) {
        self.data.extend_from_slice(data);
    }

    /// Pads the buffer to the next alignment boundary with zeros.
    pub fn pad_to_alignment(&mut self) {
        let aligned_len = round_up(self.data.len(), self.alignment);
        self.data.resize(aligned_len, 0);
    }

    /// Resizes the buffer, filling any new bytes with zero.
    pub fn resize(&mut self, new_len: usize) {
        self.data.resize(new_len, 0);
    }

    /// Consumes the buffer and returns the underlying `Vec<u8>`.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Clears the buffer.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl AsRef<[u8]> for AlignedBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl AsMut<[u8]> for AlignedBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Rounds `value` up to the nearest multiple of `alignment`.
pub(crate) fn round_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment > 0, "alignment must be positive");
    debug_assert!(
        alignment.is_power_of_two(),
        "alignment must be a power of two"
    );
    (value + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_up_basic() {
        assert_eq!(round_up(0, 4096), 0);
        assert_eq!(round_up(1, 4096), 4096);
        assert_eq!(round_up(4096, 4096), 4096);
        assert_eq!(round_up(4097, 4096), 8192);
    }

    #[test]
    fn aligned_buffer_from_data_pads() {
        let data = vec![1u8; 100];
        let buf = AlignedBuffer::from_data(&data, 4096);
        assert_eq!(buf.len(), 4096);
        assert_eq!(&buf.as_slice()[..100], &data[..]);
        assert!(buf.as_slice()[100..].iter().all(|&b| b == 0));
    }

    #[test]
    fn aligned_buffer_pad_small_alignment() {
        let mut buf = AlignedBuffer::with_capacity(64, 64);
        buf.extend_from_slice(&[1, 2, 3]);
        assert_eq!(buf.len(), 3);
        buf.pad_to_alignment();
        assert_eq!(buf.len(), 64);
    }

    #[test]
    fn zeroed_is_exact_multiple() {
        let buf = AlignedBuffer::zeroed(20, 16);
        assert_eq!(buf.len(), 32);
        assert!(buf.as_slice().iter().all(|&b| b == 0));
    }
}
