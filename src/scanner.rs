//! The brute-force cosine top-k search kernel.
//!
//! The scanner never depends on a previously-open [`crate::Store`] beyond a
//! duplicated file handle: it streams the file in large chunks starting at
//! [`HEAD_RESERVED`], tolerating a torn tail and arbitrary read-size returns,
//! and maintains a small sorted top-k collection with per-id dedup.

use std::fs::File;

use crate::aligned::AlignedBuffer;
use crate::error::{Result, StoreError};
use crate::header::{EPSILON, FileHeader, HEAD_RESERVED, split_record};
use crate::id::{Id, Score};
use crate::io_ext::read_at;

/// Number of records read per bulk I/O call.
const CHUNK_RECORDS: usize = 1024;

/// Runs a cosine similarity search over the file behind `file`, starting at
/// [`HEAD_RESERVED`] and reading to EOF.
pub fn search(
    file: &File,
    header: &FileHeader,
    query: &[f32],
    k: usize,
    min_score: f32,
    normalise: bool,
) -> Result<Vec<Score>> {
    if k == 0 {
        return Err(StoreError::bad_arg("topk must be greater than zero"));
    }
    let expected_len = header.blob_size as usize / 4;
    if expected_len == 0 {
        return Err(StoreError::bad_arg(
            "store holds zero-length blobs; search requires a non-empty query",
        ));
    }
    if query.len() != expected_len {
        return Err(StoreError::bad_arg(format!(
            "query has {} lanes, store expects {}",
            query.len(),
            expected_len
        )));
    }
    if !query.iter().all(|v| v.is_finite()) {
        return Err(StoreError::bad_arg("query contains a non-finite value"));
    }

    let qnorm = if normalise { norm2(query) } else { 1.0 };
    if normalise && qnorm < EPSILON {
        return Err(StoreError::bad_arg(format!(
            "query vector norm too small ({qnorm})"
        )));
    }

    let stride = header.stride() as usize;
    let chunk_cap = CHUNK_RECORDS * stride;
    let mut chunk = AlignedBuffer::with_capacity(chunk_cap, header.alignment as usize);
    chunk.resize(chunk_cap);
    let mut carry = vec![0u8; stride];
    let mut carry_len = 0usize;

    let mut top_k = TopK::new(k);
    let mut file_offset = HEAD_RESERVED;

    loop {
        let buf = chunk.as_mut_slice();
        if carry_len > 0 {
            buf[0..carry_len].copy_from_slice(&carry[0..carry_len]);
        }
        let bytes_read = read_at(file, file_offset, &mut buf[carry_len..])?;
        if bytes_read == 0 {
            break;
        }
        file_offset += bytes_read as u64;

        let total = carry_len + bytes_read;
        let mut offset = 0;
        while offset + stride <= total {
            let record = &buf[offset..offset + stride];
            score_record(record, header.blob_size, query, qnorm, min_score, normalise, &mut top_k);
            offset += stride;
        }
        carry_len = total - offset;
        if carry_len > 0 {
            carry[0..carry_len].copy_from_slice(&buf[offset..offset + carry_len]);
        }
    }

    tracing::debug!(results = top_k.len(), "search complete");
    Ok(top_k.into_sorted_vec())
}

fn score_record(
    record: &[u8],
    blob_size: u32,
    query: &[f32],
    qnorm: f32,
    min_score: f32,
    normalise: bool,
    top_k: &mut TopK,
) {
    let (id, blob_bytes) = split_record(record, blob_size);
    let blob_len = blob_size as usize / 4;
    let mut vector = Vec::with_capacity(blob_len);
    for i in 0..blob_len {
        let b: [u8; 4] = blob_bytes[i * 4..i * 4 + 4].try_into().unwrap();
        vector.push(f32::from_le_bytes(b));
    }

    let norm_v = if normalise { norm2(&vector) } else { 1.0 };
    if normalise && norm_v < EPSILON {
        return;
    }

    top_k.remove(id);

    let dot = dot64(query, &vector);
    let score = (dot / (f64::from(qnorm) * f64::from(norm_v))) as f32;
    if score < min_score {
        return;
    }
    top_k.insert(id, score);
}

fn dot64(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}

fn norm2(v: &[f32]) -> f32 {
    let sum_sq: f64 = v.iter().map(|&x| f64::from(x) * f64::from(x)).sum();
    sum_sq.sqrt() as f32
}

/// A bounded, descending-by-score collection of at most `k` entries.
///
/// Mirrors the reference implementation's resort-on-insert approach rather
/// than a binary heap: `k` is expected to be small relative to the scanned
/// set, so a small sorted `Vec` is simpler to audit and fast enough.
struct TopK {
    k: usize,
    entries: Vec<Score>,
}

impl TopK {
    fn new(k: usize) -> Self {
        Self {
            k,
            entries: Vec::with_capacity(k),
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Removes any existing entry with this id (dedup: latest on disk wins).
    fn remove(&mut self, id: Id) {
        if let Some(pos) = self.entries.iter().position(|e| e.id == id) {
            self.entries.remove(pos);
        }
    }

    fn insert(&mut self, id: Id, score: f32) {
        if self.entries.len() < self.k {
            self.entries.push(Score { id, score });
            self.sort();
        } else if let Some(last) = self.entries.last() {
            if score > last.score {
                *self.entries.last_mut().unwrap() = Score { id, score };
                self.sort();
            }
        }
    }

    fn sort(&mut self) {
        self.entries
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    }

    fn into_sorted_vec(self) -> Vec<Score> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(b: u8) -> Id {
        Id::new([b; 16])
    }

    #[test]
    fn top_k_keeps_highest_k_sorted_descending() {
        let mut top = TopK::new(2);
        top.insert(id(1), 0.5);
        top.insert(id(2), 0.9);
        top.insert(id(3), 0.1); // below both, dropped
        let out = top.into_sorted_vec();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, id(2));
        assert_eq!(out[1].id, id(1));
    }

    #[test]
    fn top_k_dedup_removes_prior_entry() {
        let mut top = TopK::new(3);
        top.insert(id(1), 0.5);
        top.remove(id(1));
        top.insert(id(1), 0.9);
        let out = top.into_sorted_vec();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].score, 0.9);
    }

    #[test]
    fn top_k_tie_does_not_displace_incumbent() {
        let mut top = TopK::new(1);
        top.insert(id(1), 0.5);
        top.insert(id(2), 0.5); // equal, strict > required to displace
        let out = top.into_sorted_vec();
        assert_eq!(out[0].id, id(1));
    }
}
