//! Error taxonomy for the embedding store.

/// Errors produced by [`crate::Store`] (including its `search` method) and [`crate::Cursor`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An invalid argument was supplied: wrong blob size, zero dim where
    /// required, `topk == 0`, query norm below epsilon, a non-power-of-two
    /// alignment, or an id of the wrong length.
    #[error("invalid argument: {reason}")]
    BadArg { reason: String },

    /// The store or cursor is closed, or an operation was attempted in a
    /// state that does not allow it (e.g. `update` without a prior `read`).
    #[error("invalid state: {reason}")]
    State { reason: String },

    /// The on-disk header failed validation: magic, version, size, blob
    /// size mismatch on reopen, an oversized stored alignment, or a
    /// non-zero `dtype`.
    #[error("format error: {reason}")]
    Format { reason: String },

    /// An underlying OS read/write/seek/lock/handle call failed.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A write returned fewer bytes than requested.
    #[error("short write: expected {expected} bytes, wrote {actual}")]
    ShortWrite { expected: usize, actual: usize },

    /// A cursor update targeted an id that does not match the id stored at
    /// the remembered record offset.
    #[error("id mismatch at offset {offset}: expected {expected:?}, found {found:?}")]
    IdMismatch {
        offset: u64,
        expected: [u8; 16],
        found: [u8; 16],
    },

    /// Allocation of an aligned scratch buffer failed.
    #[error("out of memory allocating {requested} bytes")]
    OutOfMemory { requested: usize },
}

impl StoreError {
    pub(crate) fn bad_arg(reason: impl Into<String>) -> Self {
        Self::BadArg {
            reason: reason.into(),
        }
    }

    pub(crate) fn state(reason: impl Into<String>) -> Self {
        Self::State {
            reason: reason.into(),
        }
    }

    pub(crate) fn format(reason: impl Into<String>) -> Self {
        Self::Format {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
