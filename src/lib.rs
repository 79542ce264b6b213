//! # embedstore: an append-only single-file embedding store
//!
//! A store is a single flat file: a fixed 4096-byte header block followed by
//! fixed-stride records, each an id paired with a float32 blob. Writers only
//! ever append; there is no in-place record deletion or resizing. Reads come
//! in two shapes:
//!
//! - [`Store::search`] streams the whole file once, scoring every record
//!   against a query vector by cosine similarity and keeping the top `k`.
//! - [`Store::cursor`] opens a [`Cursor`] for sequential traversal and, for a
//!   writer, in-place blob updates by id.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                     Store                      │
//! │   open/bootstrap header, append, flush, close   │
//! └───────────────┬─────────────────┬───────────────┘
//!                 │                 │
//!        ┌────────┴──────┐   ┌──────┴───────┐
//!        │    scanner     │   │    Cursor     │
//!        │ chunked scan,  │   │ sequential     │
//!        │ cosine top-k   │   │ read + update  │
//!        └────────────────┘   └────────────────┘
//!                 │                 │
//!                 └────────┬────────┘
//!                     io_ext (pread/pwrite)
//! ```
//!
//! All I/O below [`Store`] addresses the file by explicit offset rather than
//! relying on the OS file cursor, so a scan, a cursor, and the writer can
//! share duplicated handles to the same file without perturbing one another.

mod aligned;
mod cursor;
mod error;
mod header;
mod id;
mod io_ext;
mod lock;
mod scanner;
mod store;

pub use cursor::{Cursor, RecordView};
pub use error::{Result, StoreError};
pub use header::VERSION;
pub use id::{Id, Score};
pub use store::{OpenMode, Store, StoreOptions};
