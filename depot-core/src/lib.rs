#![forbid(unsafe_code)]

pub mod error;

pub mod util {
    pub mod digest;
    pub mod hex;
    pub mod sanitize;
}

pub mod cache;
pub mod codec;
pub mod file;
pub mod keys;
pub mod local;
pub mod manifest;
pub mod materialize;
pub mod report;
pub mod source;

// Re-exports: stable API surface
pub use cache::{ChunkCache, ChunkId, ChunkKey};
pub use codec::{DecodeError, FrameFormat, decode};
pub use error::{DepotError, Result};
pub use file::{ChunkRef, ChunkedFile, DepotFile, EntryKind, FileEntry};
pub use keys::{DepotKeys, KeyFile};
pub use manifest::Manifest;
pub use materialize::{MaterializeOptions, Materializer, Outcome, materialize};
pub use report::FailureReport;
pub use source::{ChunkLoader, ChunkSource};
