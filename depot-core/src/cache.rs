//! Session-wide cache of decoded chunks.
//!
//! Chunk ids are content hashes, so a decoded chunk never goes stale while the
//! session lives. Nothing is evicted: the working set is bounded by the
//! depots being downloaded and the cache is dropped with its owner.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use crate::error::{DepotError, Result};

/// SHA-1 of a chunk's plaintext, as listed in the manifest.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ChunkId(pub [u8; 20]);

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkId({self})")
    }
}

impl FromStr for ChunkId {
    type Err = DepotError;

    fn from_str(s: &str) -> Result<Self> {
        crate::util::hex::parse_hex_array::<20>(s).map(ChunkId)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    pub depot_id: u32,
    pub chunk_id: ChunkId,
}

impl ChunkKey {
    pub fn new(depot_id: u32, chunk_id: ChunkId) -> Self {
        Self { depot_id, chunk_id }
    }
}

type Slot = Arc<OnceCell<Arc<[u8]>>>;

#[derive(Default)]
pub struct ChunkCache {
    slots: DashMap<ChunkKey, Slot>,
}

impl ChunkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached chunk for `key`, computing it with `f` if absent.
    ///
    /// Concurrent callers for the same key wait on a single computation. If
    /// `f` fails nothing is stored and the next caller tries again.
    pub fn get_or_try_insert_with<F>(&self, key: ChunkKey, f: F) -> Result<Arc<[u8]>>
    where
        F: FnOnce() -> Result<Vec<u8>>,
    {
        // Clone the slot out so the shard lock is not held during `f`.
        let slot = self.slots.entry(key).or_default().value().clone();
        slot.get_or_try_init(|| f().map(Arc::from)).cloned()
    }

    pub fn get(&self, key: &ChunkKey) -> Option<Arc<[u8]>> {
        self.slots.get(key).and_then(|s| s.get().cloned())
    }

    pub fn contains(&self, key: &ChunkKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of chunks held.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
