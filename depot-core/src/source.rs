//! Where chunk bytes come from.
//!
//! [`ChunkSource`] stands in for the CDN session plus the per-depot decrypt
//! step; it hands back a compressed frame. [`ChunkLoader`] turns that frame
//! into plaintext, optionally memoized in a shared [`ChunkCache`].

use std::sync::Arc;

use tracing::debug;

use crate::cache::{ChunkCache, ChunkId, ChunkKey};
use crate::codec;
use crate::error::{DepotError, Result};

pub trait ChunkSource: Send + Sync {
    /// Fetch a chunk and strip its transport encryption, yielding the
    /// compressed frame. Retry policy, if any, lives here.
    fn fetch_and_decrypt(&self, depot_id: u32, chunk_id: ChunkId) -> Result<Vec<u8>>;
}

#[derive(Clone)]
pub struct ChunkLoader {
    source: Arc<dyn ChunkSource>,
    cache: Option<Arc<ChunkCache>>,
}

impl ChunkLoader {
    pub fn new(source: Arc<dyn ChunkSource>) -> Self {
        Self {
            source,
            cache: None,
        }
    }

    /// Share decoded chunks through `cache` for the loader's lifetime.
    pub fn with_cache(mut self, cache: Arc<ChunkCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Fetch, decode and return one chunk's plaintext.
    pub fn load(&self, depot_id: u32, chunk_id: ChunkId) -> Result<Arc<[u8]>> {
        match &self.cache {
            Some(cache) => cache.get_or_try_insert_with(ChunkKey::new(depot_id, chunk_id), || {
                self.fetch_and_decode(depot_id, chunk_id)
            }),
            None => self.fetch_and_decode(depot_id, chunk_id).map(Arc::from),
        }
    }

    /// Like [`load`](Self::load), but also checks the decoded length against
    /// what the manifest declared for this chunk.
    pub fn load_exact(&self, depot_id: u32, chunk_id: ChunkId, len: u64) -> Result<Arc<[u8]>> {
        let data = self.load(depot_id, chunk_id)?;
        if data.len() as u64 != len {
            return Err(DepotError::Format(format!(
                "chunk {chunk_id} in depot {depot_id}: decoded {} bytes, manifest says {len}",
                data.len()
            )));
        }
        Ok(data)
    }

    fn fetch_and_decode(&self, depot_id: u32, chunk_id: ChunkId) -> Result<Vec<u8>> {
        let frame = self.source.fetch_and_decrypt(depot_id, chunk_id)?;
        let format = codec::Frame::classify(&frame).format();
        let plain = codec::decode(&frame)?;
        debug!(
            depot_id,
            chunk = %chunk_id,
            %format,
            compressed = frame.len(),
            decoded = plain.len(),
            "decoded chunk"
        );
        Ok(plain)
    }
}
