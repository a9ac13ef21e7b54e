use std::io::{self, Read};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::ChunkId;
use crate::source::ChunkLoader;

/// One file listed by a depot manifest, readable as a byte stream.
///
/// Reads are sequential from a logical cursor that [`seek_to`](Self::seek_to)
/// repositions; an empty read means end of file.
pub trait DepotFile: Read + Send {
    /// Manifest-relative path. May use `\` separators.
    fn filename(&self) -> &str;
    fn size(&self) -> u64;
    fn is_file(&self) -> bool;
    /// SHA-1 of the whole file content.
    fn content_hash(&self) -> &[u8; 20];
    fn seek_to(&mut self, offset: u64) -> io::Result<()>;
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    File,
    Directory,
    Symlink,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChunkRef {
    pub id: ChunkId,
    /// Offset of the chunk's first byte within the file.
    pub offset: u64,
    /// Decoded length.
    pub length: u64,
}

#[derive(Clone, Debug)]
pub struct FileEntry {
    pub filename: String,
    pub size: u64,
    pub kind: EntryKind,
    pub content_hash: [u8; 20],
    /// Ordered by offset. Gaps between chunks read back as zeros.
    pub chunks: Vec<ChunkRef>,
}

/// A [`DepotFile`] that pulls its content chunk by chunk through a
/// [`ChunkLoader`].
pub struct ChunkedFile {
    loader: ChunkLoader,
    depot_id: u32,
    entry: FileEntry,
    pos: u64,
    cur: Option<(usize, Arc<[u8]>)>,
}

impl ChunkedFile {
    pub fn new(loader: ChunkLoader, depot_id: u32, mut entry: FileEntry) -> Self {
        entry.chunks.sort_by_key(|c| c.offset);
        Self {
            loader,
            depot_id,
            entry,
            pos: 0,
            cur: None,
        }
    }

    fn chunk_data(&mut self, idx: usize) -> io::Result<Arc<[u8]>> {
        if let Some((i, data)) = &self.cur {
            if *i == idx {
                return Ok(data.clone());
            }
        }
        let c = self.entry.chunks[idx];
        let data = self.loader.load_exact(self.depot_id, c.id, c.length)?;
        self.cur = Some((idx, data.clone()));
        Ok(data)
    }
}

impl Read for ChunkedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let size = self.entry.size;
        if self.pos >= size || buf.is_empty() {
            return Ok(0);
        }
        let want = (size - self.pos).min(buf.len() as u64);
        let pos = self.pos;

        // First chunk that ends past the cursor.
        let idx = self
            .entry
            .chunks
            .partition_point(|c| c.offset.saturating_add(c.length) <= pos);
        let n = match self.entry.chunks.get(idx) {
            Some(c) if c.offset <= pos => {
                let (off, len) = (c.offset, c.length);
                let data = self.chunk_data(idx)?;
                let start = (pos - off) as usize;
                let n = want.min(len - (pos - off)) as usize;
                buf[..n].copy_from_slice(&data[start..start + n]);
                n
            }
            next => {
                let gap_end = next.map_or(size, |c| c.offset.min(size));
                let n = want.min(gap_end - pos) as usize;
                buf[..n].fill(0);
                n
            }
        };
        self.pos += n as u64;
        Ok(n)
    }
}

impl DepotFile for ChunkedFile {
    fn filename(&self) -> &str {
        &self.entry.filename
    }

    fn size(&self) -> u64 {
        self.entry.size
    }

    fn is_file(&self) -> bool {
        self.entry.kind == EntryKind::File
    }

    fn content_hash(&self) -> &[u8; 20] {
        &self.entry.content_hash
    }

    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        if offset > self.entry.size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "seek to {offset} past end of {} ({} bytes)",
                    self.entry.filename, self.entry.size
                ),
            ));
        }
        self.pos = offset;
        Ok(())
    }
}
