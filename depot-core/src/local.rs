//! Filesystem backend: frames in a directory tree and manifests as JSON.
//!
//! Used by `depotdev` and the integration tests. Frames are stored already
//! decrypted, one file per chunk at `<root>/<depot_id>/<chunk id hex>`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cache::ChunkId;
use crate::error::{DepotError, Result};
use crate::file::{ChunkRef, ChunkedFile, DepotFile, EntryKind, FileEntry};
use crate::manifest::Manifest;
use crate::source::{ChunkLoader, ChunkSource};
use crate::util::hex::parse_hex_array;

pub struct DirChunkSource {
    root: PathBuf,
}

impl DirChunkSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn frame_path(&self, depot_id: u32, chunk_id: ChunkId) -> PathBuf {
        self.root
            .join(depot_id.to_string())
            .join(chunk_id.to_string())
    }

    pub fn write_frame(&self, depot_id: u32, chunk_id: ChunkId, frame: &[u8]) -> Result<()> {
        let p = self.frame_path(depot_id, chunk_id);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(p, frame)?;
        Ok(())
    }
}

impl ChunkSource for DirChunkSource {
    fn fetch_and_decrypt(&self, depot_id: u32, chunk_id: ChunkId) -> Result<Vec<u8>> {
        match fs::read(self.frame_path(depot_id, chunk_id)) {
            Ok(frame) => Ok(frame),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(DepotError::Source(format!(
                "chunk {chunk_id} of depot {depot_id} not in {}",
                self.root.display()
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChunkDoc {
    /// Hex SHA-1 chunk id.
    pub id: String,
    pub offset: u64,
    pub length: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FileDoc {
    pub filename: String,
    pub size: u64,
    #[serde(default)]
    pub kind: EntryKind,
    /// Hex SHA-1 of the whole file.
    pub sha_content: String,
    #[serde(default)]
    pub chunks: Vec<ChunkDoc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ManifestDoc {
    pub depot_id: u32,
    pub files: Vec<FileDoc>,
}

impl FileDoc {
    fn to_entry(&self) -> Result<FileEntry> {
        let chunks = self
            .chunks
            .iter()
            .map(|c| {
                if c.offset.checked_add(c.length).is_none() {
                    return Err(DepotError::Format(format!(
                        "{}: chunk {} at offset {} with length {} overflows",
                        self.filename, c.id, c.offset, c.length
                    )));
                }
                Ok(ChunkRef {
                    id: c.id.parse()?,
                    offset: c.offset,
                    length: c.length,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(FileEntry {
            filename: self.filename.clone(),
            size: self.size,
            kind: self.kind,
            content_hash: parse_hex_array::<20>(&self.sha_content)?,
            chunks,
        })
    }
}

/// A manifest read from JSON. Filenames are always plaintext.
pub struct JsonManifest {
    depot_id: u32,
    entries: Vec<FileEntry>,
    loader: ChunkLoader,
}

impl JsonManifest {
    pub fn parse(json: &str, loader: ChunkLoader) -> Result<Self> {
        let doc: ManifestDoc = serde_json::from_str(json)
            .map_err(|e| DepotError::Format(format!("manifest: {e}")))?;
        Self::from_doc(&doc, loader)
    }

    pub fn open(path: &Path, loader: ChunkLoader) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text, loader)
    }

    pub fn from_doc(doc: &ManifestDoc, loader: ChunkLoader) -> Result<Self> {
        let entries = doc
            .files
            .iter()
            .map(FileDoc::to_entry)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            depot_id: doc.depot_id,
            entries,
            loader,
        })
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }
}

impl Manifest for JsonManifest {
    fn depot_id(&self) -> u32 {
        self.depot_id
    }

    fn filenames_encrypted(&self) -> bool {
        false
    }

    fn decrypt_filenames(&mut self, _key: &[u8]) -> Result<()> {
        Ok(())
    }

    fn into_files(self: Box<Self>) -> Vec<Box<dyn DepotFile>> {
        let JsonManifest {
            depot_id,
            entries,
            loader,
        } = *self;
        entries
            .into_iter()
            .map(|e| Box::new(ChunkedFile::new(loader.clone(), depot_id, e)) as Box<dyn DepotFile>)
            .collect()
    }
}
