use std::collections::HashMap;
use std::path::PathBuf;

use once_cell::sync::OnceCell;

use crate::error::{DepotError, Result};

/// Lookup of the symmetric key for a depot.
pub trait DepotKeys: Send + Sync {
    fn key_for(&self, depot_id: u32) -> Result<Vec<u8>>;
}

impl DepotKeys for HashMap<u32, Vec<u8>> {
    fn key_for(&self, depot_id: u32) -> Result<Vec<u8>> {
        self.get(&depot_id)
            .cloned()
            .ok_or(DepotError::MissingKey(depot_id))
    }
}

/// Keys from a JSON object mapping decimal depot ids to hex keys, e.g.
/// `{"731": "e3a0..."}`. The file is read on first lookup and kept.
pub struct KeyFile {
    path: PathBuf,
    keys: OnceCell<HashMap<u32, Vec<u8>>>,
}

impl KeyFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            keys: OnceCell::new(),
        }
    }

    fn load(&self) -> Result<&HashMap<u32, Vec<u8>>> {
        self.keys.get_or_try_init(|| {
            let text = std::fs::read_to_string(&self.path)?;
            parse_keys(&text)
        })
    }
}

impl DepotKeys for KeyFile {
    fn key_for(&self, depot_id: u32) -> Result<Vec<u8>> {
        self.load()?.key_for(depot_id)
    }
}

pub fn parse_keys(json: &str) -> Result<HashMap<u32, Vec<u8>>> {
    let raw: HashMap<String, String> = serde_json::from_str(json)
        .map_err(|e| DepotError::Format(format!("depot keys: {e}")))?;
    raw.into_iter()
        .map(|(id, key)| {
            let id = id
                .trim()
                .parse::<u32>()
                .map_err(|e| DepotError::Format(format!("depot id {id:?}: {e}")))?;
            let key = hex::decode(key.trim())
                .map_err(|e| DepotError::Format(format!("key for depot {id}: {e}")))?;
            Ok((id, key))
        })
        .collect()
}
