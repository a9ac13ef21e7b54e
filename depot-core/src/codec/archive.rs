//! Fallback container: a zip archive holding one entry.
//!
//! The entry bytes are returned as-is; whatever checks the zip reader applies
//! internally are the only integrity guarantee on this path.

use super::{DecodeError, FrameFormat, Result, ensure_size};
use std::io::{Cursor, Read};

pub fn decode(frame: &[u8]) -> Result<Vec<u8>> {
    let mut zip = zip::ZipArchive::new(Cursor::new(frame))?;
    if zip.is_empty() {
        return Err(DecodeError::EmptyArchive);
    }
    let mut entry = zip.by_index(0)?;
    ensure_size(FrameFormat::Archive, entry.size())?;
    let mut out = Vec::new();
    entry.read_to_end(&mut out)?;
    Ok(out)
}
