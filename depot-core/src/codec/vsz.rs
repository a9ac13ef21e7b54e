//! `VSZa` frames: a Zstandard frame wrapped in a fixed header and footer.
//!
//! Layout: `"VSZa"`, 4 opaque header bytes, the zstd frame, then a 15-byte
//! footer holding CRC32, decompressed size and a 7-byte trailer.

use super::{DecodeError, Footer, FrameFormat, Result, ensure_len};
use std::io::Read;

pub const MAGIC: &[u8] = b"VSZa";

pub const PAYLOAD_OFF: usize = 8;
pub const FOOTER_LEN: usize = 15;
pub const CRC_BACK: usize = 15;
pub const SIZE_BACK: usize = 11;

pub const MIN_LEN: usize = PAYLOAD_OFF + FOOTER_LEN;

pub fn decode(frame: &[u8]) -> Result<Vec<u8>> {
    ensure_len(FrameFormat::Vsz, frame, MIN_LEN)?;
    let footer = Footer::read(FrameFormat::Vsz, frame, CRC_BACK, SIZE_BACK)?;

    let payload = &frame[PAYLOAD_OFF..frame.len() - FOOTER_LEN];
    let dec = zstd::stream::read::Decoder::with_buffer(payload).map_err(DecodeError::Zstd)?;
    // Anything past the declared size would be truncated anyway.
    let mut out = Vec::new();
    dec.take(u64::from(footer.size))
        .read_to_end(&mut out)
        .map_err(DecodeError::Zstd)?;

    footer.verify(out)
}
