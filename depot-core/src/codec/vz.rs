//! `VZa` frames: raw LZMA1 with an inline property block.
//!
//! Layout: `"VZa"`, 4 opaque header bytes, 5 LZMA1 property bytes
//! (lc/lp/pb byte + little-endian dictionary size), the compressed stream,
//! then a 10-byte footer of CRC32, decompressed size and a 2-byte trailer.

use super::{DecodeError, Footer, FrameFormat, Result, ensure_len};
use lzma_rs::decompress::{Options, UnpackedSize};

pub const MAGIC: &[u8] = b"VZa";

/// Start of the LZMA1 property block.
pub const PROPS_OFF: usize = 7;
/// Start of the compressed stream (end of the property block).
pub const PAYLOAD_OFF: usize = 12;
/// Bytes excluded from the end of the compressed stream.
pub const PAYLOAD_TAIL: usize = 9;
pub const CRC_BACK: usize = 10;
pub const SIZE_BACK: usize = 6;

pub const MIN_LEN: usize = PAYLOAD_OFF + CRC_BACK;

pub fn decode(frame: &[u8]) -> Result<Vec<u8>> {
    ensure_len(FrameFormat::Vz, frame, MIN_LEN)?;
    let footer = Footer::read(FrameFormat::Vz, frame, CRC_BACK, SIZE_BACK)?;

    // Property block and payload are adjacent, so the decoder reads its
    // 5-byte header straight from the frame; the size comes from the footer.
    let mut input = &frame[PROPS_OFF..frame.len() - PAYLOAD_TAIL];
    let opts = Options {
        unpacked_size: UnpackedSize::UseProvided(Some(u64::from(footer.size))),
        ..Default::default()
    };
    let mut out = Vec::new();
    lzma_rs::lzma_decompress_with_options(&mut input, &mut out, &opts)
        .map_err(|e| DecodeError::Lzma(e.to_string()))?;

    footer.verify(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lzma_rs::compress::{Options as EncOptions, UnpackedSize as EncSize};

    /// Build a VZ frame around `data`.
    pub(crate) fn frame(data: &[u8]) -> Vec<u8> {
        let mut compressed = Vec::new();
        let opts = EncOptions {
            unpacked_size: EncSize::SkipWritingToHeader,
        };
        lzma_rs::lzma_compress_with_options(&mut &data[..], &mut compressed, &opts).unwrap();

        let mut f = MAGIC.to_vec();
        f.extend_from_slice(&[0x5a, 0x17, 0x00, 0x00]);
        // compressed starts with the 5 property bytes, landing at [7:12)
        f.extend_from_slice(&compressed);
        f.extend_from_slice(&crc32fast::hash(data).to_le_bytes());
        f.extend_from_slice(&(data.len() as u32).to_le_bytes());
        f.extend_from_slice(b"zv");
        f
    }

    #[test]
    fn decodes_hello_world() {
        let f = frame(b"hello world");
        assert_eq!(decode(&f).unwrap(), b"hello world");
        assert_eq!(crate::codec::decode(&f).unwrap(), b"hello world");
    }

    #[test]
    fn decodes_larger_payload() {
        let data: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        let out = decode(&frame(&data)).unwrap();
        assert_eq!(out.len(), data.len());
        assert_eq!(out, data);
    }

    #[test]
    fn stored_checksum_mismatch_is_integrity_error() {
        let mut f = frame(b"hello world");
        let n = f.len();
        f[n - CRC_BACK] ^= 0x01;
        let err = decode(&f).unwrap_err();
        assert!(err.is_integrity(), "{err}");
    }

    #[test]
    fn corrupted_payload_fails() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let mut f = frame(data);
        f[PAYLOAD_OFF + 3] ^= 0x10;
        let err = decode(&f).unwrap_err();
        assert!(
            matches!(err, DecodeError::Lzma(_) | DecodeError::Checksum { .. }),
            "{err}"
        );
    }

    #[test]
    fn huge_declared_size_is_rejected_without_allocating() {
        let mut f = frame(b"tiny");
        let n = f.len();
        f[n - SIZE_BACK..n - SIZE_BACK + 4].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        assert!(matches!(
            decode(&f).unwrap_err(),
            DecodeError::Oversized {
                format: FrameFormat::Vz,
                ..
            }
        ));
    }

    #[test]
    fn short_frame_is_structural_error() {
        let err = decode(b"VZa\0\0\0\0").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Truncated {
                format: FrameFormat::Vz,
                len: 7,
                ..
            }
        ));
    }
}
