//! Chunk frame decoding.
//!
//! A chunk arrives from the CDN encrypted; once the external decrypt step is
//! done we hold a compressed frame whose magic prefix names its container.
//! [`decode`] classifies the frame, decompresses it and, for the two framed
//! formats, checks the CRC32 stored in the footer against the output.

use std::fmt;

use thiserror::Error;

pub mod archive;
pub mod vsz;
pub mod vz;

/// Upper bound on a decoded chunk. Depot chunks are about 1 MiB; a declared
/// size above this is treated as a corrupt header.
pub const MAX_CHUNK_SIZE: u64 = 32 * 1024 * 1024;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FrameFormat {
    /// `VZa`: LZMA1 payload with a 10-byte footer.
    Vz,
    /// `VSZa`: Zstandard payload with a 15-byte footer.
    Vsz,
    /// Anything else: a single-entry zip container.
    Archive,
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrameFormat::Vz => "VZ",
            FrameFormat::Vsz => "VSZ",
            FrameFormat::Archive => "archive",
        })
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("{format} frame too short: {len} bytes, need at least {need}")]
    Truncated {
        format: FrameFormat,
        len: usize,
        need: usize,
    },

    #[error("{format} frame declares {size} bytes, limit is {limit}")]
    Oversized {
        format: FrameFormat,
        size: u64,
        limit: u64,
    },

    #[error("CRC32 mismatch: stored {expected:#010x}, computed {actual:#010x}")]
    Checksum { expected: u32, actual: u32 },

    #[error("lzma: {0}")]
    Lzma(String),

    #[error("zstd: {0}")]
    Zstd(#[source] std::io::Error),

    #[error("archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("archive contains no entries")]
    EmptyArchive,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// True when the frame decompressed but its content failed the checksum.
    ///
    /// Damage inside an LZMA payload usually derails the decoder before the
    /// checksum is reached, so it mostly shows up as [`DecodeError::Lzma`]
    /// instead. Callers that only need "this chunk is bad" should treat any
    /// error as fatal for the chunk.
    pub fn is_integrity(&self) -> bool {
        matches!(self, DecodeError::Checksum { .. })
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;

/// A frame tagged with its container format.
#[derive(Copy, Clone, Debug)]
pub enum Frame<'a> {
    Vz(&'a [u8]),
    Vsz(&'a [u8]),
    Archive(&'a [u8]),
}

impl<'a> Frame<'a> {
    /// Sniff the magic prefix. `VZa` is tested before `VSZa`; everything else
    /// falls through to the archive container.
    pub fn classify(bytes: &'a [u8]) -> Self {
        if bytes.starts_with(vz::MAGIC) {
            Frame::Vz(bytes)
        } else if bytes.starts_with(vsz::MAGIC) {
            Frame::Vsz(bytes)
        } else {
            Frame::Archive(bytes)
        }
    }

    pub fn format(&self) -> FrameFormat {
        match self {
            Frame::Vz(_) => FrameFormat::Vz,
            Frame::Vsz(_) => FrameFormat::Vsz,
            Frame::Archive(_) => FrameFormat::Archive,
        }
    }

    pub fn decode(self) -> Result<Vec<u8>> {
        match self {
            Frame::Vz(b) => vz::decode(b),
            Frame::Vsz(b) => vsz::decode(b),
            Frame::Archive(b) => archive::decode(b),
        }
    }
}

/// Decode one compressed frame into its plaintext bytes.
pub fn decode(frame: &[u8]) -> Result<Vec<u8>> {
    Frame::classify(frame).decode()
}

/// Footer fields shared by the two framed formats.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Footer {
    pub crc32: u32,
    pub size: u32,
}

impl Footer {
    /// Read `crc32` and `size` as little-endian u32 values located `crc_back`
    /// and `size_back` bytes before the end of the frame. A size above
    /// [`MAX_CHUNK_SIZE`] is rejected before anything is allocated for it.
    pub(crate) fn read(
        format: FrameFormat,
        frame: &[u8],
        crc_back: usize,
        size_back: usize,
    ) -> Result<Self> {
        let n = frame.len();
        let footer = Footer {
            crc32: le32(&frame[n - crc_back..n - crc_back + 4]),
            size: le32(&frame[n - size_back..n - size_back + 4]),
        };
        ensure_size(format, u64::from(footer.size))?;
        Ok(footer)
    }

    /// Fit `out` to the declared size and check its CRC32.
    pub(crate) fn verify(&self, mut out: Vec<u8>) -> Result<Vec<u8>> {
        out.resize(self.size as usize, 0);
        let actual = crc32fast::hash(&out);
        if actual != self.crc32 {
            return Err(DecodeError::Checksum {
                expected: self.crc32,
                actual,
            });
        }
        Ok(out)
    }
}

pub(crate) fn ensure_len(format: FrameFormat, frame: &[u8], need: usize) -> Result<()> {
    if frame.len() < need {
        return Err(DecodeError::Truncated {
            format,
            len: frame.len(),
            need,
        });
    }
    Ok(())
}

pub(crate) fn ensure_size(format: FrameFormat, size: u64) -> Result<()> {
    if size > MAX_CHUNK_SIZE {
        return Err(DecodeError::Oversized {
            format,
            size,
            limit: MAX_CHUNK_SIZE,
        });
    }
    Ok(())
}

#[inline]
fn le32(x: &[u8]) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(x);
    u32::from_le_bytes(b)
}
