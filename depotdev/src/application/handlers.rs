use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use depot_core::error::{DepotError, Result};
use depot_core::local::{DirChunkSource, JsonManifest};
use depot_core::{
    ChunkCache, ChunkLoader, DepotKeys, FailureReport, KeyFile, Manifest, MaterializeOptions,
    Materializer, decode,
};
use tracing::info;

pub fn handle_decode(frame: PathBuf, out: PathBuf) -> Result<()> {
    let raw = std::fs::read(&frame)?;
    let data = decode(&raw)?;
    std::fs::write(&out, &data)?;
    info!(frame = %frame.display(), bytes = data.len(), "decoded");
    Ok(())
}

pub fn handle_download(
    manifests: Vec<PathBuf>,
    chunks: PathBuf,
    dest: PathBuf,
    concurrency: usize,
    keys: Option<PathBuf>,
    no_cache: bool,
) -> Result<()> {
    let mut loader = ChunkLoader::new(Arc::new(DirChunkSource::new(chunks)));
    if !no_cache {
        loader = loader.with_cache(Arc::new(ChunkCache::new()));
    }

    let manifests = manifests
        .iter()
        .map(|p| Ok(Box::new(JsonManifest::open(p, loader.clone())?) as Box<dyn Manifest>))
        .collect::<Result<Vec<_>>>()?;

    let keys: Box<dyn DepotKeys> = match keys {
        Some(path) => Box::new(KeyFile::new(path)),
        None => Box::new(HashMap::<u32, Vec<u8>>::new()),
    };

    let materializer = Materializer::new(MaterializeOptions {
        concurrency,
        ..Default::default()
    });
    let report = materializer.download_manifests(manifests, keys.as_ref(), &dest)?;
    finish(report)
}

fn finish(report: FailureReport) -> Result<()> {
    println!("{report}");
    if report.is_success() {
        Ok(())
    } else {
        Err(DepotError::Incomplete {
            failed: report.failed().len(),
            attempted: report.attempted(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn vsz_frame(data: &[u8]) -> Vec<u8> {
        let mut f = b"VSZa\0\0\0\0".to_vec();
        f.extend_from_slice(&zstd::stream::encode_all(data, 3).unwrap());
        f.extend_from_slice(&crc32fast::hash(data).to_le_bytes());
        f.extend_from_slice(&(data.len() as u32).to_le_bytes());
        f.extend_from_slice(b"\0\0\0\0zsv");
        f
    }

    #[test]
    fn decode_writes_payload() {
        let dir = tempfile::tempdir().unwrap();
        let frame = dir.path().join("chunk");
        let out = dir.path().join("out.bin");
        fs::write(&frame, vsz_frame(b"payload bytes")).unwrap();
        handle_decode(frame, out.clone()).unwrap();
        assert_eq!(fs::read(out).unwrap(), b"payload bytes");
    }

    #[test]
    fn decode_rejects_bad_crc() {
        let dir = tempfile::tempdir().unwrap();
        let frame = dir.path().join("chunk");
        let mut raw = vsz_frame(b"payload bytes");
        let n = raw.len();
        raw[n - 14] ^= 0x40;
        fs::write(&frame, raw).unwrap();
        let err = handle_decode(frame, dir.path().join("out")).unwrap_err();
        assert!(matches!(err, DepotError::Decode(e) if e.is_integrity()));
    }

    #[test]
    fn download_reports_failures_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let chunks = dir.path().join("chunks");
        let src = DirChunkSource::new(&chunks);
        let id = "0101010101010101010101010101010101010101";
        src.write_frame(5, id.parse().unwrap(), &vsz_frame(b"hello"))
            .unwrap();

        let manifest = dir.path().join("5.json");
        fs::write(
            &manifest,
            format!(
                r#"{{"depot_id": 5, "files": [
                    {{"filename": "ok.txt", "size": 5,
                      "sha_content": "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d",
                      "chunks": [{{"id": "{id}", "offset": 0, "length": 5}}]}},
                    {{"filename": "missing.txt", "size": 3,
                      "sha_content": "0000000000000000000000000000000000000000",
                      "chunks": [{{"id": "{}", "offset": 0, "length": 3}}]}}
                ]}}"#,
                "02".repeat(20)
            ),
        )
        .unwrap();

        let dest = dir.path().join("out");
        let res = handle_download(vec![manifest], chunks, dest.clone(), 2, None, false);
        assert!(matches!(
            res,
            Err(DepotError::Incomplete {
                failed: 1,
                attempted: 2
            })
        ));
        assert_eq!(fs::read(dest.join("ok.txt")).unwrap(), b"hello");
    }
}
