//! Resumable, parallel download of depot files onto local disk.
//!
//! Each file runs as an independent task on a bounded rayon pool:
//!
//! * missing locally: stream the whole file into a new file;
//! * shorter than declared: seek the source to the local length and append
//!   the rest (the existing prefix is trusted, not re-hashed);
//! * otherwise: hash the local file and compare against the manifest.
//!
//! A failing task only adds its filename to the report; siblings keep going.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{DepotError, Result};
use crate::file::DepotFile;
use crate::keys::DepotKeys;
use crate::manifest::Manifest;
use crate::report::FailureReport;
use crate::util::digest::sha1_reader;
use crate::util::sanitize::safe_join;

pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_BLOCK_SIZE: usize = 16 * 1024;

#[derive(Clone, Debug)]
pub struct MaterializeOptions {
    /// Files processed at once; also bounds open handles and in-flight reads.
    pub concurrency: usize,
    /// Read/write/hash granularity.
    pub block_size: usize,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// What happened to a file that did not fail.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Downloaded { bytes: u64 },
    Resumed { from: u64, bytes: u64 },
    Verified,
}

#[derive(Clone, Debug, Default)]
pub struct Materializer {
    opts: MaterializeOptions,
}

impl Materializer {
    pub fn new(opts: MaterializeOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &MaterializeOptions {
        &self.opts
    }

    /// Decrypt filenames where needed, then materialize every regular file of
    /// every manifest under `dest`.
    ///
    /// Filename decryption runs per manifest on the calling thread before any
    /// download starts; a missing key aborts the whole call.
    pub fn download_manifests(
        &self,
        manifests: Vec<Box<dyn Manifest>>,
        keys: &dyn DepotKeys,
        dest: &Path,
    ) -> Result<FailureReport> {
        let mut files = Vec::new();
        for mut manifest in manifests {
            if manifest.filenames_encrypted() {
                let depot_id = manifest.depot_id();
                let key = keys.key_for(depot_id)?;
                manifest.decrypt_filenames(&key)?;
                debug!(depot_id, "decrypted manifest filenames");
            }
            files.extend(manifest.into_files());
        }
        self.materialize(files, dest)
    }

    /// Run the per-file algorithm for every regular file in `files` and wait
    /// for all of them. Directory and symlink entries are skipped.
    ///
    /// Only pool setup or failing to create `dest` is returned as `Err`;
    /// per-file problems end up in the report.
    pub fn materialize(
        &self,
        files: Vec<Box<dyn DepotFile>>,
        dest: &Path,
    ) -> Result<FailureReport> {
        fs::create_dir_all(dest)?;

        let files: Vec<_> = files
            .into_iter()
            .filter(|f| {
                let keep = f.is_file();
                if !keep {
                    debug!(file = f.filename(), "skipping non-file entry");
                }
                keep
            })
            .collect();
        let attempted = files.len();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.opts.concurrency.max(1))
            .thread_name(|i| format!("depot-dl-{i}"))
            .build()
            .map_err(|e| DepotError::Pool(e.to_string()))?;

        let failed = Mutex::new(Vec::new());
        pool.install(|| {
            files.into_par_iter().for_each(|mut file| {
                let name = file.filename().to_string();
                match self.save(file.as_mut(), dest) {
                    Ok(Outcome::Downloaded { bytes }) => {
                        info!(file = %name, bytes, "downloaded");
                    }
                    Ok(Outcome::Resumed { from, bytes }) => {
                        info!(file = %name, from, bytes, "resumed");
                    }
                    Ok(Outcome::Verified) => {
                        debug!(file = %name, "already complete, hash ok");
                    }
                    Err(e) => {
                        warn!(file = %name, error = %e, "download failed");
                        failed
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push(name);
                    }
                }
            });
        });

        let report = FailureReport {
            attempted,
            failed: failed.into_inner().unwrap_or_else(PoisonError::into_inner),
        };
        if report.is_success() {
            info!(files = attempted, "all files downloaded");
        } else {
            warn!(
                failed = report.failed.len(),
                files = attempted,
                "some files failed"
            );
        }
        Ok(report)
    }

    /// Materialize a single file. This is one task's body.
    pub fn save(&self, file: &mut dyn DepotFile, dest: &Path) -> Result<Outcome> {
        let local = safe_join(dest, file.filename())?;
        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent)?;
        }

        let declared = file.size();
        let local_len = match fs::metadata(&local) {
            Ok(md) => Some(md.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        match local_len {
            None => {
                let mut out = File::create(&local)?;
                let bytes = self.copy_blocks(file, &mut out, declared)?;
                if bytes < declared {
                    warn!(
                        file = file.filename(),
                        bytes, declared, "source ended before declared size"
                    );
                }
                Ok(Outcome::Downloaded { bytes })
            }
            Some(from) if from < declared => {
                file.seek_to(from)?;
                let mut out = OpenOptions::new().append(true).open(&local)?;
                let bytes = self.copy_blocks(file, &mut out, declared - from)?;
                Ok(Outcome::Resumed { from, bytes })
            }
            Some(_) => {
                let actual = sha1_reader(File::open(&local)?, self.opts.block_size)?;
                let expected = file.content_hash();
                if &actual != expected {
                    return Err(DepotError::ContentHash {
                        path: local.display().to_string(),
                        expected: hex::encode(expected),
                        actual: hex::encode(actual),
                    });
                }
                Ok(Outcome::Verified)
            }
        }
    }

    /// Copy at most `limit` bytes from `src` to `out`, in order, one block at
    /// a time. Stops early if `src` runs dry.
    fn copy_blocks(&self, src: &mut dyn DepotFile, out: &mut File, limit: u64) -> Result<u64> {
        let mut buf = vec![0u8; self.opts.block_size.max(1)];
        let mut written = 0u64;
        while written < limit {
            let want = usize::try_from(limit - written).map_or(buf.len(), |r| r.min(buf.len()));
            let n = src.read(&mut buf[..want])?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n])?;
            written += n as u64;
        }
        out.flush()?;
        Ok(written)
    }
}

/// Materialize `files` under `dest` with `concurrency` parallel tasks and the
/// default block size.
pub fn materialize(
    files: Vec<Box<dyn DepotFile>>,
    dest: &Path,
    concurrency: usize,
) -> Result<FailureReport> {
    Materializer::new(MaterializeOptions {
        concurrency,
        ..Default::default()
    })
    .materialize(files, dest)
}
