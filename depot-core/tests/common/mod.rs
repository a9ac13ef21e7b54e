#![allow(dead_code)]

use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::time::Duration;

use depot_core::{DepotFile, EntryKind};
use sha1::{Digest, Sha1};

pub fn sha1(data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
}

pub fn sha1_file(path: &Path) -> [u8; 20] {
    sha1(&std::fs::read(path).unwrap())
}

pub fn content(seed: u8, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

/// Build a `VSZa` frame around `data`.
pub fn vsz_frame(data: &[u8]) -> Vec<u8> {
    let mut f = b"VSZa\0\0\0\0".to_vec();
    f.extend_from_slice(&zstd::stream::encode_all(data, 3).unwrap());
    f.extend_from_slice(&crc32fast::hash(data).to_le_bytes());
    f.extend_from_slice(&(data.len() as u32).to_le_bytes());
    f.extend_from_slice(b"\0\0\0\0zsv");
    f
}

/// Counts reads in progress across files and remembers the highest count.
#[derive(Default)]
pub struct InFlight {
    now: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.now.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.now.fetch_sub(1, Ordering::SeqCst);
    }
}

enum Behavior {
    Serve,
    /// Every read fails.
    Fail,
    /// First read waits for a signal (or times out) and then fails.
    FailAfter(std::sync::mpsc::Receiver<()>),
    /// Any read is a test failure.
    Forbid,
}

/// In-memory file handle with hooks for failure injection.
pub struct MemFile {
    name: String,
    data: Vec<u8>,
    hash: [u8; 20],
    kind: EntryKind,
    pos: u64,
    behavior: Behavior,
    served: Arc<AtomicU64>,
    on_eof: Option<Sender<()>>,
    in_flight: Option<Arc<InFlight>>,
}

impl MemFile {
    pub fn new(name: &str, data: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            hash: sha1(&data),
            data,
            kind: EntryKind::File,
            pos: 0,
            behavior: Behavior::Serve,
            served: Arc::new(AtomicU64::new(0)),
            on_eof: None,
            in_flight: None,
        }
    }

    pub fn directory(name: &str) -> Self {
        let mut f = Self::new(name, Vec::new());
        f.kind = EntryKind::Directory;
        f.behavior = Behavior::Forbid;
        f
    }

    pub fn failing(mut self) -> Self {
        self.behavior = Behavior::Fail;
        self
    }

    pub fn failing_after(mut self, rx: std::sync::mpsc::Receiver<()>) -> Self {
        self.behavior = Behavior::FailAfter(rx);
        self
    }

    pub fn forbid_reads(mut self) -> Self {
        self.behavior = Behavior::Forbid;
        self
    }

    pub fn signal_eof(mut self, tx: Sender<()>) -> Self {
        self.on_eof = Some(tx);
        self
    }

    /// Every read registers with `gauge` and holds it for a few milliseconds.
    pub fn tracked(mut self, gauge: Arc<InFlight>) -> Self {
        self.in_flight = Some(gauge);
        self
    }

    /// Bytes handed out by `read`, shared with the caller.
    pub fn served(&self) -> Arc<AtomicU64> {
        self.served.clone()
    }

    pub fn boxed(self) -> Box<dyn DepotFile> {
        Box::new(self)
    }
}

impl Read for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &self.behavior {
            Behavior::Serve => {}
            Behavior::Fail => return Err(io::Error::other("chunk fetch failed")),
            Behavior::FailAfter(rx) => {
                let _ = rx.recv_timeout(Duration::from_secs(10));
                return Err(io::Error::other("chunk fetch failed"));
            }
            Behavior::Forbid => panic!("{} must not be read", self.name),
        }
        if let Some(g) = &self.in_flight {
            g.enter();
            std::thread::sleep(Duration::from_millis(15));
            g.leave();
        }
        let start = self.pos as usize;
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.pos += n as u64;
        self.served.fetch_add(n as u64, Ordering::SeqCst);
        if n == 0 {
            if let Some(tx) = self.on_eof.take() {
                let _ = tx.send(());
            }
        }
        Ok(n)
    }
}

impl DepotFile for MemFile {
    fn filename(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    fn content_hash(&self) -> &[u8; 20] {
        &self.hash
    }

    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.pos = offset.min(self.data.len() as u64);
        Ok(())
    }
}
