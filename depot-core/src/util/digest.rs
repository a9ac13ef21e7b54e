use std::io::{Read, Result};

use sha1::{Digest, Sha1};

/// SHA-1 of everything `r` yields, read `block` bytes at a time.
pub fn sha1_reader<R: Read>(mut r: R, block: usize) -> Result<[u8; 20]> {
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; block.max(1)];
    loop {
        let n = r.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}
