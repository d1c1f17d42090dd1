use std::fs::File;
use std::io::Read;
use std::path::Path;

use md5::Md5;
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

/// MD5 of a file's raw bytes, uppercase hex.
pub fn md5_checksum(path: &Path) -> Result<String> {
    hash_file::<Md5>(path)
}

/// SHA1 of a file's raw bytes, uppercase hex.
pub fn sha1_checksum(path: &Path) -> Result<String> {
    hash_file::<Sha1>(path)
}

fn hash_file<D: Digest>(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .map_err(|e| Error::Checksum(format!("{}: {}", path.display(), e)))?;
    let mut hasher = D::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| Error::Checksum(format!("{}: {}", path.display(), e)))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode_upper(hasher.finalize()))
}
