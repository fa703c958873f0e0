//! Content hashing for file identification.

use crate::error::Result;
use camino::Utf8Path;
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{BufReader, Read};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Compute the lowercase hex MD5 digest of a file, streaming its content.
pub fn md5_file(path: &Utf8Path) -> Result<String> {
    let file = File::open(path.as_std_path())?;
    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the lowercase hex MD5 digest of an in-memory buffer.
pub fn md5_bytes(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn test_md5_known_values() {
        assert_eq!(md5_bytes(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_bytes(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_md5_file_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("dump.bin")).unwrap();
        let data = vec![0x5Au8; READ_BUFFER_SIZE * 2 + 17];
        std::fs::write(&path, &data).unwrap();

        assert_eq!(md5_file(&path).unwrap(), md5_bytes(&data));
    }
}
