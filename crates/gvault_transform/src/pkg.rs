//! PlayStation Network package headers.

use byteorder::{BigEndian, ReadBytesExt};
use camino::Utf8Path;
use gvault_core::Result;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

/// `\x7FPKG`
pub const PKG_MAGIC: u32 = 0x7F50_4B47;
const CONTENT_ID_OFFSET: u64 = 0x30;
const CONTENT_ID_LEN: usize = 36;

/// Read the content ID (e.g. `UP0001-NPUB30001_00-0000000000000001`) from a
/// package header.
///
/// Returns `None` if the file is missing, too short, not a package, or the ID
/// holds anything besides ASCII letters, digits, `-` and `_`.
pub fn read_content_id(pkg: &Utf8Path) -> Result<Option<String>> {
    let mut file = match File::open(pkg.as_std_path()) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let magic = match file.read_u32::<BigEndian>() {
        Ok(magic) => magic,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if magic != PKG_MAGIC {
        tracing::debug!("{} is not a PKG file", pkg);
        return Ok(None);
    }

    file.seek(SeekFrom::Start(CONTENT_ID_OFFSET))?;
    let mut content_id = [0u8; CONTENT_ID_LEN];
    if let Err(e) = file.read_exact(&mut content_id) {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Ok(None);
        }
        return Err(e.into());
    }

    let end = content_id
        .iter()
        .position(|b| *b == 0)
        .unwrap_or(CONTENT_ID_LEN);
    let content_id = &content_id[..end];
    if !is_valid_content_id(content_id) {
        tracing::warn!("Ignoring malformed content ID in {}", pkg);
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(content_id).into_owned()))
}

/// Content IDs are used as file names, so only plain ID characters pass.
fn is_valid_content_id(id: &[u8]) -> bool {
    !id.is_empty()
        && id
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || *b == b'-' || *b == b'_')
}

/// Build a minimal package header carrying `content_id`. Test fixture helper.
#[cfg(test)]
pub(crate) fn fake_pkg(content_id: &str) -> Vec<u8> {
    let mut data = vec![0u8; 0x80];
    data[..4].copy_from_slice(&PKG_MAGIC.to_be_bytes());
    let offset = CONTENT_ID_OFFSET as usize;
    data[offset..offset + content_id.len()].copy_from_slice(content_id.as_bytes());
    data
}
