use serde::{Deserialize, Serialize};

/// Identity of one physical file described by a checksum database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumRecord {
    /// Name of the game the file belongs to.
    pub game: String,
    /// Canonical file name of the dump.
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crc: Option<String>,
    /// Lowercase hex MD5, the catalog key.
    pub md5: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl ChecksumRecord {
    pub fn new(game: impl Into<String>, file: impl Into<String>, md5: impl Into<String>) -> Self {
        Self {
            game: game.into(),
            file: file.into(),
            size: None,
            crc: None,
            md5: md5.into().to_ascii_lowercase(),
            sha1: None,
            sha256: None,
        }
    }

    /// The final path component of [`file`](Self::file).
    ///
    /// Some databases store names with directory prefixes; renames must stay
    /// inside the dump's own directory.
    pub fn file_name(&self) -> &str {
        self.file
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.file.as_str())
    }
}
