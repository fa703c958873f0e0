//! Error types for catalog operations.

use camino::Utf8PathBuf;
use gvault_core::ErrorKind;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DatError>;

#[derive(Error, Debug)]
pub enum DatError {
    #[error(transparent)]
    Core(#[from] gvault_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The DAT document is not well-formed XML.
    #[error("Failed to parse DAT file {path}: {source}")]
    Xml {
        path: Utf8PathBuf,
        #[source]
        source: quick_xml::Error,
    },

    /// A single `<rom>` entry is missing a required attribute or has a bad value.
    #[error("Malformed record in '{game}': {reason}")]
    MalformedRecord { game: String, reason: String },

    /// Reading or writing the cache file failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The cache file was written by an incompatible version.
    #[error("Unsupported cache version {found} (expected {expected})")]
    CacheVersion { found: u32, expected: u32 },
}

impl DatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DatError::Core(e) => e.kind(),
            DatError::Io(_) => ErrorKind::Io,
            DatError::Xml { .. }
            | DatError::MalformedRecord { .. }
            | DatError::Json(_)
            | DatError::CacheVersion { .. } => ErrorKind::Parse,
        }
    }
}
