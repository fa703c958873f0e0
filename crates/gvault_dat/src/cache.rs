//! Flat cache file for fast catalog reloads.
//!
//! Parsing a directory full of DAT files is slow, so a merged catalog can be
//! exported once and imported on later runs:
//!
//! ```json
//! { "version": 1, "records": [ { "game": "...", "file": "...", "md5": "..." } ] }
//! ```

use crate::catalog::HashCatalog;
use crate::error::{DatError, Result};
use crate::record::ChecksumRecord;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

/// Current cache file format version.
pub const CACHE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    records: Vec<ChecksumRecord>,
}

impl HashCatalog {
    /// Write the whole catalog to `path`, records sorted by MD5.
    ///
    /// Creates parent directories if needed.
    pub fn export_cache(&self, path: &Utf8Path) -> Result<()> {
        let mut records: Vec<ChecksumRecord> = self.records().cloned().collect();
        records.sort_by(|a, b| a.md5.cmp(&b.md5));

        let cache = CacheFile {
            version: CACHE_VERSION,
            records,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent.as_std_path())?;
        }
        let contents = serde_json::to_string_pretty(&cache)?;
        std::fs::write(path.as_std_path(), contents)?;

        tracing::info!("Exported {} records to {}", cache.records.len(), path);
        Ok(())
    }

    /// Load a catalog previously written by [`export_cache`](Self::export_cache).
    pub fn import_cache(path: &Utf8Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_std_path())?;
        let cache: CacheFile = serde_json::from_str(&contents)?;
        if cache.version != CACHE_VERSION {
            return Err(DatError::CacheVersion {
                found: cache.version,
                expected: CACHE_VERSION,
            });
        }

        let mut catalog = HashCatalog::new();
        for record in cache.records {
            catalog.insert(record);
        }
        tracing::info!("Loaded {} records from cache {}", catalog.len(), path);
        Ok(catalog)
    }
}
