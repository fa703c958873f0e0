//! Checksum database catalog for gvault.
//!
//! Imports clrmamepro/Logiqx XML DAT files into a [`HashCatalog`] keyed by
//! MD5, and uses it to give raw dumps their canonical names:
//!
//! ```no_run
//! use camino::Utf8Path;
//! use gvault_dat::{HashCatalog, ImportOptions};
//!
//! # fn main() -> gvault_dat::Result<()> {
//! let catalog = HashCatalog::from_directory(Utf8Path::new("dats"), ImportOptions::default())?;
//! let report = catalog.rename_files(Utf8Path::new("dumps"))?;
//! println!("renamed {} files", report.renamed.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod catalog;
pub mod error;
pub mod parser;
pub mod record;

pub use cache::CACHE_VERSION;
pub use catalog::{HashCatalog, ImportOptions, ImportSummary, RenameReport, DAT_EXTENSIONS};
pub use error::{DatError, Result};
pub use parser::{parse_dat, parse_dat_file, ParsedDat};
pub use record::ChecksumRecord;
