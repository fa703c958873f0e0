//! In-memory checksum catalog.

use crate::error::{DatError, Result};
use crate::parser::parse_dat_file;
use crate::record::ChecksumRecord;
use camino::{Utf8Path, Utf8PathBuf};
use gvault_core::fs::{has_extension_ignore_case, list_files};
use gvault_core::hash::md5_file;
use std::collections::HashMap;

/// File extensions recognized as checksum databases.
pub const DAT_EXTENSIONS: &[&str] = &[".dat", ".xml"];

/// How import failures are handled.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Abort on the first malformed record or unreadable document instead of
    /// skipping it.
    pub strict: bool,
}

/// Counters reported by an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Documents successfully read.
    pub files: usize,
    /// Records inserted (including ones replacing an earlier record).
    pub records: usize,
    /// Malformed records skipped.
    pub skipped_records: usize,
    /// Documents that could not be parsed and were skipped.
    pub failed_files: Vec<Utf8PathBuf>,
}

impl ImportSummary {
    fn merge(&mut self, other: ImportSummary) {
        self.files += other.files;
        self.records += other.records;
        self.skipped_records += other.skipped_records;
        self.failed_files.extend(other.failed_files);
    }
}

/// Outcome of [`HashCatalog::rename_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameReport {
    /// `(old, new)` paths of files that were renamed.
    pub renamed: Vec<(Utf8PathBuf, Utf8PathBuf)>,
    /// Matched files that already carry their canonical name.
    pub already_named: Vec<Utf8PathBuf>,
    /// Files whose digest is not in the catalog.
    pub unmatched: Vec<Utf8PathBuf>,
    /// Matched files left alone because the canonical name is taken by another file.
    pub collisions: Vec<Utf8PathBuf>,
}

/// Mapping from lowercase MD5 digest to the record describing that content.
///
/// Later inserts with the same digest replace earlier ones.
#[derive(Debug, Clone, Default)]
pub struct HashCatalog {
    records: HashMap<String, ChecksumRecord>,
}

impl HashCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from every DAT file below `dir`.
    pub fn from_directory(dir: &Utf8Path, options: ImportOptions) -> Result<Self> {
        let mut catalog = Self::new();
        catalog.import_directory(dir, options)?;
        Ok(catalog)
    }

    /// Insert a record, returning the one it replaced.
    pub fn insert(&mut self, mut record: ChecksumRecord) -> Option<ChecksumRecord> {
        record.md5 = record.md5.to_ascii_lowercase();
        self.records.insert(record.md5.clone(), record)
    }

    /// Look up a digest. Absence just means the content is unknown.
    pub fn lookup(&self, md5: &str) -> Option<&ChecksumRecord> {
        match self.records.get(md5) {
            Some(record) => Some(record),
            None => self.records.get(&md5.to_ascii_lowercase()),
        }
    }

    pub fn contains(&self, md5: &str) -> bool {
        self.lookup(md5).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &ChecksumRecord> {
        self.records.values()
    }

    /// Import a single DAT document.
    ///
    /// A document that cannot be parsed is always an error. Malformed records
    /// are skipped unless `options.strict` is set.
    pub fn import_file(&mut self, path: &Utf8Path, options: ImportOptions) -> Result<ImportSummary> {
        tracing::info!("Importing DAT file {}", path);
        let mut parsed = parse_dat_file(path)?;

        if options.strict && !parsed.malformed.is_empty() {
            return Err(parsed.malformed.swap_remove(0));
        }

        let mut summary = ImportSummary {
            files: 1,
            skipped_records: parsed.malformed.len(),
            ..Default::default()
        };
        for record in parsed.records {
            if let Some(previous) = self.insert(record) {
                tracing::debug!("Replaced record for {} ({})", previous.md5, previous.file);
            }
            summary.records += 1;
        }
        Ok(summary)
    }

    /// Import every DAT document below `dir`, in file-name order.
    ///
    /// Without `options.strict`, unreadable documents are reported in
    /// [`ImportSummary::failed_files`] and skipped.
    pub fn import_directory(&mut self, dir: &Utf8Path, options: ImportOptions) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();

        for path in list_files(dir, true)? {
            if !has_extension_ignore_case(&path, DAT_EXTENSIONS) {
                continue;
            }

            match self.import_file(&path, options) {
                Ok(file_summary) => summary.merge(file_summary),
                Err(e) if !options.strict => {
                    tracing::warn!("Unable to import DAT file {}: {}", path, e);
                    summary.failed_files.push(path);
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "Imported {} records from {} DAT files ({} catalog entries)",
            summary.records,
            summary.files,
            self.len()
        );
        Ok(summary)
    }

    /// Rename every file under `root` whose MD5 is in the catalog to the
    /// record's canonical file name, inside the file's own directory.
    ///
    /// Running this twice changes nothing the second time. Existing files are
    /// never overwritten. Renames that depend on each other (`a -> b` while
    /// `b -> c`) are applied in dependency order. A file whose target stays
    /// occupied is reported as a collision.
    pub fn rename_files(&self, root: &Utf8Path) -> Result<RenameReport> {
        if !root.is_dir() {
            return Err(DatError::Core(gvault_core::Error::precondition(format!(
                "Input directory '{}' does not exist",
                root
            ))));
        }

        tracing::info!("Renaming files in {} according to imported DATs", root);
        let mut report = RenameReport::default();

        // Hash a snapshot first so renamed files are not visited again
        let mut pending = Vec::new();
        for path in list_files(root, true)? {
            tracing::debug!("Examining {}", path);
            let md5 = md5_file(&path)?;
            let Some(record) = self.lookup(&md5) else {
                report.unmatched.push(path);
                continue;
            };

            let target = match path.parent() {
                Some(dir) => dir.join(record.file_name()),
                None => Utf8PathBuf::from(record.file_name()),
            };
            if target == path {
                report.already_named.push(path);
            } else {
                pending.push((path, target));
            }
        }

        // Each pass frees the names the next one may need
        loop {
            let mut blocked = Vec::new();
            let mut progressed = false;
            for (path, target) in pending {
                if target.exists() {
                    blocked.push((path, target));
                    continue;
                }
                std::fs::rename(path.as_std_path(), target.as_std_path())?;
                tracing::info!("Renamed {} -> {}", path, target);
                report.renamed.push((path, target));
                progressed = true;
            }
            pending = blocked;
            if !progressed || pending.is_empty() {
                break;
            }
        }

        for (path, target) in pending {
            tracing::warn!("Not renaming {}: {} already exists", path, target);
            report.collisions.push(path);
        }
        Ok(report)
    }
}
