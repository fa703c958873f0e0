//! Multi-disc playlists (`.m3u`).
//!
//! A playlist is a UTF-8 text file with one disc image per line. Line order is
//! the disc order.

use camino::{Utf8Path, Utf8PathBuf};
use gvault_core::fs::{has_extension, list_dirs, list_files};
use gvault_core::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};

/// Extension used for generated playlists.
pub const PLAYLIST_EXTENSION: &str = "m3u";

/// Lazily reads playlist entries, trimming each line.
///
/// Reading the same unchanged file again yields the same sequence.
pub struct PlaylistEntries {
    lines: Lines<BufReader<File>>,
}

impl Iterator for PlaylistEntries {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines
            .next()
            .map(|line| line.map(|l| l.trim().to_string()).map_err(Error::from))
    }
}

/// Open a playlist for line-by-line reading.
pub fn playlist_entries(path: &Utf8Path) -> Result<PlaylistEntries> {
    tracing::debug!("Reading playlist {}", path);
    let file = File::open(path.as_std_path())?;
    Ok(PlaylistEntries {
        lines: BufReader::new(file).lines(),
    })
}

/// Read every entry of a playlist.
pub fn read_playlist(path: &Utf8Path) -> Result<Vec<String>> {
    playlist_entries(path)?.collect()
}

/// Overwrite `path` with one entry per line.
///
/// Entries are written verbatim, but readers trim every line, so leading and
/// trailing whitespace does not survive a round trip through [`read_playlist`].
pub fn write_playlist<S: AsRef<str>>(path: &Utf8Path, entries: &[S]) -> Result<()> {
    tracing::debug!("Writing playlist {}", path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent.as_std_path())?;
    }

    let mut writer = BufWriter::new(File::create(path.as_std_path())?);
    for entry in entries {
        writeln!(writer, "{}", entry.as_ref())?;
    }
    writer.flush()?;
    Ok(())
}

/// Options for [`generate_playlist`].
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// File name suffixes to include, e.g. `".chd"`.
    pub extensions: Vec<String>,
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Write bare file names instead of full paths.
    pub ends_only: bool,
}

impl GenerateOptions {
    pub fn new<S: Into<String>>(extensions: impl IntoIterator<Item = S>) -> Self {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn ends_only(mut self, ends_only: bool) -> Self {
        self.ends_only = ends_only;
        self
    }
}

/// List matching files of `source_dir` into a playlist at `output`.
///
/// Returns the entries written, in file-name order.
pub fn generate_playlist(
    source_dir: &Utf8Path,
    output: &Utf8Path,
    options: &GenerateOptions,
) -> Result<Vec<String>> {
    let entries: Vec<String> = list_files(source_dir, options.recursive)?
        .into_iter()
        .filter(|path| has_extension(path, &options.extensions))
        .map(|path| match (options.ends_only, path.file_name()) {
            (true, Some(name)) => name.to_string(),
            _ => path.into_string(),
        })
        .collect();

    write_playlist(output, &entries)?;
    tracing::info!("Wrote {} entries to {}", entries.len(), output);
    Ok(entries)
}

/// Write `<dir>/<dir name>.m3u` for every immediate subdirectory of
/// `source_dir` that directly contains a matching file.
///
/// Entries are bare file names. Subdirectories without matches are skipped.
/// Returns the playlists written.
pub fn generate_local_playlists<S: AsRef<str>>(
    source_dir: &Utf8Path,
    extensions: &[S],
) -> Result<Vec<Utf8PathBuf>> {
    let options = GenerateOptions::new(extensions.iter().map(|e| e.as_ref().to_string()))
        .ends_only(true);

    let mut written = Vec::new();
    for dir in list_dirs(source_dir)? {
        let has_match = list_files(&dir, false)?
            .iter()
            .any(|path| has_extension(path, &options.extensions));
        if !has_match {
            continue;
        }

        let Some(name) = dir.file_name() else {
            continue;
        };
        let output = dir.join(format!("{}.{}", name, PLAYLIST_EXTENSION));
        generate_playlist(&dir, &output, &options)?;
        written.push(output);
    }
    Ok(written)
}
