//! Archive collaborators: 7-Zip extraction and in-process ZIP packing.

use crate::error::Result;
use crate::process::Toolbox;
use crate::tools::Tool;
use camino::Utf8Path;
use std::fs::File;
use std::io::{Seek, Write};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Extract any archive 7-Zip understands into `dir`.
pub fn extract_archive(toolbox: &Toolbox, archive: &Utf8Path, dir: &Utf8Path) -> Result<()> {
    std::fs::create_dir_all(dir.as_std_path())?;
    tracing::info!("Extracting {} -> {}", archive, dir);
    toolbox.run(
        Tool::SevenZip,
        ["x".to_string(), "-y".to_string(), format!("-o{}", dir), archive.to_string()],
        None,
    )?;
    Ok(())
}

/// Extract the ISO-9660 file system of a disc image into `dir`.
pub fn extract_iso(toolbox: &Toolbox, iso: &Utf8Path, dir: &Utf8Path) -> Result<()> {
    std::fs::create_dir_all(dir.as_std_path())?;
    tracing::info!("Extracting ISO {} -> {}", iso, dir);
    toolbox.run(
        Tool::SevenZip,
        [
            "x".to_string(),
            "-y".to_string(),
            "-tiso".to_string(),
            format!("-o{}", dir),
            iso.to_string(),
        ],
        None,
    )?;
    Ok(())
}

/// Pack every file below `source_dir` into a deflated ZIP at `zip_path`.
///
/// Entry names are relative to `source_dir` and always use `/` separators.
pub fn zip_directory(source_dir: &Utf8Path, zip_path: &Utf8Path) -> Result<()> {
    if let Some(parent) = zip_path.parent() {
        std::fs::create_dir_all(parent.as_std_path())?;
    }
    let file = File::create(zip_path.as_std_path())?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .large_file(true);

    pack_directory(&mut zip, source_dir, &options)?;
    zip.finish()?;
    Ok(())
}

fn pack_directory<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    source_dir: &Utf8Path,
    options: &SimpleFileOptions,
) -> Result<()> {
    for entry in WalkDir::new(source_dir.as_std_path()).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative_path) = path.strip_prefix(source_dir.as_std_path()) else {
            continue;
        };
        let zip_path = relative_path.to_string_lossy().replace('\\', "/");

        zip.start_file(zip_path, *options)?;
        let mut file = File::open(path)?;
        std::io::copy(&mut file, zip)?;
    }
    Ok(())
}

/// Extract a ZIP archive into `dir` without external tools.
pub fn unzip(zip_path: &Utf8Path, dir: &Utf8Path) -> Result<()> {
    let file = File::open(zip_path.as_std_path())?;
    let mut archive = zip::ZipArchive::new(file)?;
    std::fs::create_dir_all(dir.as_std_path())?;
    archive.extract(dir.as_std_path())?;
    Ok(())
}
