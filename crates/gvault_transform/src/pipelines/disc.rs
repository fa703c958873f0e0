//! Disc image normalization shared by the disc-based pipelines.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use gvault_core::fs::{has_extension, replace_suffix};
use gvault_core::{Error, Result};
use gvault_disc::{read_playlist, write_playlist, ChdManager};
use std::collections::HashSet;

const CHD: &str = ".chd";
const ISO: &str = ".iso";
const TOC: &str = ".toc";
const M3U: &str = ".m3u";

/// Turn a `.chd`, `.iso` or `.m3u` source into raw ISO images inside `out_dir`.
///
/// - `.chd`: extracted to `<stem>.iso` plus `<stem>.toc`
/// - `.iso`: copied as is, so later in-place rewrites never touch the source
/// - `.m3u`: every listed disc is handled as above and the playlist is rewritten
///   with the local file names, `.chd` entries renamed to `.iso`
///
/// Every image lands directly in `out_dir` under its file name. Playlist
/// entries may be relative to the playlist or absolute, but never contain `..`.
/// A disc that would be written over its own source is rejected.
///
/// Returns the normalized image or playlist, or `None` for other sources.
pub fn normalize_disc_images(
    chd: &ChdManager,
    source_file: &Utf8Path,
    out_dir: &Utf8Path,
) -> Result<Option<Utf8PathBuf>> {
    let Some(file_name) = source_file.file_name() else {
        return Ok(None);
    };
    let source_dir = source_file.parent().unwrap_or(Utf8Path::new(""));
    std::fs::create_dir_all(out_dir.as_std_path())?;

    if has_extension(source_file, &[CHD, ISO]) {
        let image = normalize_entry(chd, source_dir, file_name, out_dir)?;
        return Ok(Some(image));
    }

    if has_extension(source_file, &[M3U]) {
        let mut rewritten = Vec::new();
        let mut seen = HashSet::new();
        for entry in read_playlist(source_file)? {
            if entry.is_empty() {
                continue;
            }
            if !has_extension(Utf8Path::new(&entry), &[CHD, ISO]) {
                rewritten.push(entry);
                continue;
            }

            let image = normalize_entry(chd, source_dir, &entry, out_dir)?;
            let Some(local) = image.file_name() else {
                continue;
            };
            if !seen.insert(local.to_string()) {
                return Err(Error::precondition(format!(
                    "Playlist {} lists more than one disc named '{}'",
                    source_file, local
                )));
            }
            rewritten.push(local.to_string());
        }

        let playlist = out_dir.join(file_name);
        write_playlist(&playlist, &rewritten)?;
        tracing::debug!("Rewrote playlist {} ({} discs)", playlist, rewritten.len());
        return Ok(Some(playlist));
    }

    tracing::debug!("{} is not a disc image or playlist", source_file);
    Ok(None)
}

/// Normalize one disc named `entry` into `out_dir`.
///
/// Relative entries resolve against `source_dir`.
fn normalize_entry(
    chd: &ChdManager,
    source_dir: &Utf8Path,
    entry: &str,
    out_dir: &Utf8Path,
) -> Result<Utf8PathBuf> {
    let entry_path = Utf8Path::new(entry);
    if entry_path
        .components()
        .any(|c| matches!(c, Utf8Component::ParentDir))
    {
        return Err(Error::precondition(format!(
            "Disc entry '{}' points outside its directory",
            entry
        )));
    }
    let Some(file_name) = entry_path.file_name() else {
        return Err(Error::precondition(format!("Disc entry '{}' has no file name", entry)));
    };

    let source = if entry_path.is_absolute() {
        entry_path.to_path_buf()
    } else {
        source_dir.join(entry_path)
    };
    let target = out_dir.join(file_name);

    if has_extension(&source, &[ISO]) {
        if !source.is_file() {
            return Err(Error::MissingInput(source));
        }
        ensure_distinct(&source, &target)?;
        std::fs::copy(source.as_std_path(), target.as_std_path())?;
        return Ok(target);
    }

    let iso = replace_suffix(&target, CHD, ISO);
    let toc = replace_suffix(&target, CHD, TOC);
    ensure_distinct(&source, &iso)?;
    chd.extract(&source, &iso, &toc, false)?;
    Ok(iso)
}

/// Refuse to write `target` when it is the same file as `source`.
fn ensure_distinct(source: &Utf8Path, target: &Utf8Path) -> Result<()> {
    let same = source == target
        || match (source.canonicalize_utf8(), target.canonicalize_utf8()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
    if same {
        return Err(Error::precondition(format!(
            "Refusing to overwrite source disc {}",
            source
        )));
    }
    Ok(())
}

/// Disc images referenced by a normalized image or playlist.
pub fn disc_images(normalized: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    if !has_extension(normalized, &[M3U]) {
        return Ok(vec![normalized.to_path_buf()]);
    }

    let dir = normalized.parent().unwrap_or(Utf8Path::new(""));
    Ok(read_playlist(normalized)?
        .into_iter()
        .filter(|entry| has_extension(Utf8Path::new(entry), &[ISO]))
        .map(|entry| dir.join(entry))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gvault_core::mock::{MockLocator, ScriptedRunner};
    use gvault_core::{ErrorKind, Tool, Toolbox};

    fn setup() -> (tempfile::TempDir, Utf8PathBuf, ChdManager, ScriptedRunner) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let runner = ScriptedRunner::emulating_tools();
        let chd = ChdManager::new(Toolbox::new(MockLocator::all(), runner.clone()));
        (dir, root, chd, runner)
    }

    #[test]
    fn test_single_chd() {
        let (_dir, root, chd, _) = setup();
        let source = root.join("src/Game.chd");
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(&source, b"disc").unwrap();

        let image = normalize_disc_images(&chd, &source, &root.join("out"))
            .unwrap()
            .unwrap();
        assert_eq!(image, root.join("out/Game.iso"));
        assert!(root.join("out/Game.toc").is_file());
        assert_eq!(disc_images(&image).unwrap(), vec![image]);
    }

    #[test]
    fn test_playlist_rewritten() {
        let (_dir, root, chd, runner) = setup();
        let src = root.join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("Disc1.chd"), b"one").unwrap();
        std::fs::write(src.join("Disc2.chd"), b"two").unwrap();
        std::fs::write(src.join("Game.m3u"), "Disc1.chd\nDisc2.chd\n").unwrap();

        let out = root.join("out");
        let playlist = normalize_disc_images(&chd, &src.join("Game.m3u"), &out)
            .unwrap()
            .unwrap();

        assert_eq!(playlist, out.join("Game.m3u"));
        assert_eq!(read_playlist(&playlist).unwrap(), vec!["Disc1.iso", "Disc2.iso"]);
        assert_eq!(std::fs::read(out.join("Disc2.iso")).unwrap(), b"two");
        assert_eq!(runner.calls_to(Tool::Chdman).len(), 2);
        assert_eq!(
            disc_images(&playlist).unwrap(),
            vec![out.join("Disc1.iso"), out.join("Disc2.iso")]
        );
    }

    #[test]
    fn test_raw_iso_copied() {
        let (_dir, root, chd, runner) = setup();
        let source = root.join("Game.iso");
        std::fs::write(&source, b"iso").unwrap();

        let image = normalize_disc_images(&chd, &source, &root.join("out"))
            .unwrap()
            .unwrap();
        assert_eq!(std::fs::read(&image).unwrap(), b"iso");
        assert!(source.is_file());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_playlist_with_missing_disc() {
        let (_dir, root, chd, _) = setup();
        std::fs::write(root.join("Game.m3u"), "Disc1.chd\n").unwrap();
        let err = normalize_disc_images(&chd, &root.join("Game.m3u"), &root.join("out")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingInput);
    }

    #[test]
    fn test_playlist_with_absolute_entries() {
        let (_dir, root, chd, _) = setup();
        let src = root.join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("Disc1.iso"), b"one").unwrap();
        std::fs::write(src.join("Disc2.chd"), b"two").unwrap();
        let playlist = src.join("Game.m3u");
        write_playlist(
            &playlist,
            &[src.join("Disc1.iso").into_string(), src.join("Disc2.chd").into_string()],
        )
        .unwrap();

        let out = root.join("out");
        let rewritten = normalize_disc_images(&chd, &playlist, &out).unwrap().unwrap();

        assert_eq!(read_playlist(&rewritten).unwrap(), vec!["Disc1.iso", "Disc2.iso"]);
        assert_eq!(std::fs::read(out.join("Disc1.iso")).unwrap(), b"one");
        assert_eq!(std::fs::read(out.join("Disc2.iso")).unwrap(), b"two");
        assert!(out.join("Disc2.toc").is_file());
        assert_eq!(std::fs::read(src.join("Disc1.iso")).unwrap(), b"one");
        assert!(!src.join("Disc2.iso").exists());
        assert!(!src.join("Disc2.toc").exists());
    }

    #[test]
    fn test_playlist_rejects_parent_entries() {
        let (_dir, root, chd, runner) = setup();
        let src = root.join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(root.join("Disc1.chd"), b"one").unwrap();
        std::fs::write(src.join("Game.m3u"), "../Disc1.chd\n").unwrap();

        let out = root.join("out");
        let err = normalize_disc_images(&chd, &src.join("Game.m3u"), &out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(runner.calls().is_empty());
        assert!(!root.join("Disc1.iso").exists());
    }

    #[test]
    fn test_source_inside_output_is_untouched() {
        let (_dir, root, chd, _) = setup();
        let source = root.join("Game.iso");
        std::fs::write(&source, b"iso").unwrap();

        let err = normalize_disc_images(&chd, &source, &root).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(std::fs::read(&source).unwrap(), b"iso");
    }

    #[test]
    fn test_other_sources_ignored() {
        let (_dir, root, chd, _) = setup();
        let result = normalize_disc_images(&chd, &root.join("Game.xex"), &root.join("out")).unwrap();
        assert!(result.is_none());
    }
}
