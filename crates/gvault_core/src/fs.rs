//! Filesystem helpers shared by the pipelines.

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use walkdir::WalkDir;

/// Name of the sentinel file marking a finished extraction directory.
pub const COMPLETION_MARKER: &str = "raw_files.index";

fn to_utf8(path: std::path::PathBuf) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).map_err(Error::NonUtf8Path)
}

/// List regular files under `root`, sorted by file name within each directory.
///
/// With `recursive = false` only the immediate children are listed.
pub fn list_files(root: &Utf8Path, recursive: bool) -> Result<Vec<Utf8PathBuf>> {
    let mut walker = WalkDir::new(root.as_std_path()).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(to_utf8(entry.into_path())?);
        }
    }
    Ok(files)
}

/// List immediate subdirectories of `root`, sorted by name.
pub fn list_dirs(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(root.as_std_path())
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_dir() {
            dirs.push(to_utf8(entry.into_path())?);
        }
    }
    Ok(dirs)
}

/// Check whether the file name of `path` ends with any of `extensions`.
///
/// Extensions are matched as plain suffixes (`".chd"`, `".work.bin"`).
pub fn has_extension(path: &Utf8Path, extensions: &[impl AsRef<str>]) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    extensions.iter().any(|ext| name.ends_with(ext.as_ref()))
}

/// Case-insensitive variant of [`has_extension`].
pub fn has_extension_ignore_case(path: &Utf8Path, extensions: &[impl AsRef<str>]) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_ascii_lowercase();
    extensions
        .iter()
        .any(|ext| name.ends_with(&ext.as_ref().to_ascii_lowercase()))
}

/// Returns `true` if `dir` has no entries. A missing directory counts as empty.
pub fn is_dir_empty(dir: &Utf8Path) -> Result<bool> {
    match fs::read_dir(dir.as_std_path()) {
        Ok(mut entries) => Ok(entries.next().is_none()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e.into()),
    }
}

/// Create an empty file, creating parent directories as needed.
pub fn touch(path: &Utf8Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent.as_std_path())?;
    }
    fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path.as_std_path())?;
    Ok(())
}

/// Write the completion marker inside `dir` and return its path.
pub fn write_completion_marker(dir: &Utf8Path) -> Result<Utf8PathBuf> {
    let marker = dir.join(COMPLETION_MARKER);
    touch(&marker)?;
    Ok(marker)
}

/// Move a file or directory, falling back to copy + delete across filesystems.
pub fn move_path(src: &Utf8Path, dest: &Utf8Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent.as_std_path())?;
    }

    if fs::rename(src.as_std_path(), dest.as_std_path()).is_ok() {
        return Ok(());
    }

    tracing::debug!("Rename failed, copying {} -> {}", src, dest);
    if src.is_dir() {
        copy_dir(src, dest)?;
        fs::remove_dir_all(src.as_std_path())?;
    } else {
        fs::copy(src.as_std_path(), dest.as_std_path())?;
        fs::remove_file(src.as_std_path())?;
    }
    Ok(())
}

/// Recursively copy `src` into `dest`.
pub fn copy_dir(src: &Utf8Path, dest: &Utf8Path) -> Result<()> {
    for entry in WalkDir::new(src.as_std_path()) {
        let entry = entry?;
        let path = to_utf8(entry.path().to_path_buf())?;
        let rel = path.strip_prefix(src).unwrap_or(&path);
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(target.as_std_path())?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent.as_std_path())?;
            }
            fs::copy(path.as_std_path(), target.as_std_path())?;
        }
    }
    Ok(())
}

/// Move every entry of `src` into `dest`, merging directories.
///
/// Files already present in `dest` are replaced.
pub fn move_contents(src: &Utf8Path, dest: &Utf8Path) -> Result<()> {
    fs::create_dir_all(dest.as_std_path())?;

    for entry in fs::read_dir(src.as_std_path())? {
        let entry = entry?;
        let from = to_utf8(entry.path())?;
        let Some(name) = from.file_name() else {
            continue;
        };
        let to = dest.join(name);

        if from.is_dir() && to.is_dir() {
            move_contents(&from, &to)?;
            fs::remove_dir(from.as_std_path())?;
            continue;
        }

        if to.is_dir() {
            fs::remove_dir_all(to.as_std_path())?;
        } else if to.exists() {
            fs::remove_file(to.as_std_path())?;
        }
        move_path(&from, &to)?;
    }
    Ok(())
}

/// Path with the `old` suffix of the file name replaced by `new`.
///
/// Returns the path unchanged if the name does not end with `old`.
pub fn replace_suffix(path: &Utf8Path, old: &str, new: &str) -> Utf8PathBuf {
    match path.file_name().and_then(|name| name.strip_suffix(old)) {
        Some(stem) => path.with_file_name(format!("{}{}", stem, new)),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn utf8(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_list_files_sorted() {
        let dir = tempdir().unwrap();
        let root = utf8(&dir);
        fs::write(root.join("b.chd"), b"").unwrap();
        fs::write(root.join("a.chd"), b"").unwrap();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("sub/c.chd"), b"").unwrap();

        let top = list_files(&root, false).unwrap();
        assert_eq!(top, vec![root.join("a.chd"), root.join("b.chd")]);

        let all = list_files(&root, true).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.contains(&root.join("sub/c.chd")));
    }

    #[test]
    fn test_has_extension() {
        let path = Utf8Path::new("/games/Title.work.bin");
        assert!(has_extension(path, &[".work.bin"]));
        assert!(!has_extension(path, &[".pkg"]));
        assert!(!has_extension(Utf8Path::new("/games/A.PKG"), &[".pkg"]));
        assert!(has_extension_ignore_case(Utf8Path::new("/games/A.PKG"), &[".pkg"]));
    }

    #[test]
    fn test_is_dir_empty() {
        let dir = tempdir().unwrap();
        let root = utf8(&dir);
        assert!(is_dir_empty(&root).unwrap());
        assert!(is_dir_empty(&root.join("missing")).unwrap());
        fs::write(root.join("x"), b"").unwrap();
        assert!(!is_dir_empty(&root).unwrap());
    }

    #[test]
    fn test_move_contents_merges() {
        let dir = tempdir().unwrap();
        let root = utf8(&dir);
        let src = root.join("src");
        let dest = root.join("dest");
        fs::create_dir_all(src.join("Game")).unwrap();
        fs::write(src.join("Game/data.bin"), b"new").unwrap();
        fs::write(src.join("Game.m3u"), b"Disc1.iso\n").unwrap();
        fs::create_dir_all(dest.join("Game")).unwrap();
        fs::write(dest.join("Game/data.bin"), b"old").unwrap();
        fs::write(dest.join("Game/keep.bin"), b"keep").unwrap();

        move_contents(&src, &dest).unwrap();

        assert_eq!(fs::read(dest.join("Game/data.bin")).unwrap(), b"new");
        assert!(dest.join("Game/keep.bin").exists());
        assert!(dest.join("Game.m3u").exists());
        assert!(is_dir_empty(&src).unwrap());
    }

    #[test]
    fn test_write_completion_marker() {
        let dir = tempdir().unwrap();
        let root = utf8(&dir);
        let marker = write_completion_marker(&root.join("Game")).unwrap();
        assert_eq!(marker, root.join("Game").join(COMPLETION_MARKER));
        assert_eq!(fs::metadata(&marker).unwrap().len(), 0);
    }

    #[test]
    fn test_replace_suffix() {
        assert_eq!(
            replace_suffix(Utf8Path::new("out/Disc1.chd"), ".chd", ".iso"),
            Utf8PathBuf::from("out/Disc1.iso")
        );
        assert_eq!(
            replace_suffix(Utf8Path::new("Disc1.iso"), ".chd", ".iso"),
            Utf8PathBuf::from("Disc1.iso")
        );
    }
}
