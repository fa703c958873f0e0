//! Scoped scratch directories.
//!
//! A [`Workspace`] is a private temporary directory owned by exactly one
//! operation. It is deleted when dropped, so early returns and `?` propagation
//! never leak scratch data. Results that must outlive the workspace have to be
//! moved out before it goes out of scope.

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

const WORKSPACE_PREFIX: &str = "gvault-";

/// A temporary directory removed on drop.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    path: Utf8PathBuf,
}

impl Workspace {
    /// Create a workspace in the system temporary directory.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()
            .map_err(Error::Workspace)?;
        Self::from_temp_dir(dir)
    }

    /// Create a workspace inside `parent`.
    ///
    /// Useful to keep scratch data on the same filesystem as the final output so
    /// moving results out is a cheap rename.
    pub fn new_in(parent: &Utf8Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(parent.as_std_path())
            .map_err(Error::Workspace)?;
        Self::from_temp_dir(dir)
    }

    fn from_temp_dir(dir: TempDir) -> Result<Self> {
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).map_err(Error::NonUtf8Path)?;
        tracing::debug!("Created workspace {}", path);
        Ok(Self { dir, path })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn join(&self, path: impl AsRef<Utf8Path>) -> Utf8PathBuf {
        self.path.join(path)
    }

    /// Delete the workspace now, reporting any failure.
    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.dir.close()?;
        tracing::debug!("Removed workspace {}", path);
        Ok(())
    }

    /// Run `f` inside a fresh workspace that is removed afterwards, whether
    /// `f` succeeds or not.
    pub fn scoped<T>(f: impl FnOnce(&Workspace) -> Result<T>) -> Result<T> {
        let workspace = Self::new()?;
        let result = f(&workspace);
        if let Err(e) = workspace.close() {
            tracing::warn!("Failed to remove workspace: {}", e);
        }
        result
    }
}
