//! CHD disc container management.
//!
//! A container moves through three observable states:
//!
//! - **Absent**: the `.chd` file does not exist
//! - **Created**: the file exists and its mount directory is missing or empty
//! - **Mounted**: the file exists and its mount directory is non-empty
//!
//! Mounting decompresses the disc into the mount directory, and unmounting
//! deletes that directory again. Nothing else is tracked between calls.

use camino::{Utf8Path, Utf8PathBuf};
use gvault_core::archive::{extract_archive, extract_iso, zip_directory};
use gvault_core::fs::is_dir_empty;
use gvault_core::{Error, Result, Tool, Toolbox, Workspace};
use std::fmt;
use std::str::FromStr;

/// Line `chdman verify` prints when every checksum matches.
pub const VERIFY_SUCCESS_MARKER: &str = "Overall SHA1 verification successful!";

/// Layout of the file system inside a disc image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiscKind {
    /// Plain ISO9660 data disc.
    #[default]
    Iso9660,
    /// Mac/Windows hybrid disc; 7-Zip auto-detects the HFS or UDF side.
    Hybrid,
}

impl fmt::Display for DiscKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscKind::Iso9660 => f.write_str("iso9660"),
            DiscKind::Hybrid => f.write_str("hybrid"),
        }
    }
}

impl FromStr for DiscKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "iso" | "iso9660" => Ok(DiscKind::Iso9660),
            "hybrid" | "macwin" => Ok(DiscKind::Hybrid),
            other => Err(format!("unknown disc kind '{}'", other)),
        }
    }
}

/// Observable state of a container and its mount directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Absent,
    Created,
    Mounted,
}

/// Drives `chdman` and the archive tools to manage CHD containers.
#[derive(Clone)]
pub struct ChdManager {
    toolbox: Toolbox,
}

impl ChdManager {
    pub fn new(toolbox: Toolbox) -> Self {
        Self { toolbox }
    }

    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    /// Compress a raw disc image into a CHD container.
    pub fn create(&self, chd: &Utf8Path, source: &Utf8Path, delete_source: bool) -> Result<()> {
        if !source.is_file() {
            return Err(Error::MissingInput(source.to_path_buf()));
        }
        if let Some(parent) = chd.parent() {
            std::fs::create_dir_all(parent.as_std_path())?;
        }

        tracing::info!("Creating {} from {}", chd, source);
        self.toolbox.run_producing(
            Tool::Chdman,
            ["createcd", "-i", source.as_str(), "-o", chd.as_str()],
            None,
            chd,
        )?;

        if delete_source {
            std::fs::remove_file(source.as_std_path())?;
        }
        Ok(())
    }

    /// Decompress a container into a raw binary plus a TOC sidecar.
    pub fn extract(
        &self,
        chd: &Utf8Path,
        bin: &Utf8Path,
        toc: &Utf8Path,
        delete_container: bool,
    ) -> Result<()> {
        if !chd.is_file() {
            return Err(Error::MissingInput(chd.to_path_buf()));
        }
        for parent in [bin.parent(), toc.parent()].into_iter().flatten() {
            std::fs::create_dir_all(parent.as_std_path())?;
        }

        tracing::info!("Extracting {} -> {}", chd, bin);
        self.toolbox.run_producing(
            Tool::Chdman,
            [
                "extractcd",
                "-i",
                chd.as_str(),
                "-o",
                toc.as_str(),
                "-ob",
                bin.as_str(),
            ],
            None,
            bin,
        )?;

        if delete_container {
            std::fs::remove_file(chd.as_std_path())?;
        }
        Ok(())
    }

    /// Run the container's integrity check.
    ///
    /// Only the confirmation line in chdman's output counts as success; the
    /// exit code alone is not trusted.
    pub fn verify(&self, chd: &Utf8Path) -> Result<bool> {
        if !chd.is_file() {
            return Err(Error::MissingInput(chd.to_path_buf()));
        }
        let output = self
            .toolbox
            .output(Tool::Chdman, ["verify", "-i", chd.as_str()], None)?;
        let verified = output.combined().contains(VERIFY_SUCCESS_MARKER);
        if !verified {
            tracing::warn!("Verification of {} failed", chd);
        }
        Ok(verified)
    }

    /// A container is mounted when it exists and `mount_dir` is a non-empty directory.
    pub fn is_mounted(chd: &Utf8Path, mount_dir: &Utf8Path) -> bool {
        Self::state(chd, mount_dir) == ContainerState::Mounted
    }

    pub fn state(chd: &Utf8Path, mount_dir: &Utf8Path) -> ContainerState {
        if !chd.is_file() {
            return ContainerState::Absent;
        }
        let populated = mount_dir.is_dir() && !is_dir_empty(mount_dir).unwrap_or(true);
        if populated {
            ContainerState::Mounted
        } else {
            ContainerState::Created
        }
    }

    /// Decompress the container's file system into `mount_dir`.
    ///
    /// Does nothing if already mounted. Extraction happens in a scratch
    /// workspace next to `mount_dir`, which is renamed into place once it fully
    /// succeeded. A failed mount leaves `mount_dir` as it was.
    pub fn mount(&self, chd: &Utf8Path, mount_dir: &Utf8Path, kind: DiscKind) -> Result<()> {
        if Self::is_mounted(chd, mount_dir) {
            tracing::debug!("{} is already mounted at {}", chd, mount_dir);
            return Ok(());
        }
        if !chd.is_file() {
            return Err(Error::MissingInput(chd.to_path_buf()));
        }

        let parent = match mount_dir.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        std::fs::create_dir_all(parent.as_std_path())?;
        let scratch = Workspace::new_in(parent)?;

        let stem = chd.file_stem().unwrap_or("disc");
        let iso = scratch.join(format!("{}.iso", stem));
        let toc = scratch.join(format!("{}.toc", stem));
        self.extract(chd, &iso, &toc, false)?;

        let staging = scratch.join("contents");
        match kind {
            DiscKind::Hybrid => extract_archive(&self.toolbox, &iso, &staging)?,
            DiscKind::Iso9660 => extract_iso(&self.toolbox, &iso, &staging)?,
        }
        if is_dir_empty(&staging)? {
            return Err(Error::MissingOutput {
                tool: Tool::SevenZip,
                path: staging,
            });
        }

        // Not mounted, so an existing mount dir is empty
        if mount_dir.is_dir() {
            std::fs::remove_dir(mount_dir.as_std_path())?;
        }
        std::fs::rename(staging.as_std_path(), mount_dir.as_std_path())?;
        scratch.close()?;

        tracing::info!("Mounted {} at {}", chd, mount_dir);
        Ok(())
    }

    /// Remove the mount directory. Does nothing if not mounted.
    pub fn unmount(&self, chd: &Utf8Path, mount_dir: &Utf8Path) -> Result<()> {
        if !Self::is_mounted(chd, mount_dir) {
            tracing::debug!("{} is not mounted at {}", chd, mount_dir);
            return Ok(());
        }

        std::fs::remove_dir_all(mount_dir.as_std_path())?;
        tracing::info!("Unmounted {} from {}", chd, mount_dir);
        Ok(())
    }

    /// Mount the container, zip its contents into `zip`, then unmount.
    ///
    /// The zip is written under a temporary name and only renamed into place
    /// after the unmount, so a failure at any step leaves no file at `zip`.
    pub fn archive_to_zip(
        &self,
        chd: &Utf8Path,
        zip: &Utf8Path,
        kind: DiscKind,
        delete_original: bool,
    ) -> Result<()> {
        let scratch = Workspace::new()?;
        let mount_dir = scratch.join("mount");
        self.mount(chd, &mount_dir, kind)?;

        let partial = Utf8PathBuf::from(format!("{}.partial", zip));
        let written = zip_directory(&mount_dir, &partial)
            .and_then(|_| self.unmount(chd, &mount_dir))
            .and_then(|_| scratch.close())
            .and_then(|_| {
                std::fs::rename(partial.as_std_path(), zip.as_std_path())?;
                Ok(())
            });
        if let Err(e) = written {
            if partial.exists() {
                if let Err(cleanup) = std::fs::remove_file(partial.as_std_path()) {
                    tracing::warn!("Failed to remove {}: {}", partial, cleanup);
                }
            }
            return Err(e);
        }

        if delete_original {
            std::fs::remove_file(chd.as_std_path())?;
        }
        tracing::info!("Archived {} to {}", chd, zip);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gvault_core::archive::unzip;
    use gvault_core::mock::{write_zip, MockLocator, ScriptedRunner};
    use gvault_core::{ErrorKind, ProcessOutput};

    struct Fixture {
        _dir: tempfile::TempDir,
        root: Utf8PathBuf,
        runner: ScriptedRunner,
        manager: ChdManager,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let runner = ScriptedRunner::emulating_tools();
        let manager = ChdManager::new(Toolbox::new(MockLocator::all(), runner.clone()));
        Fixture {
            _dir: dir,
            root,
            runner,
            manager,
        }
    }

    /// A container whose emulated decompression yields a disc with `files`.
    fn disc_chd(path: &Utf8Path, files: &[(&str, &[u8])]) {
        write_zip(path, files).unwrap();
    }

    #[test]
    fn test_create_and_extract() {
        let fx = fixture();
        let iso = fx.root.join("Game.iso");
        std::fs::write(&iso, b"raw disc").unwrap();
        let chd = fx.root.join("chd/Game.chd");

        fx.manager.create(&chd, &iso, true).unwrap();
        assert!(chd.is_file());
        assert!(!iso.exists());

        let bin = fx.root.join("out/Game.bin");
        let toc = fx.root.join("out/Game.toc");
        fx.manager.extract(&chd, &bin, &toc, false).unwrap();
        assert_eq!(std::fs::read(&bin).unwrap(), b"raw disc");
        assert!(toc.is_file());
        assert!(chd.is_file());

        let args = &fx.runner.calls_to(Tool::Chdman)[1].args;
        assert_eq!(args[0], "extractcd");
        assert_eq!(args[3], "-o");
        assert_eq!(args[4], toc.as_str());
    }

    #[test]
    fn test_create_without_tool() {
        let fx = fixture();
        let iso = fx.root.join("Game.iso");
        std::fs::write(&iso, b"raw disc").unwrap();
        let manager = ChdManager::new(Toolbox::new(
            MockLocator::all().without(Tool::Chdman),
            ScriptedRunner::emulating_tools(),
        ));

        let err = manager.create(&fx.root.join("Game.chd"), &iso, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ToolMissing);
        assert!(iso.exists());
    }

    #[test]
    fn test_verify_requires_marker() {
        let fx = fixture();
        let chd = fx.root.join("Game.chd");
        std::fs::write(&chd, b"").unwrap();
        assert!(fx.manager.verify(&chd).unwrap());

        let runner = ScriptedRunner::new().on(Tool::Chdman, |_| {
            Ok(ProcessOutput {
                code: 0,
                stdout: "Raw SHA1 verification successful!\n".to_string(),
                stderr: String::new(),
            })
        });
        let manager = ChdManager::new(Toolbox::new(MockLocator::all(), runner));
        assert!(!manager.verify(&chd).unwrap());
    }

    #[test]
    fn test_mount_twice_is_noop() {
        let fx = fixture();
        let chd = fx.root.join("Game.chd");
        disc_chd(&chd, &[("SYSTEM.CNF", b"BOOT2"), ("DATA/LEVEL.BIN", b"lvl")]);
        let mount_dir = fx.root.join("mnt/Game");

        assert_eq!(ChdManager::state(&chd, &mount_dir), ContainerState::Created);
        fx.manager.mount(&chd, &mount_dir, DiscKind::Iso9660).unwrap();
        assert!(ChdManager::is_mounted(&chd, &mount_dir));
        assert!(mount_dir.join("DATA/LEVEL.BIN").is_file());

        fx.manager.mount(&chd, &mount_dir, DiscKind::Iso9660).unwrap();
        assert_eq!(fx.runner.calls_to(Tool::Chdman).len(), 1);
        assert_eq!(fx.runner.calls_to(Tool::SevenZip).len(), 1);
    }

    #[test]
    fn test_mount_kind_selects_extraction() {
        let fx = fixture();
        let chd = fx.root.join("Hybrid.chd");
        disc_chd(&chd, &[("Setup.exe", b"MZ")]);

        fx.manager
            .mount(&chd, &fx.root.join("mnt"), DiscKind::Hybrid)
            .unwrap();
        let args = &fx.runner.calls_to(Tool::SevenZip)[0].args;
        assert!(!args.contains(&"-tiso".to_string()));
    }

    #[test]
    fn test_failed_mount_leaves_no_contents() {
        let fx = fixture();
        let chd = fx.root.join("Game.chd");
        disc_chd(&chd, &[("SYSTEM.CNF", b"BOOT2")]);
        fx.runner.set(Tool::SevenZip, |_| {
            Ok(ProcessOutput {
                code: 2,
                stdout: String::new(),
                stderr: "Can not open the file as archive".to_string(),
            })
        });

        let mount_dir = fx.root.join("mnt");
        let err = fx
            .manager
            .mount(&chd, &mount_dir, DiscKind::Iso9660)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProcessFailed);
        assert!(!ChdManager::is_mounted(&chd, &mount_dir));
        assert!(!mount_dir.exists());
    }

    #[test]
    fn test_interrupted_extraction_leaves_mount_dir_untouched() {
        let fx = fixture();
        let chd = fx.root.join("Game.chd");
        disc_chd(&chd, &[("SYSTEM.CNF", b"BOOT2")]);
        // Writes part of the disc, then fails
        fx.runner.set(Tool::SevenZip, |invocation| {
            if let Some(dir) = invocation.args.iter().find_map(|a| a.strip_prefix("-o")) {
                std::fs::create_dir_all(dir)?;
                std::fs::write(Utf8Path::new(dir).join("SYSTEM.CNF"), b"BOOT2")?;
            }
            Ok(ProcessOutput {
                code: 2,
                stdout: String::new(),
                stderr: "Data Error".to_string(),
            })
        });

        let parent = fx.root.join("mnt");
        let mount_dir = parent.join("Game");
        assert!(fx.manager.mount(&chd, &mount_dir, DiscKind::Iso9660).is_err());
        assert!(!mount_dir.exists());
        assert_eq!(std::fs::read_dir(&parent).unwrap().count(), 0);

        // A retry is not mistaken for an existing mount
        fx.runner.set(Tool::SevenZip, |_| {
            Ok(ProcessOutput {
                code: 2,
                stdout: String::new(),
                stderr: "Data Error".to_string(),
            })
        });
        assert!(fx.manager.mount(&chd, &mount_dir, DiscKind::Iso9660).is_err());
        assert_eq!(fx.runner.calls_to(Tool::SevenZip).len(), 2);
    }

    #[test]
    fn test_mount_into_existing_empty_dir() {
        let fx = fixture();
        let chd = fx.root.join("Game.chd");
        disc_chd(&chd, &[("SYSTEM.CNF", b"BOOT2")]);
        let mount_dir = fx.root.join("mnt");
        std::fs::create_dir_all(&mount_dir).unwrap();

        fx.manager.mount(&chd, &mount_dir, DiscKind::Iso9660).unwrap();
        assert_eq!(std::fs::read(mount_dir.join("SYSTEM.CNF")).unwrap(), b"BOOT2");
        assert_eq!(std::fs::read_dir(&fx.root).unwrap().count(), 2);
    }

    #[test]
    fn test_mount_missing_container() {
        let fx = fixture();
        let chd = fx.root.join("Missing.chd");
        assert_eq!(ChdManager::state(&chd, &fx.root), ContainerState::Absent);
        let err = fx
            .manager
            .mount(&chd, &fx.root.join("mnt"), DiscKind::Iso9660)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingInput);
    }

    #[test]
    fn test_unmount() {
        let fx = fixture();
        let chd = fx.root.join("Game.chd");
        disc_chd(&chd, &[("SYSTEM.CNF", b"BOOT2")]);
        let mount_dir = fx.root.join("mnt");

        // Not mounted yet
        fx.manager.unmount(&chd, &mount_dir).unwrap();

        fx.manager.mount(&chd, &mount_dir, DiscKind::Iso9660).unwrap();
        fx.manager.unmount(&chd, &mount_dir).unwrap();
        assert!(!ChdManager::is_mounted(&chd, &mount_dir));
        assert!(!mount_dir.exists());
        assert_eq!(ChdManager::state(&chd, &mount_dir), ContainerState::Created);
    }

    #[test]
    fn test_archive_to_zip() {
        let fx = fixture();
        let chd = fx.root.join("Game.chd");
        disc_chd(&chd, &[("SYSTEM.CNF", b"BOOT2"), ("DATA/LEVEL.BIN", b"lvl")]);
        let zip = fx.root.join("Game.zip");

        fx.manager
            .archive_to_zip(&chd, &zip, DiscKind::Iso9660, true)
            .unwrap();

        assert!(zip.is_file());
        assert!(!chd.exists());
        let out = fx.root.join("check");
        unzip(&zip, &out).unwrap();
        assert_eq!(std::fs::read(out.join("DATA/LEVEL.BIN")).unwrap(), b"lvl");
    }

    #[test]
    fn test_archive_failure_leaves_no_zip() {
        let fx = fixture();
        let chd = fx.root.join("Game.chd");
        disc_chd(&chd, &[("SYSTEM.CNF", b"BOOT2")]);
        fx.runner.set(Tool::Chdman, |_| {
            Ok(ProcessOutput {
                code: 1,
                stdout: String::new(),
                stderr: "Error reading CHD file".to_string(),
            })
        });
        let zip = fx.root.join("Game.zip");

        assert!(fx
            .manager
            .archive_to_zip(&chd, &zip, DiscKind::Iso9660, true)
            .is_err());
        assert!(!zip.exists());
        assert!(!fx.root.join("Game.zip.partial").exists());
        assert!(chd.exists());
    }

    #[test]
    fn test_archive_failure_after_zip_written() {
        let fx = fixture();
        let chd = fx.root.join("Game.chd");
        disc_chd(&chd, &[("SYSTEM.CNF", b"BOOT2")]);
        // A non-empty directory in the way makes the final rename fail
        let zip = fx.root.join("Game.zip");
        std::fs::create_dir_all(&zip).unwrap();
        std::fs::write(zip.join("keep"), b"").unwrap();

        assert!(fx
            .manager
            .archive_to_zip(&chd, &zip, DiscKind::Iso9660, true)
            .is_err());
        assert!(!zip.is_file());
        assert!(zip.join("keep").is_file());
        assert!(!fx.root.join("Game.zip.partial").exists());
        assert!(chd.exists());
        assert_eq!(fx.runner.calls_to(Tool::SevenZip).len(), 1);
    }
}
