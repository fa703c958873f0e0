//! PlayStation 3 disc images.
//!
//! Workspace layout:
//!
//! ```text
//! <workspace>/
//!   iso/        normalized (still encrypted) images and decrypted copies
//!   disc<N>/    file system of one disc while its packages are extracted
//!   output/     merged file systems, delivered to the caller
//!     raw_files.index
//! ```

use super::disc::{disc_images, normalize_disc_images};
use super::psn::extract_package;
use crate::dispatcher::{PipelineContext, TransformPipeline};
use camino::{Utf8Path, Utf8PathBuf};
use gvault_core::archive::extract_iso;
use gvault_core::fs::{
    has_extension_ignore_case, list_files, move_contents, write_completion_marker,
};
use gvault_core::{Error, Result, Tool, Toolbox};
use gvault_disc::ChdManager;

/// Path fragments under which embedded packages are installed content.
const PACKAGE_DIRS: &[&str] = &["PS3_GAME/PKGDIR", "PS3_EXTRA"];
const DISC_KEY_LEN: usize = 16;

/// Decrypts PS3 discs with their `.dkey` and extracts their file system.
pub struct Ps3DiscPipeline {
    chd: ChdManager,
}

impl Ps3DiscPipeline {
    pub fn new(chd: ChdManager) -> Self {
        Self { chd }
    }
}

impl TransformPipeline for Ps3DiscPipeline {
    fn name(&self) -> &str {
        "ps3-disc"
    }

    fn run(&self, ctx: &PipelineContext<'_>) -> Result<Option<Utf8PathBuf>> {
        let dkey = ctx.game.source_dir.join(format!("{}.dkey", ctx.game.name));
        if !dkey.is_file() {
            tracing::warn!("No disc key found for '{}' at {}", ctx.game.name, dkey);
            return Err(Error::MissingInput(dkey));
        }
        let key = read_disc_key(&dkey)?;

        let iso_dir = ctx.workspace.join("iso");
        let output_dir = ctx.workspace.join("output");
        let Some(normalized) = normalize_disc_images(&self.chd, ctx.source_file, &iso_dir)? else {
            return Ok(None);
        };
        std::fs::create_dir_all(output_dir.as_std_path())?;

        let toolbox = self.chd.toolbox();
        for (index, iso) in disc_images(&normalized)?.into_iter().enumerate() {
            let decrypted = decrypted_path(&iso);
            decrypt_ps3_iso(toolbox, &key, &iso, &decrypted)?;
            let disc_dir = ctx.workspace.join(format!("disc{}", index + 1));
            extract_iso(toolbox, &decrypted, &disc_dir)?;
            std::fs::remove_file(decrypted.as_std_path())?;

            // Only this disc's packages; earlier discs are already merged
            extract_embedded_packages(toolbox, &disc_dir)?;
            move_contents(&disc_dir, &output_dir)?;
            std::fs::remove_dir(disc_dir.as_std_path())?;
        }

        let marker = write_completion_marker(&output_dir)?;
        Ok(Some(marker))
    }
}

fn decrypted_path(iso: &Utf8Path) -> Utf8PathBuf {
    let stem = iso.file_stem().unwrap_or("disc");
    iso.with_file_name(format!("{}.decrypted.iso", stem))
}

/// Read a disc key as hex. Accepts 32 hex characters or 16 raw bytes.
pub fn read_disc_key(path: &Utf8Path) -> Result<String> {
    let bytes = std::fs::read(path.as_std_path())?;

    let text = String::from_utf8_lossy(&bytes);
    let text = text.trim();
    if text.len() == DISC_KEY_LEN * 2 && text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Ok(text.to_ascii_lowercase());
    }
    if bytes.len() == DISC_KEY_LEN {
        return Ok(hex::encode(&bytes));
    }

    Err(Error::Parse {
        path: path.to_path_buf(),
        message: format!("expected a {}-byte disc key", DISC_KEY_LEN),
    })
}

/// Decrypt `iso` into `output` with `ps3dec`.
pub fn decrypt_ps3_iso(toolbox: &Toolbox, key: &str, iso: &Utf8Path, output: &Utf8Path) -> Result<()> {
    tracing::info!("Decrypting {}", iso);
    toolbox.run_producing(
        Tool::Ps3Dec,
        ["d", "key", key, iso.as_str(), output.as_str()],
        None,
        output,
    )?;
    Ok(())
}

/// Extract every package found under a known package directory of `root`
/// into a sibling directory named after the package.
fn extract_embedded_packages(toolbox: &Toolbox, root: &Utf8Path) -> Result<()> {
    for pkg in list_files(root, true)? {
        if !has_extension_ignore_case(&pkg, &[".pkg"]) {
            continue;
        }
        let normalized = pkg.as_str().replace('\\', "/");
        if !PACKAGE_DIRS.iter().any(|dir| normalized.contains(dir)) {
            continue;
        }

        let (Some(dir), Some(stem)) = (pkg.parent(), pkg.file_stem()) else {
            continue;
        };
        extract_package(toolbox, &pkg, &dir.join(stem))?;
    }
    Ok(())
}
