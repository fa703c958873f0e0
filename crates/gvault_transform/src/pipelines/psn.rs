//! PlayStation Network packages.
//!
//! Everything next to the source file belongs to the game: `.pkg` packages
//! plus licence files (`.rap` for PS3, `.work.bin` for Vita). Licences are
//! copied under the names the emulators expect and every package is extracted
//! into the same output directory.

use crate::dispatcher::{PipelineContext, TransformPipeline};
use crate::pkg::read_content_id;
use camino::{Utf8Path, Utf8PathBuf};
use gvault_core::fs::{has_extension, list_files, replace_suffix, write_completion_marker};
use gvault_core::{Result, Tool, Toolbox};

/// Platform the packages are for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackagePlatform {
    PlayStation3,
    PlayStationVita,
}

/// Copies licences and extracts every sibling package.
pub struct NetworkPackagePipeline {
    toolbox: Toolbox,
    platform: PackagePlatform,
}

impl NetworkPackagePipeline {
    pub fn new(toolbox: Toolbox, platform: PackagePlatform) -> Self {
        Self { toolbox, platform }
    }

    /// Copy each `<name>.rap` as `<content id>.rap`, reading the ID from `<name>.pkg`.
    fn copy_rap_files(&self, siblings: &[Utf8PathBuf], output_dir: &Utf8Path) -> Result<()> {
        for rap in siblings.iter().filter(|p| has_extension(p, &[".rap"])) {
            let pkg = replace_suffix(rap, ".rap", ".pkg");
            let Some(content_id) = read_content_id(&pkg)? else {
                tracing::warn!("Skipping {}: no package content ID in {}", rap, pkg);
                continue;
            };
            let target = output_dir.join(format!("{}.rap", content_id));
            std::fs::copy(rap.as_std_path(), target.as_std_path())?;
            tracing::debug!("Copied {} -> {}", rap, target);
        }
        Ok(())
    }

    /// Copy any `*.work.bin` licence as `work.bin`.
    fn copy_work_bin(&self, siblings: &[Utf8PathBuf], output_dir: &Utf8Path) -> Result<()> {
        for work_bin in siblings.iter().filter(|p| has_extension(p, &[".work.bin"])) {
            let target = output_dir.join("work.bin");
            std::fs::copy(work_bin.as_std_path(), target.as_std_path())?;
            tracing::debug!("Copied {} -> {}", work_bin, target);
        }
        Ok(())
    }
}

impl TransformPipeline for NetworkPackagePipeline {
    fn name(&self) -> &str {
        match self.platform {
            PackagePlatform::PlayStation3 => "psn-ps3",
            PackagePlatform::PlayStationVita => "psn-vita",
        }
    }

    fn run(&self, ctx: &PipelineContext<'_>) -> Result<Option<Utf8PathBuf>> {
        let source_dir = ctx.source_file.parent().unwrap_or(Utf8Path::new("."));
        let siblings = list_files(source_dir, false)?;
        let output_dir = ctx.workspace.path();

        match self.platform {
            PackagePlatform::PlayStation3 => self.copy_rap_files(&siblings, output_dir)?,
            PackagePlatform::PlayStationVita => self.copy_work_bin(&siblings, output_dir)?,
        }

        for pkg in siblings.iter().filter(|p| has_extension(p, &[".pkg"])) {
            extract_package(&self.toolbox, pkg, output_dir)?;
        }

        let marker = write_completion_marker(output_dir)?;
        Ok(Some(marker))
    }
}

/// Extract a package into `dir` with `pkg2zip`.
pub fn extract_package(toolbox: &Toolbox, pkg: &Utf8Path, dir: &Utf8Path) -> Result<()> {
    std::fs::create_dir_all(dir.as_std_path())?;
    tracing::info!("Extracting package {} -> {}", pkg, dir);
    toolbox.run(Tool::Pkg2Zip, ["-x", pkg.as_str()], Some(dir))?;
    Ok(())
}
