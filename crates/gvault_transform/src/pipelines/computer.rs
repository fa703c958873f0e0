//! Computer games.
//!
//! # Algorithm
//!
//! 1. If a pre-packaged archive (`<name>.7z.001`, then `<name>.exe`) sits next
//!    to the source file, extract it into `<workspace>/<regular name>`.
//! 2. Otherwise the source is installer media. Build an install image once,
//!    move it into the install cache, then unpack the cached image.
//! 3. Write the completion marker into the extraction directory.

use crate::dispatcher::{PipelineContext, TransformPipeline};
use crate::game::GameDescriptor;
use camino::{Utf8Path, Utf8PathBuf};
use gvault_core::archive::extract_archive;
use gvault_core::fs::{move_path, write_completion_marker};
use gvault_core::{Result, Tool, Toolbox};
use std::sync::Arc;

const PREPACKAGED_SUFFIXES: &[&str] = &[".7z.001", ".exe"];
const INSTALL_IMAGE_SUFFIX: &str = ".install";

/// Produces an install image from a game's installer media.
pub trait InstallImageBuilder: Send + Sync {
    fn build(
        &self,
        game: &GameDescriptor,
        source_file: &Utf8Path,
        output_image: &Utf8Path,
        keep_setup_files: bool,
    ) -> Result<()>;
}

/// [`InstallImageBuilder`] backed by the external installer tool.
pub struct ToolInstallImageBuilder {
    toolbox: Toolbox,
}

impl ToolInstallImageBuilder {
    pub fn new(toolbox: Toolbox) -> Self {
        Self { toolbox }
    }
}

impl InstallImageBuilder for ToolInstallImageBuilder {
    fn build(
        &self,
        game: &GameDescriptor,
        source_file: &Utf8Path,
        output_image: &Utf8Path,
        keep_setup_files: bool,
    ) -> Result<()> {
        tracing::info!("Building install image for '{}' from {}", game.name, source_file);

        let mut args = vec![
            "build".to_string(),
            game.source_dir.to_string(),
            output_image.to_string(),
        ];
        if keep_setup_files {
            args.push("--keep-setup-files".to_string());
        }
        self.toolbox
            .run_producing(Tool::Installer, args, None, output_image)?;
        Ok(())
    }
}

/// Unpacks pre-packaged archives or cached install images.
pub struct ComputerPipeline {
    toolbox: Toolbox,
    installer: Arc<dyn InstallImageBuilder>,
    install_cache_root: Utf8PathBuf,
}

impl ComputerPipeline {
    pub fn new(
        toolbox: Toolbox,
        installer: Arc<dyn InstallImageBuilder>,
        install_cache_root: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            toolbox,
            installer,
            install_cache_root: install_cache_root.into(),
        }
    }

    /// `<root>/<category>/<subcategory>/<name>/<name>.install`
    pub fn cached_install_image(&self, game: &GameDescriptor) -> Utf8PathBuf {
        self.install_cache_root
            .join(game.category.as_str())
            .join(game.subcategory.as_str())
            .join(&game.name)
            .join(format!("{}{}", game.name, INSTALL_IMAGE_SUFFIX))
    }

    fn find_prepackaged_archive(game: &GameDescriptor, source_file: &Utf8Path) -> Option<Utf8PathBuf> {
        let dir = source_file.parent().unwrap_or(Utf8Path::new(""));
        PREPACKAGED_SUFFIXES
            .iter()
            .map(|suffix| dir.join(format!("{}{}", game.name, suffix)))
            .find(|path| path.is_file())
    }

    /// Return the cached install image, building it first if needed.
    fn ensure_install_image(&self, ctx: &PipelineContext<'_>) -> Result<Utf8PathBuf> {
        let cached = self.cached_install_image(ctx.game);
        if cached.is_file() {
            tracing::info!("Reusing cached install image {}", cached);
            return Ok(cached);
        }

        let built = ctx
            .workspace
            .join(format!("{}{}", ctx.game.name, INSTALL_IMAGE_SUFFIX));
        self.installer.build(
            ctx.game,
            ctx.source_file,
            &built,
            ctx.options.keep_setup_files,
        )?;

        if let Some(parent) = cached.parent() {
            std::fs::create_dir_all(parent.as_std_path())?;
        }
        move_path(&built, &cached)?;
        tracing::info!("Cached install image at {}", cached);
        Ok(cached)
    }
}

impl TransformPipeline for ComputerPipeline {
    fn name(&self) -> &str {
        "computer"
    }

    fn run(&self, ctx: &PipelineContext<'_>) -> Result<Option<Utf8PathBuf>> {
        ctx.game.validate()?;
        let extract_dir = ctx.workspace.join(ctx.game.regular_name());

        match Self::find_prepackaged_archive(ctx.game, ctx.source_file) {
            Some(archive) => {
                tracing::info!("Using pre-packaged archive {}", archive);
                extract_archive(&self.toolbox, &archive, &extract_dir)?;
            }
            None => {
                let image = self.ensure_install_image(ctx)?;
                extract_archive(&self.toolbox, &image, &extract_dir)?;
            }
        }

        let marker = write_completion_marker(&extract_dir)?;
        Ok(Some(marker))
    }
}
