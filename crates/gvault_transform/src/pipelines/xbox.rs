//! Xbox and Xbox 360 disc images.

use super::disc::{disc_images, normalize_disc_images};
use crate::dispatcher::{PipelineContext, TransformPipeline};
use camino::{Utf8Path, Utf8PathBuf};
use gvault_core::{Result, Tool, Toolbox};
use gvault_disc::ChdManager;

/// Normalizes discs to ISO, then rewrites each ISO in place with `extract-xiso`.
pub struct XboxPipeline {
    chd: ChdManager,
}

impl XboxPipeline {
    pub fn new(chd: ChdManager) -> Self {
        Self { chd }
    }
}

impl TransformPipeline for XboxPipeline {
    fn name(&self) -> &str {
        "xbox"
    }

    fn run(&self, ctx: &PipelineContext<'_>) -> Result<Option<Utf8PathBuf>> {
        let Some(normalized) =
            normalize_disc_images(&self.chd, ctx.source_file, ctx.workspace.path())?
        else {
            return Ok(None);
        };

        for iso in disc_images(&normalized)? {
            rewrite_xbox_iso(self.chd.toolbox(), &iso)?;
        }
        Ok(Some(normalized))
    }
}

/// Rebuild an Xbox ISO in place, dropping padding and the original image.
pub fn rewrite_xbox_iso(toolbox: &Toolbox, iso: &Utf8Path) -> Result<()> {
    let Some(file_name) = iso.file_name() else {
        return Err(gvault_core::Error::MissingInput(iso.to_path_buf()));
    };
    let dir = iso.parent().unwrap_or(Utf8Path::new("."));

    tracing::info!("Rewriting Xbox image {}", iso);
    toolbox.run_producing(Tool::ExtractXiso, ["-r", "-D", file_name], Some(dir), iso)?;
    Ok(())
}
