//! Top-level transform dispatch.
//!
//! # Algorithm
//!
//! 1. Require the output directory to exist.
//! 2. Create a private [`Workspace`].
//! 3. Pick the pipeline registered for the game's subcategory, falling back to
//!    one registered for its category.
//! 4. Run it. A pipeline reports the path of its main artifact inside the
//!    workspace, or `None` when it had nothing to do.
//! 5. If no artifact exists, the source file is returned unchanged.
//! 6. Otherwise the contents of the artifact's directory move into the output
//!    directory and the artifact's new path is returned.
//!
//! The workspace is removed on every exit path.

use crate::game::{GameCategory, GameDescriptor, GameSubcategory};
use crate::pipelines::{
    ComputerPipeline, InstallImageBuilder, NetworkPackagePipeline, PackagePlatform, Ps3DiscPipeline,
    XboxPipeline,
};
use camino::{Utf8Path, Utf8PathBuf};
use gvault_core::fs::move_contents;
use gvault_core::{Error, Result, Toolbox, Workspace};
use gvault_disc::ChdManager;
use std::sync::Arc;

/// Caller-controlled transform flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformOptions {
    /// Keep installer setup files inside generated install images.
    pub keep_setup_files: bool,
}

/// Successful outcome of [`TransformDispatcher::transform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutput {
    /// A pipeline produced this artifact in the output directory.
    Transformed(Utf8PathBuf),
    /// Nothing applied; this is the original source file.
    Unchanged(Utf8PathBuf),
}

impl TransformOutput {
    pub fn path(&self) -> &Utf8Path {
        match self {
            TransformOutput::Transformed(path) | TransformOutput::Unchanged(path) => path,
        }
    }

    pub fn is_transformed(&self) -> bool {
        matches!(self, TransformOutput::Transformed(_))
    }
}

/// Everything a pipeline may look at while running.
pub struct PipelineContext<'a> {
    pub game: &'a GameDescriptor,
    pub source_file: &'a Utf8Path,
    pub workspace: &'a Workspace,
    pub options: TransformOptions,
}

/// One platform-specific conversion.
pub trait TransformPipeline: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Convert the source into the workspace.
    ///
    /// Returns the main artifact, whose parent directory holds everything that
    /// should be delivered, or `None` if this source needs no transformation.
    fn run(&self, ctx: &PipelineContext<'_>) -> Result<Option<Utf8PathBuf>>;
}

/// Which games a registered pipeline handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineSelector {
    Category(GameCategory),
    Subcategory(GameSubcategory),
}

/// Routes games to their [`TransformPipeline`].
#[derive(Default)]
pub struct TransformDispatcher {
    routes: Vec<(PipelineSelector, Arc<dyn TransformPipeline>)>,
}

impl TransformDispatcher {
    /// An empty dispatcher; every transform is a no-op until pipelines are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher with every built-in pipeline registered.
    ///
    /// Install images for computer games are cached below `install_cache_root`.
    pub fn with_default_pipelines(
        toolbox: Toolbox,
        installer: Arc<dyn InstallImageBuilder>,
        install_cache_root: impl Into<Utf8PathBuf>,
    ) -> Self {
        let chd = ChdManager::new(toolbox.clone());
        let xbox = Arc::new(XboxPipeline::new(chd.clone()));
        let psn = |platform| Arc::new(NetworkPackagePipeline::new(toolbox.clone(), platform));

        let mut dispatcher = Self::new();
        dispatcher
            .register(
                PipelineSelector::Category(GameCategory::Computer),
                Arc::new(ComputerPipeline::new(
                    toolbox.clone(),
                    installer,
                    install_cache_root,
                )),
            )
            .register(PipelineSelector::Subcategory(GameSubcategory::Xbox), xbox.clone())
            .register(PipelineSelector::Subcategory(GameSubcategory::Xbox360), xbox)
            .register(
                PipelineSelector::Subcategory(GameSubcategory::PlayStation3),
                Arc::new(Ps3DiscPipeline::new(chd)),
            )
            .register(
                PipelineSelector::Subcategory(GameSubcategory::PlayStationNetworkPs3),
                psn(PackagePlatform::PlayStation3),
            )
            .register(
                PipelineSelector::Subcategory(GameSubcategory::PlayStationNetworkVita),
                psn(PackagePlatform::PlayStationVita),
            );
        dispatcher
    }

    /// Register `pipeline` for `selector`, replacing an earlier registration.
    pub fn register(
        &mut self,
        selector: PipelineSelector,
        pipeline: Arc<dyn TransformPipeline>,
    ) -> &mut Self {
        self.routes.retain(|(existing, _)| *existing != selector);
        self.routes.push((selector, pipeline));
        self
    }

    /// The pipeline that handles `game`, if any.
    pub fn select(&self, game: &GameDescriptor) -> Option<&dyn TransformPipeline> {
        let by_subcategory = self.routes.iter().find(|(selector, _)| {
            matches!(selector, PipelineSelector::Subcategory(sub) if *sub == game.subcategory)
        });
        let by_category = || {
            self.routes.iter().find(|(selector, _)| {
                matches!(selector, PipelineSelector::Category(cat) if *cat == game.category)
            })
        };
        by_subcategory
            .or_else(by_category)
            .map(|(_, pipeline)| pipeline.as_ref())
    }

    /// Transform `source_file` of `game` into `output_dir`.
    pub fn transform(
        &self,
        game: &GameDescriptor,
        source_file: &Utf8Path,
        output_dir: &Utf8Path,
        options: TransformOptions,
    ) -> Result<TransformOutput> {
        if !output_dir.is_dir() {
            return Err(Error::precondition(format!(
                "Output directory '{}' doesn't exist",
                output_dir
            )));
        }
        game.validate()?;

        let workspace = Workspace::new()?;

        let Some(pipeline) = self.select(game) else {
            tracing::info!(
                "No pipeline for {} / {}, keeping {}",
                game.category,
                game.subcategory,
                source_file
            );
            return Ok(TransformOutput::Unchanged(source_file.to_path_buf()));
        };

        tracing::info!("Transforming '{}' with the {} pipeline", game.name, pipeline.name());
        let ctx = PipelineContext {
            game,
            source_file,
            workspace: &workspace,
            options,
        };
        let artifact = pipeline.run(&ctx)?;

        let (Some(artifact), Some(artifact_dir)) = (
            artifact.as_ref().filter(|path| path.exists()),
            artifact.as_ref().and_then(|path| path.parent()),
        ) else {
            tracing::info!("{} produced nothing, keeping {}", pipeline.name(), source_file);
            return Ok(TransformOutput::Unchanged(source_file.to_path_buf()));
        };
        let Some(file_name) = artifact.file_name() else {
            return Ok(TransformOutput::Unchanged(source_file.to_path_buf()));
        };

        move_contents(artifact_dir, output_dir)?;
        let final_path = output_dir.join(file_name);
        workspace.close()?;

        tracing::info!("Transformed '{}' into {}", game.name, final_path);
        Ok(TransformOutput::Transformed(final_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Recording {
        name: &'static str,
        runs: AtomicUsize,
        produce: bool,
    }

    impl Recording {
        fn new(name: &'static str, produce: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                runs: AtomicUsize::new(0),
                produce,
            })
        }
    }

    impl TransformPipeline for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn run(&self, ctx: &PipelineContext<'_>) -> Result<Option<Utf8PathBuf>> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if !self.produce {
                return Ok(None);
            }
            let dir = ctx.workspace.join("out");
            std::fs::create_dir_all(&dir)?;
            std::fs::write(dir.join("extra.bin"), b"extra")?;
            let artifact = dir.join("result.iso");
            std::fs::write(&artifact, b"iso")?;
            Ok(Some(artifact))
        }
    }

    fn root(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    fn game(category: &str, subcategory: &str) -> GameDescriptor {
        GameDescriptor::new("Game (USA)", category, subcategory, "/games/Game (USA)")
    }

    #[test]
    fn test_no_pipeline_returns_source() {
        let dir = tempfile::tempdir().unwrap();
        let root = root(&dir);
        let source = root.join("Game.nes");
        std::fs::write(&source, b"rom").unwrap();

        let output = TransformDispatcher::new()
            .transform(
                &game("Nintendo", "Nintendo NES"),
                &source,
                &root,
                TransformOptions::default(),
            )
            .unwrap();
        assert_eq!(output, TransformOutput::Unchanged(source));
    }

    #[test]
    fn test_missing_output_dir() {
        let pipeline = Recording::new("recording", true);
        let mut dispatcher = TransformDispatcher::new();
        dispatcher.register(
            PipelineSelector::Category(GameCategory::Sony),
            pipeline.clone(),
        );

        let err = dispatcher
            .transform(
                &game("Sony", "Sony PlayStation 3"),
                Utf8Path::new("/games/Game.iso"),
                Utf8Path::new("/nonexistent/output"),
                TransformOptions::default(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), gvault_core::ErrorKind::Precondition);
        assert_eq!(pipeline.runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subcategory_wins_over_category() {
        let by_category = Recording::new("category", false);
        let by_subcategory = Recording::new("subcategory", false);
        let mut dispatcher = TransformDispatcher::new();
        dispatcher
            .register(PipelineSelector::Category(GameCategory::Sony), by_category)
            .register(
                PipelineSelector::Subcategory(GameSubcategory::PlayStation3),
                by_subcategory,
            );

        let selected = dispatcher.select(&game("Sony", "Sony PlayStation 3")).unwrap();
        assert_eq!(selected.name(), "subcategory");
        let selected = dispatcher
            .select(&game("Sony", "Sony PlayStation Portable"))
            .unwrap();
        assert_eq!(selected.name(), "category");
        assert!(dispatcher.select(&game("Computer", "Windows")).is_none());
    }

    #[test]
    fn test_pipeline_without_artifact_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let root = root(&dir);
        let pipeline = Recording::new("idle", false);
        let mut dispatcher = TransformDispatcher::new();
        dispatcher.register(
            PipelineSelector::Category(GameCategory::Microsoft),
            pipeline.clone(),
        );

        let source = Utf8PathBuf::from("/games/Game.xex");
        let output = dispatcher
            .transform(
                &game("Microsoft", "Microsoft Xbox One"),
                &source,
                &root,
                TransformOptions::default(),
            )
            .unwrap();
        assert_eq!(output, TransformOutput::Unchanged(source));
        assert_eq!(pipeline.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_artifact_directory_moved_to_output() {
        let dir = tempfile::tempdir().unwrap();
        let root = root(&dir);
        let mut dispatcher = TransformDispatcher::new();
        dispatcher.register(
            PipelineSelector::Category(GameCategory::Microsoft),
            Recording::new("producer", true),
        );

        let output = dispatcher
            .transform(
                &game("Microsoft", "Microsoft Xbox"),
                Utf8Path::new("/games/Game.chd"),
                &root,
                TransformOptions::default(),
            )
            .unwrap();
        assert_eq!(output, TransformOutput::Transformed(root.join("result.iso")));
        assert!(output.is_transformed());
        assert!(root.join("result.iso").is_file());
        assert!(root.join("extra.bin").is_file());
    }
}
