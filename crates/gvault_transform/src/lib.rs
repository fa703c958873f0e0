//! Transformation of game source media into launchable files.
//!
//! A [`TransformDispatcher`] routes each [`GameDescriptor`] to the
//! [`TransformPipeline`] registered for its platform. Pipelines work inside a
//! private scratch workspace and only the finished output is moved to the
//! caller's directory.
//!
//! ```no_run
//! use gvault_core::{SystemToolLocator, Toolbox};
//! use gvault_transform::pipelines::ToolInstallImageBuilder;
//! use gvault_transform::{GameDescriptor, TransformDispatcher, TransformOptions};
//! use camino::Utf8Path;
//! use std::sync::Arc;
//!
//! # fn main() -> gvault_core::Result<()> {
//! let toolbox = Toolbox::system(SystemToolLocator::new());
//! let installer = Arc::new(ToolInstallImageBuilder::new(toolbox.clone()));
//! let dispatcher = TransformDispatcher::with_default_pipelines(toolbox, installer, "cache/install");
//!
//! let game = GameDescriptor::new("Game (USA)", "Microsoft", "Microsoft Xbox", "roms/Game (USA)");
//! let output = dispatcher.transform(
//!     &game,
//!     Utf8Path::new("roms/Game (USA)/Game (USA).chd"),
//!     Utf8Path::new("out"),
//!     TransformOptions::default(),
//! )?;
//! println!("{}", output.path());
//! # Ok(())
//! # }
//! ```

mod dispatcher;
mod game;
pub mod pipelines;
pub mod pkg;

pub use dispatcher::{
    PipelineContext, PipelineSelector, TransformDispatcher, TransformOptions, TransformOutput,
    TransformPipeline,
};
pub use game::{regular_name, GameCategory, GameDescriptor, GameSubcategory};
