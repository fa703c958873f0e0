//! Core shared logic for gvault.
//!
//! This crate provides the pieces every other gvault crate builds on:
//!
//! - **Errors**: the [`Error`] taxonomy with pattern-matchable [`ErrorKind`]s
//! - **Tools**: [`ToolLocator`] discovery and the [`Toolbox`] process runner
//! - **Workspaces**: scoped scratch directories removed on every exit path
//! - **Filesystem helpers**: sorted file listing, content moves, markers
//! - **Hashing**: streaming MD5 digests of files on disk
//! - **Archives**: 7-Zip extraction and ZIP creation collaborators

pub mod archive;
pub mod error;
pub mod fs;
pub mod hash;
pub mod process;
pub mod tools;
pub mod workspace;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{Error, ErrorKind, Result};
pub use process::{CommandRunner, Invocation, ProcessOutput, SystemRunner, Toolbox};
pub use tools::{SystemToolLocator, Tool, ToolLocator};
pub use workspace::Workspace;
