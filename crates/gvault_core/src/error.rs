//! Error types shared by the gvault crates.
//!
//! Every fallible operation returns [`Result<T>`]. Callers that need to react to
//! a specific failure class match on [`Error::kind`] instead of parsing the
//! message text.

use crate::tools::Tool;
use camino::Utf8PathBuf;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the gvault crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running tools, pipelines and filesystem steps.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing or reading a ZIP archive failed.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Walking a directory tree failed.
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// The external tool could not be found on this system.
    #[error("Required tool '{0}' is not installed")]
    ToolMissing(Tool),

    /// The external tool could not be started.
    #[error("Failed to launch {tool}: {source}")]
    Spawn {
        tool: Tool,
        #[source]
        source: std::io::Error,
    },

    /// The external tool exited with a non-zero code.
    #[error("{tool} exited with code {code}: {output}")]
    ProcessFailed { tool: Tool, code: i32, output: String },

    /// The external tool reported success but its output is missing.
    #[error("{tool} did not produce {path}")]
    MissingOutput { tool: Tool, path: Utf8PathBuf },

    /// A required sidecar input (key file, disc image, ...) does not exist.
    #[error("Required input not found: {0}")]
    MissingInput(Utf8PathBuf),

    /// The scratch workspace could not be created.
    #[error("Unable to create workspace: {0}")]
    Workspace(#[source] std::io::Error),

    /// A filesystem precondition was violated before any tool ran.
    #[error("{0}")]
    Precondition(String),

    /// A document could not be parsed.
    #[error("Failed to parse {path}: {message}")]
    Parse { path: Utf8PathBuf, message: String },

    /// A path on disk is not valid UTF-8.
    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
}

/// Pattern-matchable classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An external tool is not available.
    ToolMissing,
    /// A required input file is missing.
    MissingInput,
    /// An external process failed or produced nothing.
    ProcessFailed,
    /// A filesystem precondition failed (missing output dir, workspace creation).
    Precondition,
    /// A document could not be parsed.
    Parse,
    /// Any other I/O failure.
    Io,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ToolMissing(_) => ErrorKind::ToolMissing,
            Error::MissingInput(_) => ErrorKind::MissingInput,
            Error::Spawn { .. } | Error::ProcessFailed { .. } | Error::MissingOutput { .. } => {
                ErrorKind::ProcessFailed
            }
            Error::Workspace(_) | Error::Precondition(_) => ErrorKind::Precondition,
            Error::Parse { .. } => ErrorKind::Parse,
            Error::Io(_) | Error::Zip(_) | Error::Walk(_) | Error::NonUtf8Path(_) => ErrorKind::Io,
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Error::Precondition(message.into())
    }
}
