use camino::Utf8PathBuf;
use gvault_core::{ErrorKind, Tool};
use gvault_dat::DatError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Required tool '{tool}' is not installed")]
    #[diagnostic(
        code(tool::missing),
        help("Install the tool and add it to PATH, or run 'gvault config set-tool <tool> <path>'")
    )]
    ToolMissing { tool: Tool },

    #[error("Required input not found: {path}")]
    #[diagnostic(
        code(input::missing),
        help("Make sure the file exists and the path is correct")
    )]
    MissingInput { path: Utf8PathBuf },

    #[error("External tool failed")]
    #[diagnostic(
        code(tool::failed),
        help("Re-run with --verbose to see the full command line")
    )]
    ToolFailed {
        #[source]
        source: gvault_core::Error,
    },

    #[error("{message}")]
    #[diagnostic(code(fs::precondition))]
    Precondition { message: String },

    #[error("Failed to parse input")]
    #[diagnostic(
        code(parse::failed),
        help("Check the file for syntax errors")
    )]
    Parse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Operation failed")]
    #[diagnostic(code(io::operation_failed))]
    Operation {
        #[source]
        source: gvault_core::Error,
    },

    #[error("DAT catalog error")]
    #[diagnostic(
        code(dat::failed),
        help("Check the DAT directory and cache file settings with 'gvault config show'")
    )]
    Catalog {
        #[source]
        source: DatError,
    },

    #[error("No DAT source configured")]
    #[diagnostic(
        code(dat::no_source),
        help("Pass --dat-dir or --cache-file, or set dat_dir in config.toml")
    )]
    NoDatSource,

    #[error("{failed} of {total} items failed")]
    #[diagnostic(code(batch::failed))]
    BatchFailed { failed: usize, total: usize },

    #[error("Invalid game description: {message}")]
    #[diagnostic(
        code(transform::invalid_game),
        help("Pass --game-json, or all of --name, --category and --subcategory")
    )]
    InvalidGame { message: String },

    #[error("Failed to update configuration")]
    #[diagnostic(code(config::write_failed))]
    ConfigWrite {
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn invalid_game(message: impl Into<String>) -> Self {
        Self::InvalidGame {
            message: message.into(),
        }
    }
}

impl From<gvault_core::Error> for CliError {
    fn from(error: gvault_core::Error) -> Self {
        match error {
            gvault_core::Error::ToolMissing(tool) => Self::ToolMissing { tool },
            gvault_core::Error::MissingInput(path) => Self::MissingInput { path },
            error => match error.kind() {
                ErrorKind::ProcessFailed => Self::ToolFailed { source: error },
                ErrorKind::Precondition => Self::Precondition {
                    message: error.to_string(),
                },
                ErrorKind::Parse => Self::Parse {
                    source: Box::new(error),
                },
                _ => Self::Operation { source: error },
            },
        }
    }
}

impl From<DatError> for CliError {
    fn from(error: DatError) -> Self {
        match error {
            DatError::Core(error) => error.into(),
            error => Self::Catalog { source: error },
        }
    }
}
