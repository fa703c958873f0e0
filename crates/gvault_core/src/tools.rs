//! External tool identification and discovery.
//!
//! Components never query ambient global state to find a program. Instead a
//! [`ToolLocator`] is injected at construction (usually wrapped in a
//! [`Toolbox`](crate::Toolbox)) and asked for the path of each [`Tool`].

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// External programs the pipelines know how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tool {
    /// MAME `chdman`, for compressed disc containers.
    Chdman,
    /// 7-Zip, for generic archive and ISO9660 extraction.
    SevenZip,
    /// `extract-xiso`, for rewriting Xbox disc images.
    ExtractXiso,
    /// `ps3dec`, for decrypting PlayStation 3 disc images.
    Ps3Dec,
    /// `pkg2zip`, for unpacking PlayStation Network packages.
    Pkg2Zip,
    /// Installer image builder for computer games.
    Installer,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::Chdman,
        Tool::SevenZip,
        Tool::ExtractXiso,
        Tool::Ps3Dec,
        Tool::Pkg2Zip,
        Tool::Installer,
    ];

    /// Stable name used in configuration files and messages.
    pub fn name(self) -> &'static str {
        match self {
            Tool::Chdman => "chdman",
            Tool::SevenZip => "7z",
            Tool::ExtractXiso => "extract-xiso",
            Tool::Ps3Dec => "ps3dec",
            Tool::Pkg2Zip => "pkg2zip",
            Tool::Installer => "installer",
        }
    }

    /// Executable names searched on `PATH`, in order of preference.
    pub fn executables(self) -> &'static [&'static str] {
        match self {
            Tool::Chdman => &["chdman"],
            Tool::SevenZip => &["7z", "7zz", "7za"],
            Tool::ExtractXiso => &["extract-xiso"],
            Tool::Ps3Dec => &["ps3dec", "PS3Dec"],
            Tool::Pkg2Zip => &["pkg2zip"],
            Tool::Installer => &["gvault-installer"],
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Tool::ALL
            .into_iter()
            .find(|tool| tool.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown tool '{}'", s))
    }
}

/// Resolves tools to runnable program paths.
pub trait ToolLocator: Send + Sync {
    /// Return the program path for `tool`, or `None` if it is not available.
    fn locate(&self, tool: Tool) -> Option<Utf8PathBuf>;

    /// Like [`locate`](Self::locate), but a missing tool is an error.
    fn require(&self, tool: Tool) -> Result<Utf8PathBuf> {
        self.locate(tool).ok_or(Error::ToolMissing(tool))
    }
}

/// Locator backed by explicit configuration and the system `PATH`.
///
/// Explicit paths win over `PATH` lookup. An explicit path that does not exist
/// on disk is ignored with a warning.
#[derive(Debug, Clone, Default)]
pub struct SystemToolLocator {
    overrides: HashMap<Tool, Utf8PathBuf>,
}

impl SystemToolLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `path` for `tool` instead of searching `PATH`.
    pub fn with_override(mut self, tool: Tool, path: impl Into<Utf8PathBuf>) -> Self {
        self.overrides.insert(tool, path.into());
        self
    }

    pub fn set_override(&mut self, tool: Tool, path: impl Into<Utf8PathBuf>) {
        self.overrides.insert(tool, path.into());
    }

    fn search_path(tool: Tool) -> Option<Utf8PathBuf> {
        for exe in tool.executables() {
            if let Ok(path) = which::which(exe) {
                match Utf8PathBuf::from_path_buf(path) {
                    Ok(path) => return Some(path),
                    Err(path) => {
                        tracing::warn!("Skipping non-UTF-8 tool path: {}", path.display());
                    }
                }
            }
        }
        None
    }
}

impl ToolLocator for SystemToolLocator {
    fn locate(&self, tool: Tool) -> Option<Utf8PathBuf> {
        if let Some(path) = self.overrides.get(&tool) {
            if Utf8Path::new(path).exists() {
                return Some(path.clone());
            }
            tracing::warn!("Configured {} path does not exist: {}", tool, path);
        }

        let found = Self::search_path(tool);
        if found.is_none() {
            tracing::debug!("{} not found in PATH", tool);
        }
        found
    }
}
