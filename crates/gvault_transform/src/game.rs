//! Game descriptors and platform classification.

use camino::{Utf8Path, Utf8PathBuf};
use gvault_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level platform family of a game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GameCategory {
    Computer,
    Microsoft,
    Sony,
    Other(String),
}

impl GameCategory {
    pub fn as_str(&self) -> &str {
        match self {
            GameCategory::Computer => "Computer",
            GameCategory::Microsoft => "Microsoft",
            GameCategory::Sony => "Sony",
            GameCategory::Other(name) => name,
        }
    }
}

impl From<String> for GameCategory {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Computer" => GameCategory::Computer,
            "Microsoft" => GameCategory::Microsoft,
            "Sony" => GameCategory::Sony,
            _ => GameCategory::Other(value),
        }
    }
}

impl From<&str> for GameCategory {
    fn from(value: &str) -> Self {
        GameCategory::from(value.to_string())
    }
}

impl From<GameCategory> for String {
    fn from(value: GameCategory) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for GameCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Specific platform within a [`GameCategory`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GameSubcategory {
    Xbox,
    Xbox360,
    PlayStation3,
    PlayStationNetworkPs3,
    PlayStationNetworkVita,
    Other(String),
}

impl GameSubcategory {
    pub fn as_str(&self) -> &str {
        match self {
            GameSubcategory::Xbox => "Microsoft Xbox",
            GameSubcategory::Xbox360 => "Microsoft Xbox 360",
            GameSubcategory::PlayStation3 => "Sony PlayStation 3",
            GameSubcategory::PlayStationNetworkPs3 => "Sony PlayStation Network - PlayStation 3",
            GameSubcategory::PlayStationNetworkVita => "Sony PlayStation Network - PlayStation Vita",
            GameSubcategory::Other(name) => name,
        }
    }
}

impl From<String> for GameSubcategory {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Microsoft Xbox" => GameSubcategory::Xbox,
            "Microsoft Xbox 360" => GameSubcategory::Xbox360,
            "Sony PlayStation 3" => GameSubcategory::PlayStation3,
            "Sony PlayStation Network - PlayStation 3" => GameSubcategory::PlayStationNetworkPs3,
            "Sony PlayStation Network - PlayStation Vita" => GameSubcategory::PlayStationNetworkVita,
            _ => GameSubcategory::Other(value),
        }
    }
}

impl From<&str> for GameSubcategory {
    fn from(value: &str) -> Self {
        GameSubcategory::from(value.to_string())
    }
}

impl From<GameSubcategory> for String {
    fn from(value: GameSubcategory) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for GameSubcategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of one game handed to the pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDescriptor {
    pub name: String,
    pub category: GameCategory,
    pub subcategory: GameSubcategory,
    /// Directory holding the game's source media and sidecar files.
    pub source_dir: Utf8PathBuf,
    /// Main source file, if the descriptor names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<Utf8PathBuf>,
}

impl GameDescriptor {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<GameCategory>,
        subcategory: impl Into<GameSubcategory>,
        source_dir: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            subcategory: subcategory.into(),
            source_dir: source_dir.into(),
            source_file: None,
        }
    }

    pub fn with_source_file(mut self, source_file: impl Into<Utf8PathBuf>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }

    /// Load a descriptor from a JSON file.
    ///
    /// Relative `sourceDir`/`sourceFile` values are resolved against the
    /// descriptor's own directory.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_std_path())?;
        let mut game: Self = serde_json::from_str(&contents).map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let base = path.parent().unwrap_or(Utf8Path::new(""));
        if game.source_dir.is_relative() {
            game.source_dir = base.join(&game.source_dir);
        }
        if let Some(file) = game.source_file.as_mut() {
            if file.is_relative() {
                *file = base.join(&*file);
            }
        }
        Ok(game)
    }

    /// Check that the name and classification are usable as single path
    /// components, since they name cache and output directories.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("name", self.name.as_str()),
            ("category", self.category.as_str()),
            ("subcategory", self.subcategory.as_str()),
        ] {
            if !is_path_component(value) {
                return Err(Error::precondition(format!(
                    "Game {} '{}' is not a valid file name",
                    field, value
                )));
            }
        }
        Ok(())
    }

    /// Name without trailing region/version tags, see [`regular_name`].
    pub fn regular_name(&self) -> &str {
        regular_name(&self.name)
    }
}

fn is_path_component(value: &str) -> bool {
    !value.trim().is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\', '\0'])
}

/// Strip trailing `(...)`/`[...]` tags from a game name.
///
/// `"Game (USA) [v1.2]"` becomes `"Game"`. Names made only of tags are
/// returned unchanged.
pub fn regular_name(name: &str) -> &str {
    let cut = [" (", " ["]
        .iter()
        .filter_map(|tag| name.find(tag))
        .min()
        .unwrap_or(name.len());
    let regular = name[..cut].trim();
    if regular.is_empty() {
        name
    } else {
        regular
    }
}
