//! Application configuration management utilities.

use camino::{Utf8Path, Utf8PathBuf};
use gvault_core::{SystemToolLocator, Tool, Toolbox};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;

/// Application-wide configuration stored in config.toml.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// Explicit program paths keyed by tool name (`chdman`, `7z`, ...).
    #[serde(default)]
    pub tools: BTreeMap<String, Utf8PathBuf>,
    pub install_cache_dir: Option<Utf8PathBuf>,
    pub dat_dir: Option<Utf8PathBuf>,
    pub dat_cache_file: Option<Utf8PathBuf>,
    #[serde(default)]
    pub exit_on_failure: bool,
}

impl AppConfig {
    /// A locator that prefers the configured tool paths over `PATH`.
    ///
    /// Unknown tool names are skipped with a warning.
    pub fn tool_locator(&self) -> SystemToolLocator {
        let mut locator = SystemToolLocator::new();
        for (name, path) in &self.tools {
            match name.parse::<Tool>() {
                Ok(tool) => locator.set_override(tool, path.clone()),
                Err(e) => tracing::warn!("Ignoring configured tool: {}", e),
            }
        }
        locator
    }

    pub fn toolbox(&self) -> Toolbox {
        Toolbox::system(self.tool_locator())
    }

    /// Configured install image cache, or `install_cache` next to the executable.
    pub fn install_cache_dir(&self) -> Utf8PathBuf {
        self.install_cache_dir
            .clone()
            .or_else(|| install_dir().map(|dir| dir.join("install_cache")))
            .unwrap_or_else(|| Utf8PathBuf::from("install_cache"))
    }
}

/// Returns the directory where the current executable resides.
pub fn install_dir() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    let parent = exe.parent()?;
    Utf8PathBuf::from_path_buf(parent.to_path_buf()).ok()
}

/// Returns a config file path located next to the executable.
pub fn config_path(file_name: &str) -> Option<Utf8PathBuf> {
    install_dir().map(|dir| dir.join(file_name))
}

/// Returns the default configuration file path (config.toml).
pub fn default_config_path() -> Option<Utf8PathBuf> {
    config_path("config.toml")
}

/// Loads the application configuration from config.toml.
/// Returns default configuration if file doesn't exist or cannot be parsed.
pub fn load_config() -> AppConfig {
    default_config_path()
        .map(|path| load_config_from(&path))
        .unwrap_or_default()
}

pub fn load_config_from(path: &Utf8Path) -> AppConfig {
    if !path.exists() {
        return AppConfig::default();
    }
    match fs::read_to_string(path.as_std_path()).map(|content| toml::from_str(&content)) {
        Ok(Ok(cfg)) => cfg,
        Ok(Err(e)) => {
            tracing::warn!("Ignoring invalid config file {}: {}", path, e);
            AppConfig::default()
        }
        Err(e) => {
            tracing::warn!("Unable to read config file {}: {}", path, e);
            AppConfig::default()
        }
    }
}

/// Saves the application configuration to config.toml.
pub fn save_config(cfg: &AppConfig) -> io::Result<()> {
    match default_config_path() {
        Some(path) => save_config_to(&path, cfg),
        None => Err(io::Error::new(
            io::ErrorKind::NotFound,
            "Could not determine config path",
        )),
    }
}

pub fn save_config_to(path: &Utf8Path, cfg: &AppConfig) -> io::Result<()> {
    let content = toml::to_string_pretty(cfg).map_err(io::Error::other)?;
    fs::write(path.as_std_path(), content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gvault_core::ToolLocator;

    #[test]
    fn test_parse_config() {
        let cfg: AppConfig = toml::from_str(
            r#"
            dat_dir = "/data/dats"
            exit_on_failure = true

            [tools]
            chdman = "/opt/mame/chdman"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.dat_dir.as_deref(), Some(Utf8Path::new("/data/dats")));
        assert!(cfg.exit_on_failure);
        assert_eq!(cfg.tools["chdman"], Utf8PathBuf::from("/opt/mame/chdman"));
        assert!(cfg.dat_cache_file.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("config.toml")).unwrap();

        assert_eq!(load_config_from(&path), AppConfig::default());

        let mut cfg = AppConfig {
            install_cache_dir: Some("/cache".into()),
            ..Default::default()
        };
        cfg.tools.insert("7z".to_string(), "/usr/bin/7zz".into());
        save_config_to(&path, &cfg).unwrap();
        assert_eq!(load_config_from(&path), cfg);

        fs::write(&path, "tools = 5").unwrap();
        assert_eq!(load_config_from(&path), AppConfig::default());
    }

    #[test]
    fn test_tool_locator_uses_existing_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let chdman = Utf8PathBuf::from_path_buf(dir.path().join("chdman")).unwrap();
        fs::write(&chdman, b"").unwrap();

        let mut cfg = AppConfig::default();
        cfg.tools.insert("chdman".to_string(), chdman.clone());
        cfg.tools.insert("not-a-tool".to_string(), chdman.clone());

        assert_eq!(cfg.tool_locator().locate(Tool::Chdman), Some(chdman));
    }
}
