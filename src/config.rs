use crate::error::MocError;
use serde::{Deserialize, Serialize};
use std::{
    fs::{create_dir_all, read_to_string, write},
    path::{Path, PathBuf},
    time::Duration,
};

/// Directory (relative to the vault root) holding the default config file.
pub const CONFIG_DIR: &str = ".moc";
pub const CONFIG_FILE: &str = "config.toml";

/// How references inside a region block are rendered.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkFormat {
    /// `[[Projects/A/Index]]`
    #[default]
    Wiki,
    /// `[Index](A/Index.md)`, relative to the document holding the block
    Markdown,
}

/// Quiet windows for the debounced triggers, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub links_update_ms: u64,
    pub tree_update_ms: u64,
    pub rename_ms: u64,
    pub session_timeout_ms: u64,
    pub watcher_debounce_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            links_update_ms: 15_000,
            tree_update_ms: 100,
            rename_ms: 50,
            session_timeout_ms: 500,
            watcher_debounce_ms: 200,
        }
    }
}

impl Timing {
    pub fn links_update(&self) -> Duration {
        Duration::from_millis(self.links_update_ms)
    }

    pub fn tree_update(&self) -> Duration {
        Duration::from_millis(self.tree_update_ms)
    }

    pub fn rename(&self) -> Duration {
        Duration::from_millis(self.rename_ms)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn watcher_debounce(&self) -> Duration {
        Duration::from_millis(self.watcher_debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MocConfig {
    pub marker_key: String,
    pub marker_value: String,
    pub header: String,
    pub index_prefix: String,
    pub index_suffix: String,
    pub excluded_paths: Vec<String>,
    pub folder_emoji: String,
    pub link_format: LinkFormat,
    pub auto_create_index: bool,
    pub auto_rename_index: bool,
    pub timing: Timing,
}

impl Default for MocConfig {
    fn default() -> Self {
        MocConfig {
            marker_key: "type".to_string(),
            marker_value: "moc".to_string(),
            header: "MOC Links:".to_string(),
            index_prefix: String::new(),
            index_suffix: String::new(),
            excluded_paths: Vec::new(),
            folder_emoji: String::new(),
            link_format: LinkFormat::Wiki,
            auto_create_index: true,
            auto_rename_index: true,
            timing: Timing::default(),
        }
    }
}

impl MocConfig {
    /// True when any configured exclusion is a substring of `path`.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_paths
            .iter()
            .filter(|excluded| !excluded.is_empty())
            .any(|excluded| path.contains(excluded.as_str()))
    }

    /// File name an index file for a folder named `folder_name` should carry. The emoji
    /// prefix is not part of the index name.
    pub fn index_file_name(&self, folder_name: &str) -> String {
        let display = self.strip_emoji(folder_name);
        format!("{}{}{}.md", self.index_prefix, display, self.index_suffix)
    }

    pub fn strip_emoji<'a>(&self, folder_name: &'a str) -> &'a str {
        if self.folder_emoji.is_empty() {
            folder_name
        } else {
            folder_name
                .strip_prefix(self.folder_emoji.as_str())
                .unwrap_or(folder_name)
        }
    }

    /// The name a user-renamed folder should be corrected to, if any.
    pub fn emoji_folder_name(&self, folder_name: &str) -> Option<String> {
        if self.folder_emoji.is_empty() || folder_name.starts_with(self.folder_emoji.as_str()) {
            None
        } else {
            Some(format!("{}{}", self.folder_emoji, folder_name))
        }
    }
}

pub trait ConfigProvider: Send + Sync {
    fn get_config(&self) -> Result<MocConfig, MocError>;
    fn set_config(&self, config: &MocConfig) -> Result<(), MocError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }

    /// Provider for the default location inside a vault: `<root>/.moc/config.toml`.
    pub fn for_vault(root: &Path) -> Self {
        TomlConfigProvider::new(root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<MocConfig, MocError> {
        tracing::debug!("Attempting to read config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(MocConfig::default());
        }
        let content = read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    fn set_config(&self, config: &MocConfig) -> Result<(), MocError> {
        tracing::debug!("Attempting to write config to: {:?}", &self.path);
        if let Some(dir) = self.path.parent() {
            create_dir_all(dir)?;
        }
        let toml_string = toml::to_string(config)?;
        write(&self.path, toml_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use test_log::test;

    #[test]
    fn test_missing_config_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let provider = TomlConfigProvider::for_vault(dir.path());
        assert_eq!(provider.get_config().unwrap(), MocConfig::default());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let provider = TomlConfigProvider::for_vault(dir.path());
        std::fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(
            provider.path(),
            "marker_key = \"kind\"\nlink_format = \"markdown\"\n[timing]\nrename_ms = 5\n",
        )
        .unwrap();

        let config = provider.get_config().unwrap();
        assert_eq!(config.marker_key, "kind");
        assert_eq!(config.marker_value, "moc");
        assert_eq!(config.link_format, LinkFormat::Markdown);
        assert_eq!(config.timing.rename_ms, 5);
        assert_eq!(config.timing.session_timeout_ms, 500);
    }

    #[test]
    fn test_config_roundtrip_through_provider() {
        let dir = TempDir::new().unwrap();
        let provider = TomlConfigProvider::for_vault(dir.path());
        let config = MocConfig {
            folder_emoji: "📁".to_string(),
            excluded_paths: vec!["Archive".to_string()],
            ..Default::default()
        };
        provider.set_config(&config).unwrap();
        assert_eq!(provider.get_config().unwrap(), config);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let provider = TomlConfigProvider::for_vault(dir.path());
        std::fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(provider.path(), "marker_key = [").unwrap();
        assert!(matches!(
            provider.get_config(),
            Err(MocError::Serialization(_))
        ));
    }

    #[test]
    fn test_naming_helpers() {
        let config = MocConfig {
            index_prefix: "_".to_string(),
            index_suffix: " MOC".to_string(),
            folder_emoji: "📁".to_string(),
            excluded_paths: vec!["Templates".to_string(), String::new()],
            ..Default::default()
        };
        assert_eq!(config.index_file_name("📁Projects"), "_Projects MOC.md");
        assert_eq!(config.index_file_name("Projects"), "_Projects MOC.md");
        assert_eq!(
            config.emoji_folder_name("Projects"),
            Some("📁Projects".to_string())
        );
        assert_eq!(config.emoji_folder_name("📁Projects"), None);
        assert!(config.is_excluded("Templates/daily.md"));
        assert!(!config.is_excluded("Projects/Index.md"));
    }
}
