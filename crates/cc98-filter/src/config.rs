//! Configuration management for cc98-filter.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults. The
//! fragment-shape selectors live here too: they describe the forum markup,
//! not the filtering logic, and can be overridden without a rebuild.

use std::path::PathBuf;
use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::dom::Selector;
use crate::error::{Error, Result};
use crate::filter::SurfaceTable;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "cc98-filter";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "blocklist.db";

/// Environment variable prefix.
const ENV_PREFIX: &str = "CC98_FILTER_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `CC98_FILTER_`, `__` between levels)
/// 2. TOML config file at `~/.config/cc98-filter/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Filter engine configuration.
    pub engine: EngineConfig,
    /// Placeholder text written into redacted fragments.
    pub labels: LabelConfig,
    /// DOM attributes used to mark processed fragments.
    pub markers: MarkerConfig,
    /// Fragment-shape selectors per surface.
    pub selectors: SelectorConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/cc98-filter/blocklist.db`
    pub database_path: Option<PathBuf>,
}

/// Filter engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Delay before a re-scan after a relevant mutation batch, in milliseconds.
    pub debounce_ms: u64,
    /// Selector of the subtree the mutation watcher observes.
    pub observe_root: String,
    /// Private-message surfaces are only processed on pages under this URL.
    pub message_page_prefix: String,
    /// Image written into redacted avatars.
    pub icon_url: String,
    /// Restore redacted fragments when their owner is no longer blocked.
    pub restore_on_unblock: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            observe_root: "body".to_string(),
            message_page_prefix: "https://www.cc98.org/message/message".to_string(),
            icon_url: "icons/icon.png".to_string(),
            restore_on_unblock: true,
        }
    }
}

/// Placeholder text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Replaces a blocked user's name.
    pub blocked_user: String,
    /// Replaces content when the user has no custom label.
    pub default_content: String,
    /// Replaces a topic's info line.
    pub info_placeholder: String,
    /// Prefix of the timestamp line in a redacted reply body.
    pub blocked_time_prefix: String,
    /// chrono format of that timestamp, rendered in local time.
    pub time_format: String,
    /// Paragraphs of the panel that replaces a withheld message window.
    pub window_lines: Vec<String>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            blocked_user: "该用户已被屏蔽".to_string(),
            default_content: "此用户的内容已被屏蔽".to_string(),
            info_placeholder: "内容已屏蔽".to_string(),
            blocked_time_prefix: "屏蔽时间".to_string(),
            time_format: "%Y/%-m/%-d %H:%M:%S".to_string(),
            window_lines: vec![
                "若干坏情绪已被卷入神秘空间".to_string(),
                "☘\u{fe0e}".repeat(22),
            ],
        }
    }
}

/// Marker attribute names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Set on fragments whose user content was redacted.
    pub redacted: String,
    /// Set on fragments hidden because of their board.
    pub board_blocked: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            redacted: "data-cc98-filter-redacted".to_string(),
            board_blocked: "data-cc98-board-blocked".to_string(),
        }
    }
}

/// Selectors for one content surface.
///
/// Single-node fields (`board`, `username`, `avatar`, `title`, `body`,
/// `info`, `preview`) are ordered fallback chains: the first entry that
/// matches anything inside the fragment wins. Multi-node fields (`media`,
/// `chrome`) act on every match of every entry. An empty list means the
/// surface has no such field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSelectors {
    /// Fragment shape; entries are combined into one selector list.
    pub fragment: Vec<String>,
    /// Element whose text is the owning board.
    pub board: Vec<String>,
    /// Element whose text is the owning username.
    pub username: Vec<String>,
    /// Avatar image.
    pub avatar: Vec<String>,
    /// Title link.
    pub title: Vec<String>,
    /// Post body.
    pub body: Vec<String>,
    /// Info or meta line.
    pub info: Vec<String>,
    /// Embedded media regions, emptied on redaction.
    pub media: Vec<String>,
    /// Secondary chrome, removed on redaction.
    pub chrome: Vec<String>,
    /// Message preview, emptied on redaction.
    pub preview: Vec<String>,
}

/// Selectors for the open conversation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSelectors {
    /// Window shape.
    pub fragment: Vec<String>,
    /// Title element.
    pub title: Vec<String>,
    /// Regex with one capture group for the correspondent's username.
    pub title_pattern: String,
}

impl Default for WindowSelectors {
    fn default() -> Self {
        Self {
            fragment: strings(&[".message-message-window"]),
            title: strings(&[".message-message-wTitle"]),
            title_pattern: r"与\s+(.+?)\s+的私信".to_string(),
        }
    }
}

/// Selector tables for every surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Topic cards in both markup generations.
    pub topic: SurfaceSelectors,
    /// Reply posts.
    pub reply: SurfaceSelectors,
    /// Hot list rows.
    pub hot_list: SurfaceSelectors,
    /// Private-message contact entries.
    pub message_contact: SurfaceSelectors,
    /// The open private-message window.
    pub message_window: WindowSelectors,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            topic: SurfaceSelectors {
                fragment: strings(&[".focus-topic", ".card-topic"]),
                board: strings(&[
                    ".card-topic-boardName a",
                    ".card-topic-boardName",
                    ".focus-topic-board",
                    ".board-name, .board-link",
                ]),
                username: strings(&[".focus-topic-userName", ".card-topic-userName"]),
                avatar: strings(&[
                    ".focus-topic-portraitUrl",
                    ".card-topic-portraitUrl",
                    r#"img[class*="portrait"]"#,
                    r#"img[class*="avatar"]"#,
                ]),
                title: strings(&[".focus-topic-title", ".card-topic-title"]),
                info: strings(&[".focus-topic-info", ".card-topic-info"]),
                media: strings(&[
                    ".card-topic-thumbnail-mini",
                    ".card-topic-original-image",
                    ".card-topic-thumbnail",
                ]),
                ..SurfaceSelectors::default()
            },
            reply: SurfaceSelectors {
                fragment: strings(&[".reply"]),
                username: strings(&[".userMessage-userName"]),
                avatar: strings(&[
                    ".userPortrait",
                    r#"img[class*="portrait"]"#,
                    r#"img[class*="avatar"]"#,
                    ".userMessage-right img",
                ]),
                body: strings(&[".substance"]),
                chrome: strings(&[
                    r#".column[style*="width: 60%;"]"#,
                    ".userGender",
                    ".row.userMessageBtn",
                    r#".column[style*="margin-top: 1rem; width: 52rem;"]"#,
                    ".signature",
                    ".noticeSuccess",
                    ".reply-floor",
                ]),
                ..SurfaceSelectors::default()
            },
            hot_list: SurfaceSelectors {
                fragment: strings(&[".mainPageListRow"]),
                board: strings(&[".mainPageListBoardName a"]),
                ..SurfaceSelectors::default()
            },
            message_contact: SurfaceSelectors {
                fragment: strings(&[".message-message-person"]),
                username: strings(&[".message-message-pName"]),
                avatar: strings(&[".message-message-pPortraitUrl"]),
                preview: strings(&[".message-message-pMessage"]),
                ..SurfaceSelectors::default()
            },
            message_window: WindowSelectors::default(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `CC98_FILTER_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// Every selector, the window title pattern and the time format must parse.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.engine.debounce_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "debounce_ms must be greater than 0".to_string(),
            });
        }

        if self.markers.redacted.trim().is_empty() || self.markers.board_blocked.trim().is_empty()
        {
            return Err(Error::ConfigValidation {
                message: "marker attribute names must not be empty".to_string(),
            });
        }

        if self.markers.redacted == self.markers.board_blocked {
            return Err(Error::ConfigValidation {
                message: format!(
                    "redacted and board_blocked markers must differ (both '{}')",
                    self.markers.redacted
                ),
            });
        }

        if StrftimeItems::new(&self.labels.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::ConfigValidation {
                message: format!("invalid time_format '{}'", self.labels.time_format),
            });
        }

        Selector::parse(&self.engine.observe_root)?;
        SurfaceTable::compile(&self.selectors)?;
        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the debounce delay as a Duration.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.engine.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.engine.debounce_ms, 100);
        assert_eq!(config.engine.observe_root, "body");
        assert!(config.engine.restore_on_unblock);
        assert_eq!(config.labels.blocked_user, "该用户已被屏蔽");
        assert_eq!(config.markers.board_blocked, "data-cc98-board-blocked");
    }

    #[test]
    fn test_default_engine_config() {
        let engine = EngineConfig::default();

        assert_eq!(engine.icon_url, "icons/icon.png");
        assert_eq!(
            engine.message_page_prefix,
            "https://www.cc98.org/message/message"
        );
    }

    #[test]
    fn test_default_labels() {
        let labels = LabelConfig::default();

        assert_eq!(labels.default_content, "此用户的内容已被屏蔽");
        assert_eq!(labels.info_placeholder, "内容已屏蔽");
        assert_eq!(labels.window_lines.len(), 2);
        assert_eq!(labels.window_lines[1].chars().filter(|c| *c == '☘').count(), 22);
    }

    #[test]
    fn test_default_selectors_keep_variant_order() {
        let selectors = SelectorConfig::default();

        assert_eq!(
            selectors.topic.username,
            vec![".focus-topic-userName", ".card-topic-userName"]
        );
        assert_eq!(selectors.topic.board[0], ".card-topic-boardName a");
        assert!(selectors.reply.board.is_empty());
        assert!(selectors.hot_list.username.is_empty());
        assert_eq!(selectors.reply.chrome.len(), 7);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_debounce() {
        let mut config = Config::default();
        config.engine.debounce_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("debounce_ms"));
    }

    #[test]
    fn test_validate_same_markers() {
        let mut config = Config::default();
        config.markers.board_blocked = config.markers.redacted.clone();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("must differ"));
    }

    #[test]
    fn test_validate_empty_marker() {
        let mut config = Config::default();
        config.markers.redacted = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_selector() {
        let mut config = Config::default();
        config.selectors.reply.username = vec![".userMessage-userName[".to_string()];

        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidSelector { .. }));
    }

    #[test]
    fn test_validate_invalid_observe_root() {
        let mut config = Config::default();
        config.engine.observe_root = ">".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_title_pattern() {
        let mut config = Config::default();
        config.selectors.message_window.title_pattern = "(unclosed".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("title_pattern"));
    }

    #[test]
    fn test_validate_invalid_time_format() {
        let mut config = Config::default();
        config.labels.time_format = "%Y %Q".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("time_format"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("blocklist.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_debounce() {
        let config = Config::default();
        assert_eq!(config.debounce(), Duration::from_millis(100));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("cc98-filter"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), Config::default());
    }

    #[test]
    fn test_load_toml_override() {
        let dir = std::env::temp_dir().join(format!("cc98-filter-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            r#"
[engine]
debounce_ms = 250

[selectors.reply]
username = [".author"]
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.engine.debounce_ms, 250);
        assert_eq!(config.selectors.reply.username, vec![".author"]);
        // Untouched keys keep their defaults.
        assert_eq!(config.selectors.reply.body, vec![".substance"]);
        assert_eq!(config.engine.observe_root, "body");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_rejects_invalid_toml_values() {
        let dir =
            std::env::temp_dir().join(format!("cc98-filter-config-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[engine]\ndebounce_ms = 0\n").unwrap();

        assert!(Config::load_from(Some(path)).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_engine_config_deserialize_partial() {
        let json = r#"{"debounce_ms": 40}"#;
        let engine: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(engine.debounce_ms, 40);
        assert!(engine.restore_on_unblock);
    }

    #[test]
    fn test_config_serialize() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("message_page_prefix"));
        assert!(json.contains("title_pattern"));
    }
}
