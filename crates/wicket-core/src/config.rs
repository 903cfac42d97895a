//! Runtime configuration and the on-disk config store.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Serialized settings from `~/.wicket/config.json`.
///
/// Every field has a default so old config files keep parsing as fields are
/// added.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provider name (currently only OpenAI-compatible backends).
    pub provider: String,
    /// Chat-completions endpoint base URL.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// API key; the `OPENAI_API_KEY` environment variable wins when set.
    pub api_key: String,
    /// Optional system prompt prepended to every turn.
    pub system_prompt: Option<String>,
    /// Tool steps allowed per turn.
    pub max_tool_steps: usize,
    /// Workspace root for filesystem/shell tools; defaults to the cwd.
    pub workspace_dir: Option<PathBuf>,
    /// Directory for session records; `None` disables persistence.
    pub session_dir: Option<PathBuf>,
    /// At-rest encryption secret; `SESSION_ENCRYPTION_KEY` wins when set.
    pub session_secret: Option<String>,
    /// Idle seconds before a cached session is evicted.
    pub session_ttl_secs: u64,
    /// Seconds between eviction sweeps.
    pub session_sweep_secs: u64,
    /// Path to a JSON array of allowlisted user ids.
    pub allowlist_path: Option<PathBuf>,
    pub rate_limit: RateLimitSettings,
    pub notion: NotionSettings,
}

/// Admission-control settings shared by gateway transports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub max_messages_per_window: u32,
    pub window_secs: u64,
    pub max_connections_per_ip: u32,
}

/// Optional Notion integration; the tool registers only when a key is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionSettings {
    pub api_key: String,
    pub database_id: Option<String>,
    pub default_parent_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: String::new(),
            system_prompt: None,
            max_tool_steps: 4,
            workspace_dir: None,
            session_dir: None,
            session_secret: None,
            session_ttl_secs: 24 * 60 * 60,
            session_sweep_secs: 60 * 60,
            allowlist_path: None,
            rate_limit: RateLimitSettings::default(),
            notion: NotionSettings::default(),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_messages_per_window: 60,
            window_secs: 60,
            max_connections_per_ip: 5,
        }
    }
}

/// Helper struct for storing the location to read/write settings.
pub struct ConfigStore {
    path: PathBuf,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    pub fn new() -> Self {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".wicket");
        path.push("config.json");
        Self { path }
    }

    /// Use a custom config path (for testing).
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the saved config, or fall back to defaults.
    pub fn load(&self) -> Config {
        if let Ok(content) = fs::read_to_string(&self.path) {
            match serde_json::from_str(&content) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "unreadable config, using defaults");
                }
            }
        }
        Config::default()
    }

    /// Save the config back to disk.
    pub fn save(&self, config: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, content)
    }
}

/// Apply environment overrides for the two secrets.
pub fn apply_env_overrides(config: &mut Config) {
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if !key.is_empty() {
            config.api_key = key;
        }
    }
    if let Ok(secret) = std::env::var("SESSION_ENCRYPTION_KEY") {
        if !secret.is_empty() {
            config.session_secret = Some(secret);
        }
    }
    if let Ok(key) = std::env::var("NOTION_API_KEY") {
        if !key.is_empty() {
            config.notion.api_key = key;
        }
    }
}
