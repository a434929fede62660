// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for tidyfile

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Result, TidyError};

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// AI engine configuration
    #[serde(default)]
    pub ai_engine: EngineConfig,

    /// Offline (debug) categorization settings
    #[serde(default)]
    pub offline: OfflineConfig,

    /// Scanner settings
    #[serde(default)]
    pub scan: ScanConfig,

    /// Move rules
    #[serde(default)]
    pub rules: RuleConfig,

    /// Prompt template
    #[serde(default)]
    pub prompts: PromptConfig,

    /// Categories suggested to the model
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    /// Move history settings
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Hosted model provider
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    Ollama,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineConfig {
    #[serde(default = "default_provider")]
    pub provider: Provider,
    /// Provider base URL; empty means the provider's default
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Inline API key (the environment variable is preferred)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retries: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// How offline mode picks labels
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OfflineStrategy {
    /// Infer from extension and name
    Extension,
    /// Always the configured label
    Fixed,
    /// Random pick from the category list
    Random,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OfflineConfig {
    #[serde(default = "default_strategy")]
    pub strategy: OfflineStrategy,
    #[serde(default = "default_fixed_label")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScanConfig {
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub include_folders: bool,
    #[serde(default)]
    pub include_excerpts: bool,
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
    /// Glob patterns matched against entry names
    #[serde(default)]
    pub ignore: Vec<String>,
}

/// What to do when the destination name is taken
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Leave both files alone and report the item as failed
    Skip,
    /// Append a numeric suffix until the name is free
    Rename,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RuleConfig {
    #[serde(default = "default_collision")]
    pub on_collision: CollisionPolicy,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_categorize_prompt")]
    pub categorize: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_history_path")]
    pub path: String,
}

// Default value functions
fn default_provider() -> Provider { Provider::Gemini }
fn default_model() -> String { "gemini-2.0-flash-lite".to_string() }
fn default_api_key_env() -> String { "GEMINI_API_KEY".to_string() }
fn default_timeout() -> u64 { 120 }
fn default_batch_size() -> usize { 20 }
fn default_strategy() -> OfflineStrategy { OfflineStrategy::Extension }
fn default_fixed_label() -> String { "Misc".to_string() }
fn default_excerpt_chars() -> usize { 500 }
fn default_collision() -> CollisionPolicy { CollisionPolicy::Skip }
fn default_true() -> bool { true }
fn default_history_path() -> String { "tidyfile_history.jsonl".to_string() }

/// Upper bound for `ai_engine.retries`; the last backoff is then 2^9 seconds
pub const MAX_RETRIES: u32 = 10;

pub fn default_categories() -> Vec<String> {
    [
        "Sims/Custom_Content",
        "Sims/Mods",
        "Sims/Saves",
        "3D_Assets/Models",
        "3D_Assets/Prints",
        "Documents/Taxes",
        "Documents/Statements",
        "Software",
        "Archives",
        "Images",
        "Torrents",
        "Contacts",
        "Misc",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_categorize_prompt() -> String {
    "You are an expert file organizer. Analyze the following list of file names and extensions. \
     For each file, determine a concise, descriptive folder path. \
     The path can be one or two levels deep, using a forward slash (/) as a separator \
     (e.g., 'Sims/Mods', 'Documents/Taxes'). \
     Use the following standardized categories where appropriate, but you can also create new, \
     fitting categories if needed:"
        .to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ai_engine: EngineConfig::default(),
            offline: OfflineConfig::default(),
            scan: ScanConfig::default(),
            rules: RuleConfig::default(),
            prompts: PromptConfig::default(),
            categories: default_categories(),
            history: HistoryConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: String::new(),
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout(),
            retries: 0,
            batch_size: default_batch_size(),
        }
    }
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            label: default_fixed_label(),
            seed: None,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            include_folders: false,
            include_excerpts: false,
            excerpt_chars: default_excerpt_chars(),
            ignore: Vec::new(),
        }
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            on_collision: default_collision(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            categorize: default_categorize_prompt(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_history_path(),
        }
    }
}

impl EngineConfig {
    /// Base URL with the provider default applied and trailing slashes removed
    pub fn resolved_base_url(&self) -> String {
        let url = if self.base_url.trim().is_empty() {
            match self.provider {
                Provider::Gemini => "https://generativelanguage.googleapis.com",
                Provider::Ollama => "http://localhost:11434",
            }
        } else {
            self.base_url.trim()
        };
        url.trim_end_matches('/').to_string()
    }

    /// API key from the config, falling back to the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| TidyError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.ai_engine.batch_size == 0 {
            return Err(TidyError::Config("ai_engine.batch_size must be at least 1".to_string()));
        }
        if self.ai_engine.retries > MAX_RETRIES {
            return Err(TidyError::Config(format!(
                "ai_engine.retries must be at most {}",
                MAX_RETRIES
            )));
        }
        if self.ai_engine.timeout_secs == 0 {
            return Err(TidyError::Config("ai_engine.timeout_secs must be at least 1".to_string()));
        }
        if self.ai_engine.model.trim().is_empty() {
            return Err(TidyError::Config("ai_engine.model must not be empty".to_string()));
        }
        if self.offline.strategy == OfflineStrategy::Fixed && self.offline.label.trim().is_empty() {
            return Err(TidyError::Config("offline.label must not be empty".to_string()));
        }
        for pattern in &self.scan.ignore {
            glob::Pattern::new(pattern).map_err(|e| {
                TidyError::Config(format!("Invalid ignore pattern '{}': {}", pattern, e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"ai_engine": {"provider": "ollama", "model": "llama3.2:3b"}}"#)
                .unwrap();
        assert_eq!(config.ai_engine.provider, Provider::Ollama);
        assert_eq!(config.ai_engine.batch_size, 20);
        assert_eq!(config.ai_engine.retries, 0);
        assert_eq!(config.rules.on_collision, CollisionPolicy::Skip);
        assert_eq!(config.categories.len(), 13);
        assert!(config.history.enabled);
        assert_eq!(config.ai_engine.resolved_base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tidyfile.json");

        let mut config = AppConfig::default();
        config.scan.recursive = true;
        config.offline.strategy = OfflineStrategy::Random;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert!(loaded.scan.recursive);
        assert_eq!(loaded.offline.strategy, OfflineStrategy::Random);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config.ai_engine.model, "gemini-2.0-flash-lite");
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let mut config = AppConfig::default();
        config.ai_engine.batch_size = 0;
        assert!(matches!(config.validate(), Err(TidyError::Config(_))));
    }

    #[test]
    fn test_validate_bounds_retries_and_timeout() {
        let mut config = AppConfig::default();
        config.ai_engine.retries = MAX_RETRIES;
        assert!(config.validate().is_ok());

        config.ai_engine.retries = 65;
        assert!(matches!(config.validate(), Err(TidyError::Config(_))));

        config.ai_engine.retries = 0;
        config.ai_engine.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(TidyError::Config(_))));
    }

    #[test]
    fn test_api_key_from_env() {
        let var = "TIDYFILE_TEST_API_KEY_FROM_ENV";
        std::env::set_var(var, "from-env");
        let engine = EngineConfig {
            api_key: None,
            api_key_env: var.to_string(),
            ..EngineConfig::default()
        };
        assert_eq!(engine.resolved_api_key().as_deref(), Some("from-env"));

        let blank = EngineConfig {
            api_key: Some("  ".to_string()),
            ..engine.clone()
        };
        assert_eq!(blank.resolved_api_key().as_deref(), Some("from-env"));
        std::env::remove_var(var);
    }

    #[test]
    fn test_validate_rejects_bad_glob() {
        let mut config = AppConfig::default();
        config.scan.ignore = vec!["[".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let engine = EngineConfig {
            base_url: "http://example.test:8080/".to_string(),
            ..EngineConfig::default()
        };
        assert_eq!(engine.resolved_base_url(), "http://example.test:8080");
    }

    #[test]
    fn test_inline_api_key_wins() {
        let engine = EngineConfig {
            api_key: Some("abc".to_string()),
            api_key_env: "TIDYFILE_TEST_UNSET_KEY".to_string(),
            ..EngineConfig::default()
        };
        assert_eq!(engine.resolved_api_key().as_deref(), Some("abc"));
    }
}
