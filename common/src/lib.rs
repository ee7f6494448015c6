/*!
common/src/lib.rs

Shared configuration types and helpers for Newsdesk.

This file provides:
- Config data structures (deserialized from TOML)
- The closed set of news categories the pipeline polls
- An async loader that merges a default and an override TOML file
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// News topics the pipeline polls. The set is closed: anything else is a config error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    World,
    Technology,
    Economics,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::World, Category::Technology, Category::Economics];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::World => "world",
            Category::Technology => "technology",
            Category::Economics => "economics",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown category: {}", s))
    }
}

/// News API section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub api_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub language: String,
    pub country: String,
    pub categories: Vec<Category>,
    pub max_articles_per_category: usize,
    pub timeout_seconds: Option<u64>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_url: "https://newsdata.io/api/1/news".to_string(),
            api_key_env: "NEWSDATA_API_KEY".to_string(),
            language: "en".to_string(),
            country: "us".to_string(),
            categories: Category::ALL.to_vec(),
            max_articles_per_category: 3,
            timeout_seconds: None,
        }
    }
}

/// Remote chat-completion endpoint used for rewriting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key_env: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            timeout_seconds: 60,
            max_tokens: None,
            temperature: None,
        }
    }
}

/// Where rendered articles live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub articles_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            articles_dir: "articles".to_string(),
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minutes between two pipeline runs
    pub interval_minutes: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { interval_minutes: 60 }
    }
}

/// Image blocklist applied before articles are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPolicyConfig {
    pub blocked_image_hosts: Vec<String>,
}

impl Default for ContentPolicyConfig {
    fn default() -> Self {
        Self {
            blocked_image_hosts: ["getty", "reuters", "apnews", "cnn"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// HTTP server bind settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub news: NewsConfig,
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub scheduler: SchedulerConfig,
    pub content_policy: ContentPolicyConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(
        default_path: Option<&Path>,
        override_path: Option<&Path>,
    ) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value =
                    toml::from_str(&data).context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value =
                    toml::from_str(&data).context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value
            .try_into()
            .context("Failed to parse merged configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values that would only fail later, deep inside a run.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.news.api_url)
            .with_context(|| format!("invalid news.api_url: {}", self.news.api_url))?;
        url::Url::parse(&self.llm.api_url)
            .with_context(|| format!("invalid llm.api_url: {}", self.llm.api_url))?;
        if self.scheduler.interval_minutes == 0 {
            anyhow::bail!("scheduler.interval_minutes must be greater than zero");
        }
        if self.storage.articles_dir.trim().is_empty() {
            anyhow::bail!("storage.articles_dir must not be empty");
        }
        Ok(())
    }

    pub fn news_api_key(&self) -> Result<String> {
        read_key(&self.news.api_key_env)
    }

    pub fn llm_api_key(&self) -> Result<String> {
        read_key(&self.llm.api_key_env)
    }
}

fn read_key(var: &str) -> Result<String> {
    std::env::var(var).with_context(|| format!("API key env var '{}' not set", var))
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}
