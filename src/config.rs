use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

const APP_DIR: &str = "tg-aggregator";

/// Tag names the mock tagger samples from.
pub const DEFAULT_TAG_VOCABULARY: [&str; 15] = [
    "machine-learning",
    "deep-learning",
    "neural-networks",
    "nlp",
    "computer-vision",
    "reinforcement-learning",
    "pytorch",
    "tensorflow",
    "research",
    "paper",
    "tutorial",
    "dataset",
    "model",
    "architecture",
    "optimization",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// How many recent messages a newly registered channel backfills on its first scrape.
    #[serde(default = "default_initial_history_limit")]
    pub initial_history_limit: i64,

    #[serde(default = "default_scrape_limit")]
    pub default_scrape_limit: usize,

    #[serde(default = "default_max_scrape_limit")]
    pub max_scrape_limit: usize,

    #[serde(default = "default_scrape_concurrency")]
    pub scrape_concurrency: usize,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default = "default_tag_vocabulary")]
    pub tag_vocabulary: Vec<String>,

    #[serde(default)]
    pub channels: Vec<ChannelSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_base_url")]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Upper bound on preview pages walked for a single fetch.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

/// A channel registered at startup without a live lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSeed {
    pub username: String,
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("posts.db").to_string_lossy().to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_initial_history_limit() -> i64 {
    5
}

fn default_scrape_limit() -> usize {
    100
}

fn default_max_scrape_limit() -> usize {
    1000
}

fn default_scrape_concurrency() -> usize {
    4
}

fn default_tag_vocabulary() -> Vec<String> {
    DEFAULT_TAG_VOCABULARY.iter().map(|s| s.to_string()).collect()
}

fn default_telegram_base_url() -> String {
    "https://t.me".to_string()
}

fn default_user_agent() -> String {
    "tg-aggregator/0.1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_pages() -> usize {
    50
}

fn default_true() -> bool {
    true
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            base_url: default_telegram_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_pages: default_max_pages(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            host: default_host(),
            port: default_port(),
            api_prefix: default_api_prefix(),
            log_format: LogFormat::default(),
            initial_history_limit: default_initial_history_limit(),
            default_scrape_limit: default_scrape_limit(),
            max_scrape_limit: default_max_scrape_limit(),
            scrape_concurrency: default_scrape_concurrency(),
            telegram: TelegramConfig::default(),
            tag_vocabulary: default_tag_vocabulary(),
            channels: Vec::new(),
        }
    }
}

impl Config {
    /// Loads the config from the default location, writing defaults on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            config
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validate(&self) -> Result<()> {
        if self.scrape_concurrency == 0 {
            return Err(AppError::Config("scrape_concurrency must be at least 1".into()));
        }
        if self.max_scrape_limit == 0 || self.default_scrape_limit > self.max_scrape_limit {
            return Err(AppError::Config(
                "default_scrape_limit must be within 1..=max_scrape_limit".into(),
            ));
        }
        if self.tag_vocabulary.is_empty() {
            return Err(AppError::Config("tag_vocabulary must not be empty".into()));
        }
        Ok(())
    }
}
