// src/config/mod.rs
//! Monitor configuration: one JSON or TOML file plus environment overrides.
//!
//! Lookup order:
//! 1) explicit path (`--config`)
//! 2) $MONITOR_CONFIG_PATH
//! 3) config/monitor.toml
//! 4) config/monitor.json
//! 5) rss_config.json

use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analyze::{Classifier, ClassifierRules, SummaryMode, TechnicalTagger};
use crate::checkpoint::DEFAULT_CHECKPOINT_PATH;
use crate::compose::{MessageComposer, RenderCaps, DEFAULT_TITLE};
use crate::ingest::keywords::KeywordFilter;
use crate::ingest::providers::http::DEFAULT_USER_AGENT;
use crate::ingest::types::Source;
use crate::ingest::{PipelineOptions, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_FETCHES};

pub const ENV_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";
pub const ENV_CHECKPOINT_PATH: &str = "MONITOR_CHECKPOINT_PATH";
pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const ENV_API_BASE: &str = "TELEGRAM_API_BASE";

const FALLBACK_PATHS: [&str; 3] = ["config/monitor.toml", "config/monitor.json", "rss_config.json"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no configuration file found (tried: {})", display_paths(.tried))]
    Missing { tried: Vec<PathBuf> },

    #[error("reading config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub chat_id: Option<String>,
    /// Self-hosted Bot API server; defaults to api.telegram.org.
    #[serde(default)]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub rss_sources: Vec<Source>,
    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default = "default_title")]
    pub message_title: String,
    #[serde(default)]
    pub summary_mode: SummaryMode,
    #[serde(default = "default_true")]
    pub enable_tags: bool,
    /// Overrides the built-in technical term list.
    #[serde(default)]
    pub technical_terms: Option<Vec<String>>,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_fetches: usize,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub classifier: ClassifierRules,
    #[serde(default)]
    pub caps: RenderCaps,

    // Nested `[telegram]` form and the older flat keys are both accepted.
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub telegram_bot_token: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub telegram_chat_id: Option<String>,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}
fn default_true() -> bool {
    true
}
fn default_max_concurrent() -> usize {
    DEFAULT_MAX_CONCURRENT_FETCHES
}
fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}
fn default_checkpoint_path() -> PathBuf {
    PathBuf::from(DEFAULT_CHECKPOINT_PATH)
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Chat ids are often written as bare numbers in JSON.
fn string_or_number<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        S(String),
        I(i64),
    }
    Ok(Option::<Raw>::deserialize(de)?.map(|r| match r {
        Raw::S(s) => s,
        Raw::I(i) => i.to_string(),
    }))
}

fn non_blank(v: Option<&String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn env_non_blank(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl MonitorConfig {
    /// Parse a document; `hint_ext` is the file extension (`toml`, `json`) or empty.
    pub fn parse(s: &str, hint_ext: &str, path: &Path) -> Result<Self, ConfigError> {
        let parse_err = |reason: String| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        };
        match hint_ext {
            "toml" => toml::from_str(s).map_err(|e| parse_err(e.to_string())),
            "json" => serde_json::from_str(s).map_err(|e| parse_err(e.to_string())),
            _ => {
                // Unknown extension: sniff by content.
                if s.trim_start().starts_with('{') {
                    serde_json::from_str(s).map_err(|e| parse_err(e.to_string()))
                } else {
                    toml::from_str(s).map_err(|e| parse_err(e.to_string()))
                }
            }
        }
    }

    /// Env overrides win over file values.
    pub fn apply_env_overrides(&mut self) {
        if let Some(t) = env_non_blank(ENV_BOT_TOKEN) {
            self.telegram.bot_token = Some(t);
        }
        if let Some(c) = env_non_blank(ENV_CHAT_ID) {
            self.telegram.chat_id = Some(c);
        }
        if let Some(b) = env_non_blank(ENV_API_BASE) {
            self.telegram.api_base = Some(b);
        }
        if let Some(p) = env_non_blank(ENV_CHECKPOINT_PATH) {
            self.checkpoint_path = PathBuf::from(p);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rss_sources.is_empty() {
            return Err(ConfigError::Invalid("rss_sources is empty".into()));
        }
        let mut seen = HashSet::new();
        for (i, src) in self.rss_sources.iter().enumerate() {
            if src.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("rss_sources[{i}] has a blank name")));
            }
            if src.url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "source '{}' has a blank url",
                    src.name
                )));
            }
            if !seen.insert(src.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source name '{}'",
                    src.name
                )));
            }
        }
        if self.max_concurrent_fetches == 0 {
            return Err(ConfigError::Invalid("max_concurrent_fetches must be >= 1".into()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid("fetch_timeout_secs must be >= 1".into()));
        }
        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            tracing::warn!("keywords list is empty, no item will qualify");
        }
        Ok(())
    }

    /// (bot token, chat id): nested form first, then the flat keys.
    pub fn telegram_credentials(&self) -> Option<(String, String)> {
        let token = non_blank(self.telegram.bot_token.as_ref())
            .or_else(|| non_blank(self.telegram_bot_token.as_ref()))?;
        let chat = non_blank(self.telegram.chat_id.as_ref())
            .or_else(|| non_blank(self.telegram_chat_id.as_ref()))?;
        Some((token, chat))
    }

    pub fn require_telegram(&self) -> Result<(String, String), ConfigError> {
        self.telegram_credentials().ok_or_else(|| {
            ConfigError::Invalid(format!(
                "Telegram credentials missing: set {ENV_BOT_TOKEN} and {ENV_CHAT_ID} or the [telegram] section"
            ))
        })
    }

    pub fn telegram_api_base(&self) -> String {
        non_blank(self.telegram.api_base.as_ref())
            .unwrap_or_else(|| crate::notify::telegram::DEFAULT_API_BASE.to_string())
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            max_concurrent_fetches: self.max_concurrent_fetches,
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            summary_mode: self.summary_mode,
            enable_tags: self.enable_tags,
        }
    }

    pub fn keyword_filter(&self) -> KeywordFilter {
        KeywordFilter::new(&self.keywords)
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(&self.classifier)
    }

    pub fn tagger(&self) -> TechnicalTagger {
        match &self.technical_terms {
            Some(terms) => TechnicalTagger::new(terms.clone()),
            None => TechnicalTagger::default(),
        }
    }

    pub fn composer(&self) -> MessageComposer {
        MessageComposer::new(self.message_title.clone(), self.caps)
    }
}

/// Load from an explicit path: parse, apply env overrides, validate.
pub fn load_from(path: &Path) -> Result<MonitorConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mut cfg = MonitorConfig::parse(&content, ext.as_str(), path)?;
    cfg.apply_env_overrides();
    cfg.validate()?;
    tracing::info!(
        path = %path.display(),
        sources = cfg.rss_sources.len(),
        keywords = cfg.keywords.len(),
        "configuration loaded"
    );
    Ok(cfg)
}

/// Resolve the config file location without reading it.
pub fn locate(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(p) = explicit {
        if p.exists() {
            return Ok(p.to_path_buf());
        }
        return Err(ConfigError::Missing {
            tried: vec![p.to_path_buf()],
        });
    }
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(pb);
        }
        return Err(ConfigError::Missing { tried: vec![pb] });
    }
    let tried: Vec<PathBuf> = FALLBACK_PATHS.iter().map(PathBuf::from).collect();
    match tried.iter().find(|p| p.exists()) {
        Some(p) => Ok(p.clone()),
        None => Err(ConfigError::Missing { tried }),
    }
}

pub fn load(explicit: Option<&Path>) -> Result<MonitorConfig, ConfigError> {
    let path = locate(explicit)?;
    load_from(&path)
}
