// src/ingest/types.rs
use serde::{Deserialize, Serialize};

use crate::analyze::classify::Importance;

/// One configured feed endpoint. Identity is `name`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub category: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            enabled: true,
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A feed entry as yielded by a [`FeedSource`]. Absent fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub published: String, // raw published/updated text, possibly malformed
    pub summary: String,
    pub content: Option<String>, // first content block only
}

impl RawItem {
    /// Title, summary and first content block joined by single spaces.
    pub fn combined_text(&self) -> String {
        format!(
            "{} {} {}",
            self.title,
            self.summary,
            self.content.as_deref().unwrap_or_default()
        )
    }
}

/// A new, keyword-matching item ready for the digest.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QualifyingItem {
    pub source: String,
    pub title: String,
    pub link: String,
    pub published: String, // original string, for display
    pub summary: String,
    pub importance: Importance,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("feed parse error: {0}")]
    Parse(String),

    #[error("fetch timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("fetch worker failed: {0}")]
    Worker(String),
}

/// Feed retrieval collaborator: given a URL, returns items in feed order.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<RawItem>, FetchError>;
}
