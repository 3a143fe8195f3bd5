// src/ingest/providers/mod.rs
pub mod http;
pub mod xml;

pub use http::HttpFeedSource;
pub use xml::parse_feed;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::ingest::types::{FeedSource, FetchError, RawItem};

/// Serves canned XML documents keyed by URL. Unknown URLs answer 404.
#[derive(Debug, Clone, Default)]
pub struct FixtureFeedSource {
    docs: HashMap<String, String>,
}

impl FixtureFeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doc(mut self, url: impl Into<String>, xml: impl Into<String>) -> Self {
        self.docs.insert(url.into(), xml.into());
        self
    }
}

#[async_trait]
impl FeedSource for FixtureFeedSource {
    async fn fetch(&self, url: &str) -> Result<Vec<RawItem>, FetchError> {
        match self.docs.get(url) {
            Some(xml) => parse_feed(xml),
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}
