// src/ingest/providers/http.rs
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use std::time::Duration;

use super::xml::parse_feed;
use crate::ingest::types::{FeedSource, FetchError, RawItem};

pub const DEFAULT_USER_AGENT: &str = concat!("dental-feed-monitor/", env!("CARGO_PKG_VERSION"));

const FEED_ACCEPT: &str =
    "application/rss+xml, application/atom+xml, application/rdf+xml;q=0.9, application/xml;q=0.8, */*;q=0.5";

/// Fetches a feed over HTTP(S) and parses it with [`parse_feed`].
#[derive(Clone)]
pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(FEED_ACCEPT));
        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Reuse an existing client (tests, shared connection pools).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &str) -> Result<Vec<RawItem>, FetchError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = resp.text().await?;
        let items = parse_feed(&body)?;
        tracing::debug!(url, items = items.len(), "feed parsed");
        Ok(items)
    }
}
