// src/ingest/mod.rs
pub mod keywords;
pub mod providers;
pub mod timestamp;
pub mod types;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::analyze::{display_summary, Classifier, SummaryMode, TechnicalTagger};
use crate::checkpoint::CheckpointMap;
use crate::ingest::keywords::KeywordFilter;
use crate::ingest::types::{FeedSource, FetchError, QualifyingItem, RawItem, Source};

pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

const MAX_TEXT_CHARS: usize = 4000;

/// One-time metrics registration (so series show up in the textfile export).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_items_total", "Items returned by feed fetches.");
        describe_counter!(
            "feed_new_items_total",
            "Items newer than the source checkpoint."
        );
        describe_counter!(
            "feed_qualified_total",
            "New items that matched the keyword set."
        );
        describe_counter!(
            "feed_fetch_errors_total",
            "Feed fetch/parse failures, by kind."
        );
        describe_counter!("feed_empty_total", "Fetches that returned no items.");
        describe_histogram!("feed_fetch_ms", "Feed fetch time in milliseconds.");
        describe_histogram!("feed_parse_ms", "Feed XML parse time in milliseconds.");
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix ts when the feed pipeline last ran."
        );
    });
}

/// Clean feed text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let decoded = html_escape::decode_html_entities(s);

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    let stripped = re_tags.replace_all(&decoded, " ");

    // 3) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("ws regex"));
    let mut out = re_ws.replace_all(&stripped, " ").trim().to_string();

    // 4) Length cap
    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }
    out
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_concurrent_fetches: usize,
    pub fetch_timeout: Duration,
    pub summary_mode: SummaryMode,
    pub enable_tags: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            summary_mode: SummaryMode::default(),
            enable_tags: true,
        }
    }
}

/// What happened to one configured source during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceReport {
    Disabled,
    FetchFailed(String),
    Empty,
    Scanned {
        total: usize,
        new: usize,
        qualified: usize,
    },
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Source configuration order, then feed order.
    pub items: Vec<QualifyingItem>,
    pub checkpoints: CheckpointMap,
    pub reports: Vec<(String, SourceReport)>,
}

impl RunOutcome {
    pub fn failed_sources(&self) -> usize {
        self.reports
            .iter()
            .filter(|(_, r)| matches!(r, SourceReport::FetchFailed(_)))
            .count()
    }
}

/// Fetch → dedup against checkpoints → keyword filter → classify.
pub struct FeedPipeline {
    source: Arc<dyn FeedSource>,
    keywords: KeywordFilter,
    classifier: Classifier,
    tagger: TechnicalTagger,
    options: PipelineOptions,
}

impl FeedPipeline {
    pub fn new(
        source: Arc<dyn FeedSource>,
        keywords: KeywordFilter,
        classifier: Classifier,
        tagger: TechnicalTagger,
        options: PipelineOptions,
    ) -> Self {
        if keywords.is_empty() {
            tracing::warn!("keyword set is empty, no item will qualify");
        }
        Self {
            source,
            keywords,
            classifier,
            tagger,
            options,
        }
    }

    /// Pipeline with default classifier rules, tags and options.
    pub fn with_defaults(source: Arc<dyn FeedSource>, keywords: KeywordFilter) -> Self {
        Self::new(
            source,
            keywords,
            Classifier::default(),
            TechnicalTagger::default(),
            PipelineOptions::default(),
        )
    }

    pub async fn run(&self, sources: &[Source], checkpoints: &CheckpointMap) -> RunOutcome {
        self.run_at(sources, checkpoints, Utc::now()).await
    }

    /// Run with an explicit run-start instant. Checkpoints of fully scanned
    /// sources advance to `max(previous, run_start)`.
    pub async fn run_at(
        &self,
        sources: &[Source],
        checkpoints: &CheckpointMap,
        run_start: DateTime<Utc>,
    ) -> RunOutcome {
        ensure_metrics_described();

        let handles = self.spawn_fetches(sources);

        let mut items = Vec::new();
        let mut next = checkpoints.clone();
        let mut reports = Vec::with_capacity(sources.len());

        // Awaited in configuration order; completion order does not matter.
        for (src, handle) in sources.iter().zip(handles) {
            let Some(handle) = handle else {
                tracing::debug!(source = %src.name, "source disabled, skipping");
                reports.push((src.name.clone(), SourceReport::Disabled));
                continue;
            };

            let fetched = match handle.await {
                Ok(res) => res,
                Err(join_err) => Err(FetchError::Worker(join_err.to_string())),
            };

            let raw_items = match fetched {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(source = %src.name, url = %src.url, error = %e, "feed fetch failed");
                    counter!("feed_fetch_errors_total", "kind" => error_kind(&e)).increment(1);
                    reports.push((src.name.clone(), SourceReport::FetchFailed(e.to_string())));
                    continue;
                }
            };

            if raw_items.is_empty() {
                tracing::warn!(source = %src.name, "feed returned no items");
                counter!("feed_empty_total").increment(1);
                reports.push((src.name.clone(), SourceReport::Empty));
                continue;
            }

            let last_check = checkpoints
                .get(&src.name)
                .copied()
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
            let (qualified, new) = self.scan(src, &raw_items, last_check, run_start);

            tracing::info!(
                source = %src.name,
                total = raw_items.len(),
                new,
                qualified = qualified.len(),
                "source scanned"
            );
            counter!("feed_items_total").increment(raw_items.len() as u64);
            counter!("feed_new_items_total").increment(new as u64);
            counter!("feed_qualified_total").increment(qualified.len() as u64);

            reports.push((
                src.name.clone(),
                SourceReport::Scanned {
                    total: raw_items.len(),
                    new,
                    qualified: qualified.len(),
                },
            ));
            items.extend(qualified);

            let advanced = last_check.max(run_start);
            next.insert(src.name.clone(), advanced);
        }

        gauge!("pipeline_last_run_ts").set(run_start.timestamp().max(0) as f64);

        RunOutcome {
            items,
            checkpoints: next,
            reports,
        }
    }

    /// One task per enabled source, bounded by a semaphore. `None` for disabled sources.
    fn spawn_fetches(
        &self,
        sources: &[Source],
    ) -> Vec<Option<JoinHandle<Result<Vec<RawItem>, FetchError>>>> {
        let permits = Arc::new(Semaphore::new(self.options.max_concurrent_fetches.max(1)));
        let timeout = self.options.fetch_timeout;

        sources
            .iter()
            .map(|src| {
                if !src.enabled {
                    return None;
                }
                let feed = Arc::clone(&self.source);
                let permits = Arc::clone(&permits);
                let url = src.url.clone();
                let name = src.name.clone();
                Some(tokio::spawn(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|e| FetchError::Worker(e.to_string()))?;
                    tracing::debug!(source = %name, url = %url, "fetching feed");
                    let t0 = Instant::now();
                    let res = match tokio::time::timeout(timeout, feed.fetch(&url)).await {
                        Ok(res) => res,
                        Err(_) => Err(FetchError::Timeout(timeout)),
                    };
                    histogram!("feed_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
                    res
                }))
            })
            .collect()
    }

    /// Returns (qualifying items, count of items newer than `last_check`).
    fn scan(
        &self,
        src: &Source,
        raw_items: &[RawItem],
        last_check: DateTime<Utc>,
        run_start: DateTime<Utc>,
    ) -> (Vec<QualifyingItem>, usize) {
        let mut out = Vec::new();
        let mut new = 0usize;

        for item in raw_items {
            let instant = timestamp::normalize_or(&item.published, run_start);
            if instant <= last_check {
                continue;
            }
            new += 1;

            let combined = item.combined_text();
            let Some(keyword) = self.keywords.first_match(&combined) else {
                continue;
            };
            tracing::debug!(source = %src.name, title = %item.title, keyword, "item qualified");

            let importance = self.classifier.classify(&item.title, &combined, &src.name);
            let summary = display_summary(&item.title, &item.summary, self.options.summary_mode);
            let tags = if self.options.enable_tags {
                self.tagger.tags(&item.title, &item.summary)
            } else {
                Vec::new()
            };

            out.push(QualifyingItem {
                source: src.name.clone(),
                title: item.title.clone(),
                link: item.link.clone(),
                published: item.published.clone(),
                summary,
                importance,
                category: src.category.clone(),
                tags,
            });
        }
        (out, new)
    }
}

fn error_kind(e: &FetchError) -> &'static str {
    match e {
        FetchError::Http(_) => "http",
        FetchError::Status { .. } => "status",
        FetchError::Parse(_) => "parse",
        FetchError::Timeout(_) => "timeout",
        FetchError::Worker(_) => "worker",
    }
}
