// src/monitor.rs
//! One complete check: load checkpoints, run the pipeline, compose, notify,
//! save checkpoints.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::checkpoint::CheckpointStore;
use crate::compose::MessageComposer;
use crate::config::MonitorConfig;
use crate::ingest::types::{FeedSource, Source};
use crate::ingest::{FeedPipeline, SourceReport};
use crate::notify::Notifier;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("monitor_checks_total", "Completed checks.");
        describe_counter!("monitor_notifications_total", "Digests delivered.");
        describe_counter!("monitor_notify_errors_total", "Digest delivery failures.");
        describe_counter!(
            "monitor_checkpoint_save_errors_total",
            "Checkpoint save failures."
        );
    });
}

#[derive(Debug, Clone)]
pub struct CheckReport {
    pub run_start: DateTime<Utc>,
    pub qualified: usize,
    pub notified: bool,
    pub notify_error: Option<String>,
    pub checkpoints_saved: bool,
    pub sources: Vec<(String, SourceReport)>,
}

pub struct Monitor {
    pipeline: FeedPipeline,
    composer: MessageComposer,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn CheckpointStore>,
    save_checkpoints: bool,
}

impl Monitor {
    pub fn new(
        pipeline: FeedPipeline,
        composer: MessageComposer,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            pipeline,
            composer,
            notifier,
            store,
            save_checkpoints: true,
        }
    }

    /// Wire every component from configuration.
    pub fn from_config(
        cfg: &MonitorConfig,
        feed: Arc<dyn FeedSource>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        let pipeline = FeedPipeline::new(
            feed,
            cfg.keyword_filter(),
            cfg.classifier(),
            cfg.tagger(),
            cfg.pipeline_options(),
        );
        Self::new(pipeline, cfg.composer(), notifier, store)
    }

    /// Dry runs leave the checkpoint file alone.
    pub fn save_checkpoints(mut self, save: bool) -> Self {
        self.save_checkpoints = save;
        self
    }

    pub async fn run_check(&self, sources: &[Source]) -> Result<CheckReport> {
        self.run_check_at(sources, Utc::now()).await
    }

    pub async fn run_check_at(
        &self,
        sources: &[Source],
        run_start: DateTime<Utc>,
    ) -> Result<CheckReport> {
        ensure_metrics_described();

        let checkpoints = self.store.load().await.context("loading checkpoints")?;
        let outcome = self.pipeline.run_at(sources, &checkpoints, run_start).await;

        let failed = outcome.failed_sources();
        tracing::info!(
            sources = outcome.reports.len(),
            failed,
            qualified = outcome.items.len(),
            "pipeline finished"
        );

        let mut notified = false;
        let mut notify_error = None;
        match self.composer.compose(&outcome.items) {
            None => tracing::info!("no new relevant articles"),
            Some(message) => match self.notifier.send(&message).await {
                Ok(()) => {
                    tracing::info!(notifier = self.notifier.name(), items = outcome.items.len(), "digest sent");
                    counter!("monitor_notifications_total").increment(1);
                    notified = true;
                }
                Err(e) => {
                    // Checkpoints are still saved below; the items are not resent.
                    tracing::error!(notifier = self.notifier.name(), error = %e, "digest delivery failed");
                    counter!("monitor_notify_errors_total").increment(1);
                    notify_error = Some(format!("{e:#}"));
                }
            },
        }

        let mut checkpoints_saved = false;
        if self.save_checkpoints {
            match self.store.save(&outcome.checkpoints).await {
                Ok(()) => checkpoints_saved = true,
                Err(e) => {
                    tracing::error!(error = %e, "checkpoint save failed");
                    counter!("monitor_checkpoint_save_errors_total").increment(1);
                }
            }
        } else {
            tracing::info!("checkpoint save skipped");
        }

        counter!("monitor_checks_total").increment(1);
        Ok(CheckReport {
            run_start,
            qualified: outcome.items.len(),
            notified,
            notify_error,
            checkpoints_saved,
            sources: outcome.reports,
        })
    }
}
