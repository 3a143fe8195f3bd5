// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod checkpoint;
pub mod compose;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod monitor;
pub mod notify;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{Classifier, Importance, SummaryMode, Tier};
pub use crate::checkpoint::{CheckpointMap, CheckpointStore, JsonFileCheckpointStore};
pub use crate::compose::MessageComposer;
pub use crate::config::MonitorConfig;
pub use crate::ingest::types::{FeedSource, FetchError, QualifyingItem, RawItem, Source};
pub use crate::ingest::{FeedPipeline, RunOutcome, SourceReport};
pub use crate::monitor::{CheckReport, Monitor};
pub use crate::notify::Notifier;
