// src/analyze/mod.rs
// Per-item analysis: importance tier, display summary, technical tags.

pub mod classify;
pub mod summary;
pub mod tags;

pub use classify::{Classifier, ClassifierRules, Importance, Tier};
pub use summary::{display_summary, SummaryMode};
pub use tags::TechnicalTagger;
