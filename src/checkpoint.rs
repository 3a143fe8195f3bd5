// src/checkpoint.rs
//! Per-source "last checked" instants.
//!
//! On disk this is a flat JSON object `{ "<source name>": "<RFC 3339 UTC>" }`.
//! Writes go to a sibling `.tmp` file which is fsynced and renamed over the
//! target, so a crash mid-save leaves the previous file intact.
//!
//! Values that a run did not move are written back exactly as they were read,
//! including legacy forms such as `+00:00` offsets. Unreadable values are the
//! exception: they load as "now" and are saved as such.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::ingest::timestamp;

pub const DEFAULT_CHECKPOINT_PATH: &str = "last_check.json";

pub type CheckpointMap = BTreeMap<String, DateTime<Utc>>;

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("checkpoint serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self) -> Result<CheckpointMap, CheckpointError>;
    async fn save(&self, checkpoints: &CheckpointMap) -> Result<(), CheckpointError>;
}

/// Raw on-disk text of each value, keyed by source, with the instant it decoded to.
type RawValues = BTreeMap<String, (DateTime<Utc>, String)>;

/// JSON file store with atomic replace.
#[derive(Debug)]
pub struct JsonFileCheckpointStore {
    path: PathBuf,
    loaded: Mutex<RawValues>,
}

impl JsonFileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loaded: Mutex::new(RawValues::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_CHECKPOINT_PATH.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_err(&self, source: std::io::Error) -> CheckpointError {
        CheckpointError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Decode the on-disk object. Values that are not valid RFC 3339 go through the
/// feed timestamp normalizer, which fails open to `now`.
pub fn decode(path: &Path, raw: &str, now: DateTime<Utc>) -> Result<CheckpointMap, CheckpointError> {
    Ok(decode_raw(path, raw, now)?
        .into_iter()
        .map(|(source, (instant, _))| (source, instant))
        .collect())
}

fn decode_raw(path: &Path, raw: &str, now: DateTime<Utc>) -> Result<RawValues, CheckpointError> {
    let parsed: BTreeMap<String, String> =
        serde_json::from_str(raw).map_err(|e| CheckpointError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut out = RawValues::new();
    for (source, value) in parsed {
        let entry = match DateTime::parse_from_rfc3339(value.trim()) {
            Ok(dt) => (dt.with_timezone(&Utc), value),
            Err(_) => match timestamp::parse(&value) {
                Some(dt) => (dt, value),
                None => {
                    tracing::warn!(
                        source = %source,
                        value = %value,
                        "unreadable checkpoint value, treating as now"
                    );
                    // Replaced on the next save rather than kept.
                    (now, now.to_rfc3339_opts(SecondsFormat::AutoSi, true))
                }
            },
        };
        out.insert(source, entry);
    }
    Ok(out)
}

pub fn encode(checkpoints: &CheckpointMap) -> Result<String, CheckpointError> {
    encode_raw(&render(checkpoints, &RawValues::new()))
}

/// Text for each entry; an instant unchanged since load keeps its original text.
fn render(checkpoints: &CheckpointMap, previous: &RawValues) -> RawValues {
    checkpoints
        .iter()
        .map(|(k, v)| {
            let text = match previous.get(k) {
                Some((was, raw)) if was == v => raw.clone(),
                _ => v.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            };
            (k.clone(), (*v, text))
        })
        .collect()
}

fn encode_raw(values: &RawValues) -> Result<String, CheckpointError> {
    let flat: BTreeMap<&str, &str> = values
        .iter()
        .map(|(k, (_, text))| (k.as_str(), text.as_str()))
        .collect();
    Ok(serde_json::to_string_pretty(&flat)?)
}

#[async_trait]
impl CheckpointStore for JsonFileCheckpointStore {
    async fn load(&self) -> Result<CheckpointMap, CheckpointError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no checkpoint file, starting fresh");
                self.loaded.lock().await.clear();
                return Ok(CheckpointMap::new());
            }
            Err(e) => return Err(self.io_err(e)),
        };
        let values = decode_raw(&self.path, &raw, Utc::now())?;
        let map: CheckpointMap = values.iter().map(|(k, (dt, _))| (k.clone(), *dt)).collect();
        *self.loaded.lock().await = values;
        tracing::debug!(path = %self.path.display(), sources = map.len(), "checkpoints loaded");
        Ok(map)
    }

    async fn save(&self, checkpoints: &CheckpointMap) -> Result<(), CheckpointError> {
        let mut loaded = self.loaded.lock().await;
        let values = render(checkpoints, &loaded);
        let body = encode_raw(&values)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| self.io_err(e))?;
        }

        let tmp = self.tmp_path();
        let write = async {
            let mut f = tokio::fs::File::create(&tmp).await?;
            f.write_all(body.as_bytes()).await?;
            f.flush().await?;
            f.sync_all().await?;
            drop(f);
            tokio::fs::rename(&tmp, &self.path).await
        };
        if let Err(e) = write.await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.io_err(e));
        }

        *loaded = values;
        tracing::debug!(path = %self.path.display(), sources = checkpoints.len(), "checkpoints saved");
        Ok(())
    }
}

/// In-process store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    inner: Mutex<CheckpointMap>,
}

impl MemoryCheckpointStore {
    pub fn new(initial: CheckpointMap) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    pub async fn snapshot(&self) -> CheckpointMap {
        self.inner.lock().await.clone()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self) -> Result<CheckpointMap, CheckpointError> {
        Ok(self.inner.lock().await.clone())
    }

    async fn save(&self, checkpoints: &CheckpointMap) -> Result<(), CheckpointError> {
        *self.inner.lock().await = checkpoints.clone();
        Ok(())
    }
}
