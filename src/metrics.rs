// src/metrics.rs
use anyhow::{Context, Result};
use metrics::{describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::{Path, PathBuf};

pub const ENV_METRICS_TEXTFILE: &str = "MONITOR_METRICS_TEXTFILE";

/// Prometheus recorder for a single-shot process. There is no scrape
/// endpoint: the rendered exposition is written to a textfile for the
/// node_exporter textfile collector.
pub struct Metrics {
    pub handle: PrometheusHandle,
    textfile: Option<PathBuf>,
}

impl Metrics {
    /// Install the global recorder. Call at most once per process.
    pub fn init(textfile: Option<PathBuf>) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_gauge!("monitor_start_ts", "Unix ts when this check started.");
        gauge!("monitor_start_ts").set(chrono::Utc::now().timestamp() as f64);

        Ok(Self { handle, textfile })
    }

    /// Recorder only when $MONITOR_METRICS_TEXTFILE is set.
    pub fn from_env() -> Result<Option<Self>> {
        match std::env::var(ENV_METRICS_TEXTFILE) {
            Ok(p) if !p.trim().is_empty() => Ok(Some(Self::init(Some(PathBuf::from(p.trim())))?)),
            _ => Ok(None),
        }
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Write the current exposition to the configured textfile, if any.
    pub fn flush(&self) -> Result<()> {
        if let Some(path) = &self.textfile {
            write_textfile(path, &self.render())?;
            tracing::debug!(path = %path.display(), "metrics textfile written");
        }
        Ok(())
    }
}

/// Atomic replace so the collector never reads a half-written file.
pub fn write_textfile(path: &Path, body: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating metrics dir {}", dir.display()))?;
    }
    let tmp = path.with_extension("prom.tmp");
    std::fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("renaming onto {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textfile_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("sub").join("monitor.prom");
        write_textfile(&p, "a 1\n").unwrap();
        write_textfile(&p, "a 2\n").unwrap();
        assert_eq!(std::fs::read_to_string(&p).unwrap(), "a 2\n");
        assert!(!p.with_extension("prom.tmp").exists());
    }
}
