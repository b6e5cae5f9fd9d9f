//! Result sinks
//!
//! Every sealed cycle is handed to each configured sink by shared reference.
//! A sink failure is logged and counted; it never stops the monitor loop or
//! keeps other sinks from receiving the cycle.

pub mod dashboard;
pub mod snapshot;
pub mod textfile;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::config::OutputConfig;
use crate::error::Result;
use crate::models::CycleSnapshot;

pub use dashboard::DashboardWriter;
pub use snapshot::SnapshotWriter;
pub use textfile::MetricsTextfile;

/// Consumer of sealed cycles
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Short name used in logs and metrics
    fn name(&self) -> &str;

    async fn deliver(&self, snapshot: &CycleSnapshot) -> Result<()>;
}

/// Ordered fan-out over several sinks
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn ResultSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the sinks enabled in `config`
    pub fn from_config(config: &OutputConfig) -> Result<Self> {
        let mut sinks = Self::new();

        if let Some(path) = &config.dashboard_path {
            let writer = match &config.template_path {
                Some(template) => DashboardWriter::with_template(path, template, config)?,
                None => DashboardWriter::new(path, config)?,
            };
            sinks.push(writer);
        }

        if let Some(path) = &config.snapshot_path {
            sinks.push(SnapshotWriter::new(path));
        }

        if let Some(path) = &config.metrics_path {
            sinks.push(MetricsTextfile::new(path));
        }

        Ok(sinks)
    }

    pub fn push(&mut self, sink: impl ResultSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Deliver to every sink in order, returning the number that failed
    pub async fn deliver_all(&self, snapshot: &CycleSnapshot) -> usize {
        let mut failures = 0;

        for sink in &self.sinks {
            match sink.deliver(snapshot).await {
                Ok(()) => {
                    tracing::debug!(sink = sink.name(), cycle = snapshot.cycle, "Cycle delivered");
                }
                Err(e) => {
                    failures += 1;
                    crate::metrics::record_sink_error(sink.name());
                    if e.is_recoverable() {
                        tracing::warn!(
                            sink = sink.name(),
                            cycle = snapshot.cycle,
                            category = e.category().as_str(),
                            error = %e,
                            "Failed to deliver cycle; retrying next cycle"
                        );
                    } else {
                        tracing::error!(
                            sink = sink.name(),
                            cycle = snapshot.cycle,
                            category = e.category().as_str(),
                            error = %e,
                            "Failed to deliver cycle"
                        );
                    }
                }
            }
        }

        failures
    }
}

/// Write a file by writing a sibling temp file and renaming it into place
///
/// Readers never observe a partially written document.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp = temp_path(path);
    tokio::fs::write(&temp, contents).await?;

    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e.into());
    }

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
