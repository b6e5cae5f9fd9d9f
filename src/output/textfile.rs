//! Prometheus textfile export
//!
//! Writes the whole registry in text exposition format after every cycle,
//! for node_exporter's textfile collector or any scraper reading files.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{write_atomic, ResultSink};
use crate::error::{Error, Result};
use crate::metrics;
use crate::models::CycleSnapshot;

pub struct MetricsTextfile {
    path: PathBuf,
}

impl MetricsTextfile {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

#[async_trait]
impl ResultSink for MetricsTextfile {
    fn name(&self) -> &str {
        "metrics"
    }

    async fn deliver(&self, _snapshot: &CycleSnapshot) -> Result<()> {
        let text = metrics::encode_metrics().map_err(|e| Error::Other {
            context: "Failed to encode metrics".to_string(),
            source: Some(e),
        })?;

        write_atomic(&self.path, text.as_bytes()).await
    }
}
