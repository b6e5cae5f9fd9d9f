//! JSON snapshot of the last sealed cycle

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{write_atomic, ResultSink};
use crate::error::Result;
use crate::models::CycleSnapshot;

/// Writes each cycle as pretty-printed JSON, replacing the previous one
pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

#[async_trait]
impl ResultSink for SnapshotWriter {
    fn name(&self) -> &str {
        "snapshot"
    }

    async fn deliver(&self, snapshot: &CycleSnapshot) -> Result<()> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        write_atomic(&self.path, &json).await?;
        tracing::debug!(path = %self.path.display(), "Snapshot written");
        Ok(())
    }
}
