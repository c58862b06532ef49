use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nd_core::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Counters kept across runs of one job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerStatus {
    pub last_run: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub total_runs: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub articles_stored: u64,
    pub is_paused: bool,
    pub pause_until: Option<DateTime<Utc>>,
}

impl SchedulerStatus {
    /// Percentage of runs that succeeded.
    pub fn success_rate(&self) -> f64 {
        if self.total_runs == 0 {
            return 0.0;
        }
        self.total_successes as f64 / self.total_runs as f64 * 100.0
    }
}

#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn load(&self) -> Result<SchedulerStatus>;
    async fn save(&self, status: &SchedulerStatus) -> Result<()>;
}

/// Status kept as pretty-printed JSON in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStatusStore {
    path: PathBuf,
}

impl JsonFileStatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StatusStore for JsonFileStatusStore {
    async fn load(&self) -> Result<SchedulerStatus> {
        if !tokio::fs::try_exists(&self.path).await? {
            debug!(path = %self.path.display(), "No saved status");
            return Ok(SchedulerStatus::default());
        }
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let status = serde_json::from_str(&raw)?;
        info!(path = %self.path.display(), "Loaded previous job status");
        Ok(status)
    }

    async fn save(&self, status: &SchedulerStatus) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        // write-then-rename so a crash never leaves half a file behind
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_string_pretty(status)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    status: Mutex<SchedulerStatus>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn load(&self) -> Result<SchedulerStatus> {
        Ok(self.status.lock().await.clone())
    }

    async fn save(&self, status: &SchedulerStatus) -> Result<()> {
        *self.status.lock().await = status.clone();
        Ok(())
    }
}
