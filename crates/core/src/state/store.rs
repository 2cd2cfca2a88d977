//! In-memory job snapshot store.
//!
//! The orchestrator publishes whole-record snapshots here at every state
//! transition; readers poll `snapshot` and can never observe a torn
//! record (status/progress/summary always belong to the same publish).

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use super::db::JobDb;
use crate::models::Job;

/// Shared job store: an in-memory map of snapshots with optional durable
/// backing. Cheap to clone.
#[derive(Clone)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<String, Job>>>,
    db: Option<JobDb>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            db: None,
        }
    }

    pub fn with_db(db: JobDb) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            db: Some(db),
        }
    }

    /// Publish a whole-record snapshot. The memory map is the source of
    /// truth for readers; the database write is best effort and logged on
    /// failure rather than failing the pipeline.
    pub async fn publish(&self, job: &Job) {
        {
            let mut jobs = self.jobs.write().await;
            jobs.insert(job.id.clone(), job.clone());
        }
        if let Some(db) = &self.db {
            if let Err(e) = db.upsert_job(job) {
                warn!(job_id = %job.id, error = %e, "failed to persist job snapshot");
            }
        }
    }

    /// Idempotent any-time read of the latest snapshot.
    pub async fn snapshot(&self, id: &str) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// Load persisted jobs into the memory map (startup). Returns how many
    /// were restored.
    pub async fn hydrate(&self) -> Result<usize> {
        let Some(db) = &self.db else { return Ok(0) };
        let stored = db.load_all()?;
        let count = stored.len();
        let mut jobs = self.jobs.write().await;
        for job in stored {
            jobs.entry(job.id.clone()).or_insert(job);
        }
        Ok(count)
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
