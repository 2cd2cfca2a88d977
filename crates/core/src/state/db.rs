//! SQLite persistence for job snapshots.
//!
//! One row per job holding the full JSON snapshot. Rows are replaced on
//! every publish, so the database always mirrors the latest whole record
//! and survives restarts.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::models::Job;

const SCHEMA_VERSION: i64 = 1;

/// Durable job storage. Cheap to clone; all clones share one connection.
#[derive(Clone)]
pub struct JobDb {
    conn: Arc<Mutex<Connection>>,
}

impl JobDb {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open job db at {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests and the CLI run mode.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("job db lock poisoned"))
    }

    /// Insert or replace the job's snapshot row.
    pub fn upsert_job(&self, job: &Job) -> Result<()> {
        let data = serde_json::to_string(job).context("failed to serialize job")?;
        let status = serde_json::to_string(&job.status)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO jobs (id, status, updated_at, data)
             VALUES (?1, ?2, datetime('now'), ?3)
             ON CONFLICT(id) DO UPDATE SET
               status = excluded.status,
               updated_at = excluded.updated_at,
               data = excluded.data",
            params![job.id, status.trim_matches('"'), data],
        )?;
        Ok(())
    }

    pub fn load_job(&self, id: &str) -> Result<Option<Job>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT data FROM jobs WHERE id = ?1")?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => {
                let data: String = row.get(0)?;
                let job = serde_json::from_str(&data).context("corrupt job row")?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    /// All stored jobs, newest first.
    pub fn load_all(&self) -> Result<Vec<Job>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT data FROM jobs ORDER BY updated_at DESC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut jobs = Vec::new();
        for data in rows {
            let data = data?;
            jobs.push(serde_json::from_str(&data).context("corrupt job row")?);
        }
        Ok(jobs)
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at TEXT NOT NULL DEFAULT (datetime('now'))
         );",
    )?;

    let current: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current < 1 {
        info!("applying job db migration 1");
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS jobs (
                 id TEXT PRIMARY KEY,
                 status TEXT NOT NULL,
                 updated_at TEXT NOT NULL,
                 data TEXT NOT NULL
             );
             INSERT INTO schema_version (version) VALUES (1);",
        )?;
    }

    if current > SCHEMA_VERSION {
        return Err(anyhow!(
            "job db schema version {current} is newer than supported {SCHEMA_VERSION}"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;

    #[test]
    fn test_upsert_and_load() {
        let db = JobDb::open_in_memory().unwrap();
        let mut job = Job::with_id("job-db1");
        db.upsert_job(&job).unwrap();

        job.status = JobStatus::Planning;
        job.progress = 5;
        db.upsert_job(&job).unwrap();

        let loaded = db.load_job("job-db1").unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Planning);
        assert_eq!(loaded.progress, 5);
    }

    #[test]
    fn test_load_missing_is_none() {
        let db = JobDb::open_in_memory().unwrap();
        assert!(db.load_job("nope").unwrap().is_none());
    }

    #[test]
    fn test_load_all() {
        let db = JobDb::open_in_memory().unwrap();
        db.upsert_job(&Job::with_id("job-a")).unwrap();
        db.upsert_job(&Job::with_id("job-b")).unwrap();
        assert_eq!(db.load_all().unwrap().len(), 2);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.db");
        {
            let db = JobDb::open(&path).unwrap();
            db.upsert_job(&Job::with_id("job-persist")).unwrap();
        }
        let db = JobDb::open(&path).unwrap();
        assert!(db.load_job("job-persist").unwrap().is_some());
    }
}
