//! State machine rules for job lifecycle transitions.
//!
//! The happy path is strictly one-directional with no revisits:
//! `uploaded → planning → fixing → validating → complete`. `error` is
//! reachable from every non-terminal state. Progress is monotone and
//! freezes at its last value on failure.

use chrono::Utc;
use tracing::info;

use crate::models::{Job, JobStatus};

/// Progress checkpoints. Values only ever increase within a job.
pub const PROGRESS_ACCEPTED: u8 = 5;
pub const PROGRESS_DETECTED: u8 = 25;
pub const PROGRESS_PER_AGENT: u8 = 15;
pub const PROGRESS_VALIDATED: u8 = 90;
pub const PROGRESS_COMPLETE: u8 = 100;

/// The next state on the happy path, if any.
pub fn next_status(status: JobStatus) -> Option<JobStatus> {
    match status {
        JobStatus::Uploaded => Some(JobStatus::Planning),
        JobStatus::Planning => Some(JobStatus::Fixing),
        JobStatus::Fixing => Some(JobStatus::Validating),
        JobStatus::Validating => Some(JobStatus::Complete),
        JobStatus::Complete | JobStatus::Error => None,
    }
}

/// Whether `from → to` is a legal transition.
pub fn is_valid_transition(from: JobStatus, to: JobStatus) -> bool {
    if to == JobStatus::Error {
        return !from.is_terminal();
    }
    next_status(from) == Some(to)
}

/// Advance the job one step along the happy path. No-op on terminal
/// states. Completing stamps `completed_at` and pins progress to 100.
pub fn advance(job: &mut Job, message: impl Into<String>) {
    let Some(next) = next_status(job.status) else {
        return;
    };
    info!(job_id = %job.id, from = ?job.status, to = ?next, "job transition");
    job.status = next;
    job.message = message.into();
    if next == JobStatus::Complete {
        job.progress = PROGRESS_COMPLETE;
        job.completed_at = Some(Utc::now());
    }
}

/// Move the job to `error`. Progress freezes at its last value; the
/// message explains the failure. No-op on terminal states.
pub fn fail(job: &mut Job, message: impl Into<String>) {
    if job.status.is_terminal() {
        return;
    }
    let message = message.into();
    info!(job_id = %job.id, from = ?job.status, %message, "job failed");
    job.status = JobStatus::Error;
    job.message = message;
    job.completed_at = Some(Utc::now());
}

/// Raise progress to `to`, never lowering it.
pub fn bump_progress(job: &mut Job, to: u8) {
    if to > job.progress {
        job.progress = to.min(PROGRESS_COMPLETE);
    }
}
