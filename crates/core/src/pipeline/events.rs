//! Pipeline lifecycle events.
//!
//! Emitted by the orchestrator over an optional channel; the server fans
//! them out to SSE subscribers. Events are observational only; dropping
//! them never affects job outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Category, JobSummary};
use crate::models::opaque_id;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub id: String,
    pub job_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: PipelineEventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEventKind {
    JobAccepted {
        file_count: usize,
    },
    DetectionStarted,
    DetectionCompleted {
        issue_count: usize,
    },
    DetectionFailed {
        error: String,
    },
    AgentStarted {
        category: Category,
        issue_count: usize,
    },
    AgentCompleted {
        category: Category,
        fix_count: usize,
    },
    AgentFailed {
        category: Category,
        error: String,
    },
    FixesMerged {
        applied: usize,
        note_count: usize,
    },
    ValidationStarted {
        file_count: usize,
    },
    ValidationCompleted {
        passed: bool,
    },
    ValidationFailed {
        error: String,
    },
    JobCompleted {
        summary: JobSummary,
    },
    JobFailed {
        error: String,
    },
    JobCancelled,
}

impl PipelineEvent {
    pub fn new(job_id: impl Into<String>, kind: PipelineEventKind) -> Self {
        Self {
            id: opaque_id("evt"),
            job_id: job_id.into(),
            timestamp: Utc::now(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let event = PipelineEvent::new(
            "job-1",
            PipelineEventKind::AgentCompleted {
                category: Category::Operable,
                fix_count: 3,
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "agent_completed");
        assert_eq!(json["category"], "operable");
        assert_eq!(json["fix_count"], 3);
        assert_eq!(json["job_id"], "job-1");
    }

    #[test]
    fn test_event_ids_unique() {
        let a = PipelineEvent::new("job-1", PipelineEventKind::DetectionStarted);
        let b = PipelineEvent::new("job-1", PipelineEventKind::DetectionStarted);
        assert_ne!(a.id, b.id);
    }
}
