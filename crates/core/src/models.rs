//! # Pourfix Models
//!
//! Central data model for jobs, issues, fixes, and validation outcomes.
//! Every type here is the serde wire shape exposed to the client layer;
//! the orchestrator is the only writer of `Job.status`/`progress`/`summary`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::fileset::FileSet;

/// Lifecycle state of a job.
///
/// Transitions are one-directional (`uploaded → planning → fixing →
/// validating → complete`); `error` is reachable from any non-terminal
/// state. See `pipeline::stage` for the transition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// File set accepted, processing not yet started
    Uploaded,
    /// Detector scanning the file set
    Planning,
    /// Category agents proposing fixes
    Fixing,
    /// Validator re-checking patched files
    Validating,
    /// Terminal: report available
    Complete,
    /// Terminal: fatal failure or cancellation
    Error,
}

impl JobStatus {
    /// Whether this state accepts no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }
}

/// The four WCAG POUR principle categories. Closed set; each category
/// has exactly one fixing agent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Perceivable,
    Operable,
    Understandable,
    Robust,
}

impl Category {
    /// All categories, in dispatch order
    pub const ALL: [Category; 4] = [
        Category::Perceivable,
        Category::Operable,
        Category::Understandable,
        Category::Robust,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Perceivable => "perceivable",
            Category::Operable => "operable",
            Category::Understandable => "understandable",
            Category::Robust => "robust",
        }
    }
}

/// Issue severity. `Critical` is the optional supertype above `High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];
}

/// A single detected accessibility defect at a file/line location.
///
/// Issues are created by the detector during `planning` and never mutated
/// afterwards; fixes reference them by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Unique within the owning job
    pub id: String,
    pub file_path: String,
    /// 1-based, `line_end >= line_start`
    pub line_start: u32,
    pub line_end: u32,
    pub category: Category,
    pub severity: Severity,
    pub description: String,
    pub code_snippet: String,
    #[serde(default)]
    pub rule_id: Option<String>,
}

/// A proposed code change addressing one issue. At most one per issue,
/// produced by exactly one category agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fix {
    /// Foreign key into the job's issues
    pub issue_id: String,
    pub file_path: String,
    pub before_code: String,
    pub after_code: String,
    pub diff: String,
    /// Agent confidence in [0, 1]
    pub confidence: f32,
    /// Set by the merge step once the patched content carries the change,
    /// never by the producing agent. Validation may flip it back.
    #[serde(default)]
    pub applied: bool,
}

/// Outcome of re-checking one file touched by at least one fix.
/// Warnings alone do not fail a file; any error does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub file_path: String,
    pub passed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Audit record for a merge decision (overlapping ranges, unmatched
/// snippets). Informational only, never fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeNote {
    pub file_path: String,
    /// Issue whose fix this note concerns
    pub issue_id: String,
    pub detail: String,
}

/// Derived aggregate over a job's issues/fixes/validation results.
/// Recomputed wholesale by `summary::summarize`, never hand-edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub total_issues: u32,
    pub total_fixes: u32,
    pub remaining_issues: u32,
    pub issues_by_category: BTreeMap<Category, u32>,
    pub fixes_by_category: BTreeMap<Category, u32>,
    pub issues_by_severity: BTreeMap<Severity, u32>,
    pub validation_passed: bool,
}

/// One job per uploaded submission. Owned and mutated exclusively by its
/// orchestrator task; readers only ever see whole-record snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    /// 0-100, monotonically non-decreasing until terminal
    pub progress: u8,
    /// Human-readable current-stage description
    pub message: String,
    #[serde(default)]
    pub summary: Option<JobSummary>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub fixes: Vec<Fix>,
    #[serde(default)]
    pub validation_results: Vec<ValidationResult>,
    #[serde(default)]
    pub merge_notes: Vec<MergeNote>,
    /// Post-merge file set, present once fixing has run
    #[serde(default)]
    pub patched: Option<FileSet>,
}

impl Job {
    /// Create a fresh job in the `uploaded` state with a generated id
    pub fn new() -> Self {
        Self::with_id(opaque_id("job"))
    }

    /// Create a job with a caller-chosen id (tests, replays)
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Uploaded,
            progress: 0,
            message: "File set uploaded".to_string(),
            summary: None,
            created_at: Utc::now(),
            completed_at: None,
            issues: Vec::new(),
            fixes: Vec::new(),
            validation_results: Vec::new(),
            merge_notes: Vec::new(),
            patched: None,
        }
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate an opaque unique identifier (not cryptographic)
pub(crate) fn opaque_id(prefix: &str) -> String {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos();
    let salt = RandomState::new().build_hasher().finish() as u32;
    format!("{}-{:x}-{:x}", prefix, nanos, salt)
}
