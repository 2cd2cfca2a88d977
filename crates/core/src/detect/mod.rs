//! Accessibility issue detection.
//!
//! The pipeline talks to detection through [`IssueDetector`]; the shipped
//! implementation is the rule-based [`RuleDetector`]. Detector failures are
//! the one collaborator failure the pipeline treats as fatal.

mod rules;

pub use rules::{DetectorConfig, RuleDetector};

use async_trait::async_trait;
use thiserror::Error;

use crate::fileset::FileSet;
use crate::models::Issue;

/// Failures at the detection boundary. Both variants are fatal to the job.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("input file set is unreadable: {0}")]
    UnreadableInput(String),
    #[error("detector scan failed: {0}")]
    ScanFailed(String),
}

/// Scans a file set and produces the job's issue list.
#[async_trait]
pub trait IssueDetector: Send + Sync {
    async fn detect(&self, files: &FileSet) -> Result<Vec<Issue>, DetectError>;
}
