//! Category fixing agents.
//!
//! One agent per POUR category, all behind [`CategoryAgent`]. An agent sees
//! only its own category's issues plus the files those issues reference, and
//! returns proposed fixes; it never mutates shared state. The orchestrator
//! converts agent errors into zero fixes and a warning.

mod diff;
mod operable;
mod perceivable;
mod robust;
mod understandable;

pub use diff::render_diff;
pub use operable::OperableAgent;
pub use perceivable::PerceivableAgent;
pub use robust::RobustAgent;
pub use understandable::UnderstandableAgent;

use anyhow::Result;
use async_trait::async_trait;

use crate::fileset::FileSet;
use crate::models::{Category, Fix, Issue};

/// Proposes fixes for one category's issues.
#[async_trait]
pub trait CategoryAgent: Send + Sync {
    fn category(&self) -> Category;

    /// `issues` is the category partition; `files` holds only the files
    /// those issues reference. Issues the agent cannot fix are simply
    /// absent from the output.
    async fn propose_fixes(&self, issues: &[Issue], files: &FileSet) -> Result<Vec<Fix>>;
}

/// The default agent roster, one per category.
pub fn builtin_agents() -> Vec<Box<dyn CategoryAgent>> {
    vec![
        Box::new(PerceivableAgent),
        Box::new(OperableAgent::new()),
        Box::new(UnderstandableAgent),
        Box::new(RobustAgent),
    ]
}

/// Build a fix from an issue and its rewritten snippet. Returns `None`
/// when the rewrite changed nothing (nothing to propose).
pub(crate) fn snippet_fix(issue: &Issue, after: String, confidence: f32) -> Option<Fix> {
    if after == issue.code_snippet {
        return None;
    }
    let diff = render_diff(&issue.code_snippet, &after);
    Some(Fix {
        issue_id: issue.id.clone(),
        file_path: issue.file_path.clone(),
        before_code: issue.code_snippet.clone(),
        after_code: after,
        diff,
        confidence,
        applied: false,
    })
}
