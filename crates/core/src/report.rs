//! Report assembly and rendering.
//!
//! A report is only available for completed jobs. `JobReport` is the data
//! contract handed to clients; `render_markdown` is the shipped text
//! rendering (summary table, issues grouped by category, fix diffs,
//! validation outcomes, merge notes).

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    Category, Fix, Issue, Job, JobStatus, JobSummary, MergeNote, ValidationResult,
};

/// Everything a client needs to render a job's outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: String,
    pub generated_at: DateTime<Utc>,
    pub summary: JobSummary,
    pub issues: Vec<Issue>,
    pub fixes: Vec<Fix>,
    pub validation_results: Vec<ValidationResult>,
    pub merge_notes: Vec<MergeNote>,
}

pub struct ReportBuilder;

impl ReportBuilder {
    /// Assemble the report for a completed job.
    pub fn build(job: &Job) -> Result<JobReport> {
        if job.status != JobStatus::Complete {
            bail!(
                "report unavailable: job {} is {:?}, not complete",
                job.id,
                job.status
            );
        }
        let summary = match &job.summary {
            Some(s) => s.clone(),
            // Complete jobs always carry a summary; recompute defensively.
            None => crate::summary::summarize(&job.issues, &job.fixes, &job.validation_results),
        };
        Ok(JobReport {
            job_id: job.id.clone(),
            generated_at: Utc::now(),
            summary,
            issues: job.issues.clone(),
            fixes: job.fixes.clone(),
            validation_results: job.validation_results.clone(),
            merge_notes: job.merge_notes.clone(),
        })
    }
}

/// Render the report as Markdown.
pub fn render_markdown(report: &JobReport) -> String {
    let mut out = String::new();
    let s = &report.summary;

    out.push_str("# Accessibility Fix Report\n\n");
    out.push_str(&format!("Job: `{}`  \n", report.job_id));
    out.push_str(&format!(
        "Generated: {}\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    out.push_str("## Summary\n\n");
    out.push_str("| Metric | Value |\n|---|---|\n");
    out.push_str(&format!("| Issues found | {} |\n", s.total_issues));
    out.push_str(&format!("| Fixes applied | {} |\n", s.total_fixes));
    out.push_str(&format!("| Remaining issues | {} |\n", s.remaining_issues));
    out.push_str(&format!(
        "| Validation | {} |\n\n",
        if s.validation_passed { "passed" } else { "failed" }
    ));

    out.push_str("## Issues by category\n\n");
    for category in Category::ALL {
        let issues: Vec<&Issue> = report
            .issues
            .iter()
            .filter(|i| i.category == category)
            .collect();
        if issues.is_empty() {
            continue;
        }
        out.push_str(&format!("### {}\n\n", title_case(category.as_str())));
        for issue in issues {
            out.push_str(&format!(
                "- **{}** `{}:{}` — {}\n",
                issue.rule_id.as_deref().unwrap_or("unclassified"),
                issue.file_path,
                issue.line_start,
                issue.description
            ));
        }
        out.push('\n');
    }

    if !report.fixes.is_empty() {
        out.push_str("## Fixes\n\n");
        for fix in &report.fixes {
            let status = if fix.applied { "applied" } else { "not applied" };
            out.push_str(&format!(
                "### `{}` ({status}, confidence {:.2})\n\n",
                fix.issue_id, fix.confidence
            ));
            out.push_str(&format!("```diff\n{}\n```\n\n", fix.diff));
        }
    }

    if !report.validation_results.is_empty() {
        out.push_str("## Validation\n\n");
        for result in &report.validation_results {
            let mark = if result.passed { "✓" } else { "✗" };
            out.push_str(&format!("- {mark} `{}`\n", result.file_path));
            for error in &result.errors {
                out.push_str(&format!("  - error: {error}\n"));
            }
            for warning in &result.warnings {
                out.push_str(&format!("  - warning: {warning}\n"));
            }
        }
        out.push('\n');
    }

    if !report.merge_notes.is_empty() {
        out.push_str("## Merge notes\n\n");
        for note in &report.merge_notes {
            out.push_str(&format!(
                "- `{}` ({}): {}\n",
                note.file_path, note.issue_id, note.detail
            ));
        }
        out.push('\n');
    }

    out
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use crate::summary::summarize;

    fn completed_job() -> Job {
        let mut job = Job::with_id("job-r1");
        job.issues.push(Issue {
            id: "a.html_1_img-alt".to_string(),
            file_path: "a.html".to_string(),
            line_start: 1,
            line_end: 1,
            category: Category::Perceivable,
            severity: Severity::High,
            description: "Image missing alt attribute".to_string(),
            code_snippet: "<img src=\"x\">".to_string(),
            rule_id: Some("img-alt".to_string()),
        });
        job.fixes.push(Fix {
            issue_id: "a.html_1_img-alt".to_string(),
            file_path: "a.html".to_string(),
            before_code: "<img src=\"x\">".to_string(),
            after_code: "<img src=\"x\" alt=\"\">".to_string(),
            diff: "- <img src=\"x\">\n+ <img src=\"x\" alt=\"\">".to_string(),
            confidence: 0.6,
            applied: true,
        });
        job.summary = Some(summarize(&job.issues, &job.fixes, &job.validation_results));
        job.status = JobStatus::Complete;
        job.progress = 100;
        job
    }

    #[test]
    fn test_build_requires_complete() {
        let mut job = completed_job();
        job.status = JobStatus::Fixing;
        assert!(ReportBuilder::build(&job).is_err());
    }

    #[test]
    fn test_markdown_contains_sections() {
        let report = ReportBuilder::build(&completed_job()).unwrap();
        let md = render_markdown(&report);
        assert!(md.contains("# Accessibility Fix Report"));
        assert!(md.contains("| Issues found | 1 |"));
        assert!(md.contains("### Perceivable"));
        assert!(md.contains("```diff"));
        assert!(md.contains("img-alt"));
    }

    #[test]
    fn test_merge_notes_rendered() {
        let mut job = completed_job();
        job.merge_notes.push(MergeNote {
            file_path: "a.html".to_string(),
            issue_id: "a.html_1_img-alt".to_string(),
            detail: "superseded".to_string(),
        });
        let md = render_markdown(&ReportBuilder::build(&job).unwrap());
        assert!(md.contains("## Merge notes"));
        assert!(md.contains("superseded"));
    }
}
