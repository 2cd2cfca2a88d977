//! Derived job aggregates.
//!
//! `summarize` is a pure function over the job's issues, fixes, and
//! validation results. The orchestrator recomputes the summary wholesale at
//! every publish point; nothing increments counters in place.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{Category, Fix, Issue, JobSummary, Severity, ValidationResult};

// `validation_passed` means "nothing left to fix", not "the validator saw
// no failures": an issue nobody proposed a fix for still counts against it.

/// Compute the whole summary from scratch. Counts only `applied` fixes;
/// demotions (merge overlap, failed validation) must already be reflected
/// on the fixes themselves.
pub fn summarize(issues: &[Issue], fixes: &[Fix], _validation: &[ValidationResult]) -> JobSummary {
    let category_of: HashMap<&str, Category> =
        issues.iter().map(|i| (i.id.as_str(), i.category)).collect();

    let mut issues_by_category: BTreeMap<Category, u32> =
        Category::ALL.iter().map(|c| (*c, 0)).collect();
    let mut fixes_by_category: BTreeMap<Category, u32> =
        Category::ALL.iter().map(|c| (*c, 0)).collect();
    let mut issues_by_severity: BTreeMap<Severity, u32> =
        Severity::ALL.iter().map(|s| (*s, 0)).collect();

    for issue in issues {
        *issues_by_category.entry(issue.category).or_insert(0) += 1;
        *issues_by_severity.entry(issue.severity).or_insert(0) += 1;
    }

    let mut fixed_issue_ids: HashSet<&str> = HashSet::new();
    for fix in fixes.iter().filter(|f| f.applied) {
        fixed_issue_ids.insert(fix.issue_id.as_str());
        if let Some(category) = category_of.get(fix.issue_id.as_str()) {
            *fixes_by_category.entry(*category).or_insert(0) += 1;
        }
    }

    let total_issues = issues.len() as u32;
    let total_fixes = fixed_issue_ids.len() as u32;
    let remaining_issues = issues
        .iter()
        .filter(|i| !fixed_issue_ids.contains(i.id.as_str()))
        .count() as u32;

    JobSummary {
        total_issues,
        total_fixes,
        remaining_issues,
        issues_by_category,
        fixes_by_category,
        issues_by_severity,
        validation_passed: remaining_issues == 0,
    }
}
