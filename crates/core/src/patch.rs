//! Fix application and merging.
//!
//! Fixes arrive in agent completion order and are applied in that order.
//! Matching is tiered: exact snippet replacement, then the issue's 1-based
//! line range, then a whitespace-normalized line-window match. Overlapping
//! applications resolve last-wins; the superseded fix is demoted and a
//! merge note records the decision.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::fileset::FileSet;
use crate::models::{Fix, Issue, MergeNote};

/// Result of merging a job's fixes into its file set.
#[derive(Debug)]
pub struct MergeOutcome {
    pub patched: FileSet,
    pub notes: Vec<MergeNote>,
}

/// Apply `fixes` (in order) to a copy of `original`. Sets `applied` on each
/// fix; never fails. Unmatchable fixes stay unapplied with a note.
pub fn merge_fixes(original: &FileSet, issues: &[Issue], fixes: &mut [Fix]) -> MergeOutcome {
    let mut patched = original.clone();
    let mut notes = Vec::new();
    // Applied line spans per file, in original-issue coordinates, used only
    // for overlap detection.
    let mut spans: HashMap<String, Vec<(u32, u32, usize)>> = HashMap::new();
    let issue_by_id: HashMap<&str, &Issue> =
        issues.iter().map(|i| (i.id.as_str(), i)).collect();

    for idx in 0..fixes.len() {
        let (path, before, after, issue_id) = {
            let f = &fixes[idx];
            (
                f.file_path.clone(),
                f.before_code.clone(),
                f.after_code.clone(),
                f.issue_id.clone(),
            )
        };

        let Some(content) = patched.get(&path).map(str::to_string) else {
            warn!(%path, %issue_id, "fix targets a file not in the set");
            notes.push(MergeNote {
                file_path: path,
                issue_id,
                detail: "fix targets a file absent from the input set".to_string(),
            });
            continue;
        };

        let range = issue_by_id
            .get(issue_id.as_str())
            .map(|i| (i.line_start, i.line_end));

        let new_content = apply_tiers(&content, &before, &after, range);
        match new_content {
            Some(updated) => {
                patched.insert(path.clone(), updated);
                fixes[idx].applied = true;
                debug!(%path, %issue_id, "fix applied");

                if let Some((start, end)) = range {
                    let file_spans = spans.entry(path.clone()).or_default();
                    for &(s, e, earlier_idx) in file_spans.iter() {
                        if start <= e && s <= end && fixes[earlier_idx].applied {
                            fixes[earlier_idx].applied = false;
                            notes.push(MergeNote {
                                file_path: path.clone(),
                                issue_id: fixes[earlier_idx].issue_id.clone(),
                                detail: format!(
                                    "overlapping change superseded by later fix for {issue_id}; \
                                     resolved by arrival order, review manually"
                                ),
                            });
                        }
                    }
                    file_spans.push((start, end, idx));
                }
            }
            None => {
                warn!(%path, %issue_id, "no tier matched the fix target");
                notes.push(MergeNote {
                    file_path: path,
                    issue_id,
                    detail: "target snippet not found; fix left unapplied".to_string(),
                });
            }
        }
    }

    MergeOutcome { patched, notes }
}

/// Tier 1: exact substring. Tier 2: line-range replacement. Tier 3:
/// whitespace-normalized window match.
fn apply_tiers(
    content: &str,
    before: &str,
    after: &str,
    range: Option<(u32, u32)>,
) -> Option<String> {
    if content.contains(before) {
        return Some(content.replacen(before, after, 1));
    }

    let lines: Vec<&str> = content.lines().collect();

    if let Some((start, end)) = range {
        let start = start as usize;
        let end = (end as usize).min(lines.len());
        if start >= 1 && start <= end && start <= lines.len() {
            return Some(splice_lines(&lines, start - 1, end, after, content));
        }
    }

    // Tier 3: slide a window the size of the snippet over the file and
    // compare with collapsed whitespace.
    let before_lines: Vec<&str> = before.lines().collect();
    if before_lines.is_empty() || before_lines.len() > lines.len() {
        return None;
    }
    let target = normalize_ws(before);
    for start in 0..=(lines.len() - before_lines.len()) {
        let window = lines[start..start + before_lines.len()].join("\n");
        if normalize_ws(&window) == target {
            return Some(splice_lines(
                &lines,
                start,
                start + before_lines.len(),
                after,
                content,
            ));
        }
    }
    None
}

/// Replace `lines[start..end]` with `replacement`, preserving a trailing
/// newline if the original content had one.
fn splice_lines(
    lines: &[&str],
    start: usize,
    end: usize,
    replacement: &str,
    original: &str,
) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    out.extend(&lines[..start]);
    out.extend(replacement.lines());
    out.extend(&lines[end..]);
    let mut joined = out.join("\n");
    if original.ends_with('\n') {
        joined.push('\n');
    }
    joined
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
