//! Perceivable-category agent: alt text and color contrast.

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::{snippet_fix, CategoryAgent};
use crate::fileset::FileSet;
use crate::models::{Category, Fix, Issue};

pub struct PerceivableAgent;

#[async_trait]
impl CategoryAgent for PerceivableAgent {
    fn category(&self) -> Category {
        Category::Perceivable
    }

    async fn propose_fixes(&self, issues: &[Issue], _files: &FileSet) -> Result<Vec<Fix>> {
        let mut fixes = Vec::new();
        for issue in issues {
            let fix = match issue.rule_id.as_deref() {
                Some("img-alt") => {
                    insert_attribute(&issue.code_snippet, "<img", " alt=\"\"")
                        .and_then(|after| snippet_fix(issue, after, 0.6))
                }
                Some("color-contrast") => {
                    // No safe automatic recolor; annotate for manual review.
                    let after = format!(
                        "{}\n/* TODO: verify text/background contrast meets WCAG AA */",
                        issue.code_snippet
                    );
                    snippet_fix(issue, after, 0.3)
                }
                other => {
                    debug!(rule = ?other, issue = %issue.id, "no perceivable rewrite");
                    None
                }
            };
            fixes.extend(fix);
        }
        Ok(fixes)
    }
}

/// Insert `attr` into the first `tag` occurrence, just before its `>` or
/// `/>`. Returns `None` when the snippet has no such tag.
pub(crate) fn insert_attribute(snippet: &str, tag: &str, attr: &str) -> Option<String> {
    let start = snippet.find(tag)?;
    let close = snippet[start..].find('>')? + start;
    let mut insert_at = close;
    if snippet[..insert_at].ends_with('/') {
        insert_at -= 1;
    }
    while snippet[..insert_at].ends_with(' ') {
        insert_at -= 1;
    }
    let mut out = String::with_capacity(snippet.len() + attr.len());
    out.push_str(&snippet[..insert_at]);
    out.push_str(attr);
    out.push_str(&snippet[insert_at..]);
    Some(out)
}
