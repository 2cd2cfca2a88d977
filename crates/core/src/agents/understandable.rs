//! Understandable-category agent: heading structure and document language.

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use super::perceivable::insert_attribute;
use super::{snippet_fix, CategoryAgent};
use crate::fileset::FileSet;
use crate::models::{Category, Fix, Issue};

pub struct UnderstandableAgent;

#[async_trait]
impl CategoryAgent for UnderstandableAgent {
    fn category(&self) -> Category {
        Category::Understandable
    }

    async fn propose_fixes(&self, issues: &[Issue], _files: &FileSet) -> Result<Vec<Fix>> {
        let mut fixes = Vec::new();
        for issue in issues {
            let fix = match issue.rule_id.as_deref() {
                Some("heading-order") => lower_heading(&issue.code_snippet)
                    .and_then(|after| snippet_fix(issue, after, 0.7)),
                Some("html-lang") => {
                    insert_attribute(&issue.code_snippet, "<html", " lang=\"en\"")
                        .and_then(|after| snippet_fix(issue, after, 0.9))
                }
                other => {
                    debug!(rule = ?other, issue = %issue.id, "no understandable rewrite");
                    None
                }
            };
            fixes.extend(fix);
        }
        Ok(fixes)
    }
}

/// Lower every heading tag in the snippet by one level (h3 → h2). Level 1
/// headings are left alone.
fn lower_heading(snippet: &str) -> Option<String> {
    let rx = Regex::new(r"(</?h)([2-6])\b").ok()?;
    if !rx.is_match(snippet) {
        return None;
    }
    let out = rx.replace_all(snippet, |caps: &regex::Captures| {
        let level: u32 = caps[2].parse().unwrap_or(2);
        format!("{}{}", &caps[1], level - 1)
    });
    Some(out.into_owned())
}
