//! Robust-category agent: roles on non-semantic elements and deprecated
//! markup.

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use super::perceivable::insert_attribute;
use super::{snippet_fix, CategoryAgent};
use crate::fileset::FileSet;
use crate::models::{Category, Fix, Issue};

pub struct RobustAgent;

#[async_trait]
impl CategoryAgent for RobustAgent {
    fn category(&self) -> Category {
        Category::Robust
    }

    async fn propose_fixes(&self, issues: &[Issue], _files: &FileSet) -> Result<Vec<Fix>> {
        let mut fixes = Vec::new();
        for issue in issues {
            let fix = match issue.rule_id.as_deref() {
                Some("role") => {
                    let tag = if issue.code_snippet.contains("<span") {
                        "<span"
                    } else {
                        "<div"
                    };
                    insert_attribute(
                        &issue.code_snippet,
                        tag,
                        " role=\"button\" tabindex=\"0\"",
                    )
                    .and_then(|after| snippet_fix(issue, after, 0.7))
                }
                Some("deprecated-element") => replace_deprecated(&issue.code_snippet)
                    .and_then(|after| snippet_fix(issue, after, 0.55)),
                other => {
                    debug!(rule = ?other, issue = %issue.id, "no robust rewrite");
                    None
                }
            };
            fixes.extend(fix);
        }
        Ok(fixes)
    }
}

/// Replacement table for deprecated presentational elements.
const DEPRECATED_SWAPS: &[(&str, &str)] = &[
    ("font", "span"),
    ("center", "div"),
    ("marquee", "div"),
    ("blink", "span"),
    ("big", "strong"),
    ("strike", "del"),
];

fn replace_deprecated(snippet: &str) -> Option<String> {
    let rx = Regex::new(r"(</?)(font|center|marquee|blink|big|strike)\b").ok()?;
    if !rx.is_match(snippet) {
        return None;
    }
    let out = rx.replace_all(snippet, |caps: &regex::Captures| {
        let replacement = DEPRECATED_SWAPS
            .iter()
            .find(|(from, _)| *from == &caps[2])
            .map(|(_, to)| *to)
            .unwrap_or("div");
        format!("{}{}", &caps[1], replacement)
    });
    Some(out.into_owned())
}
