//! Operable-category agent: labels and accessible names.

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use super::perceivable::insert_attribute;
use super::{snippet_fix, CategoryAgent};
use crate::fileset::FileSet;
use crate::models::{Category, Fix, Issue};

pub struct OperableAgent {
    name_attr: Regex,
}

impl OperableAgent {
    pub fn new() -> Self {
        let name_attr = Regex::new(r#"\bname\s*=\s*["']([^"']+)["']"#)
            .unwrap_or_else(|e| panic!("bad name pattern: {e}"));
        Self { name_attr }
    }

    /// Derive a label from the input's `name` attribute, falling back to a
    /// generic one.
    fn input_label(&self, snippet: &str) -> String {
        let name = self.name_attr.captures(snippet).map(|c| c[1].to_string());
        match name {
            Some(n) => {
                let mut chars = n.chars();
                match chars.next() {
                    Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str()),
                    None => "Input field".to_string(),
                }
            }
            None => "Input field".to_string(),
        }
    }
}

impl Default for OperableAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CategoryAgent for OperableAgent {
    fn category(&self) -> Category {
        Category::Operable
    }

    async fn propose_fixes(&self, issues: &[Issue], _files: &FileSet) -> Result<Vec<Fix>> {
        let mut fixes = Vec::new();
        for issue in issues {
            let fix = match issue.rule_id.as_deref() {
                Some("label") => insert_attribute(
                    &issue.code_snippet,
                    "<input",
                    &format!(" aria-label=\"{}\"", self.input_label(&issue.code_snippet)),
                )
                .and_then(|after| snippet_fix(issue, after, 0.65)),
                Some("aria-label") => {
                    first_tag(&issue.code_snippet).and_then(|tag| {
                        insert_attribute(
                            &issue.code_snippet,
                            &tag,
                            " aria-label=\"Interactive element\"",
                        )
                        .and_then(|after| snippet_fix(issue, after, 0.5))
                    })
                }
                other => {
                    debug!(rule = ?other, issue = %issue.id, "no operable rewrite");
                    None
                }
            };
            fixes.extend(fix);
        }
        Ok(fixes)
    }
}

/// The opening tag name of the snippet's first element, as `<name`.
fn first_tag(snippet: &str) -> Option<String> {
    let start = snippet.find('<')?;
    let name: String = snippet[start + 1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(format!("<{name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn issue(rule: &str, snippet: &str) -> Issue {
        Issue {
            id: format!("f.html_1_{rule}"),
            file_path: "f.html".to_string(),
            line_start: 1,
            line_end: 1,
            category: Category::Operable,
            severity: Severity::High,
            description: String::new(),
            code_snippet: snippet.to_string(),
            rule_id: Some(rule.to_string()),
        }
    }

    #[tokio::test]
    async fn test_label_uses_input_name() {
        let fixes = OperableAgent::new()
            .propose_fixes(
                &[issue("label", "<input type=\"text\" name=\"email\">")],
                &FileSet::new(),
            )
            .await
            .unwrap();
        assert_eq!(fixes.len(), 1);
        assert!(fixes[0].after_code.contains("aria-label=\"Email\""));
    }

    #[tokio::test]
    async fn test_label_fallback_without_name() {
        let fixes = OperableAgent::new()
            .propose_fixes(&[issue("label", "<input type=\"text\">")], &FileSet::new())
            .await
            .unwrap();
        assert!(fixes[0].after_code.contains("aria-label=\"Input field\""));
    }

    #[tokio::test]
    async fn test_aria_label_on_clickable_element() {
        let fixes = OperableAgent::new()
            .propose_fixes(
                &[issue("aria-label", "<div onClick={open}>menu</div>")],
                &FileSet::new(),
            )
            .await
            .unwrap();
        assert_eq!(fixes.len(), 1);
        assert_eq!(
            fixes[0].after_code,
            "<div onClick={open} aria-label=\"Interactive element\">menu</div>"
        );
    }
}
