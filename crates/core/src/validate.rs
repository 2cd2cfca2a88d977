//! Post-fix validation.
//!
//! The validator re-checks every file at least one fix touched and returns
//! one result per file. Warnings alone never fail a file; any error does.
//! Validator failure degrades the job, it never aborts it.

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeSet;

use crate::fileset::FileSet;
use crate::models::ValidationResult;

/// Re-checks touched files against the patched content.
#[async_trait]
pub trait Validator: Send + Sync {
    /// One result per path in `touched`, in iteration order. Pure over its
    /// inputs; running it twice yields identical results.
    async fn validate(
        &self,
        touched: &BTreeSet<String>,
        files: &FileSet,
    ) -> Result<Vec<ValidationResult>>;
}

/// Deterministic rule-based validator for HTML and CSS content.
pub struct RuleValidator {
    img_no_alt: Regex,
    bare_input: Regex,
    non_labelable_input: Regex,
    labeled: Regex,
}

impl RuleValidator {
    pub fn new() -> Self {
        let rx = |p: &str| Regex::new(p).unwrap_or_else(|e| panic!("bad validator pattern {p}: {e}"));
        Self {
            img_no_alt: rx(r"<img\b[^>]*>"),
            bare_input: rx(r"<input\b[^>]*>"),
            non_labelable_input: rx(r#"\btype\s*=\s*["']?(hidden|submit|button|reset)"#),
            labeled: rx(r#"\b(aria-label|aria-labelledby|id)\s*="#),
        }
    }

    fn check_html(&self, content: &str) -> (Vec<String>, Vec<String>) {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let lower = content.to_lowercase();

        if lower.contains("<html") {
            if !lower.contains("<!doctype") {
                warnings.push("document has no doctype declaration".to_string());
            }
            if !lower.contains("<head") {
                warnings.push("document has no <head> element".to_string());
            }
            if !lower.contains("<body") {
                warnings.push("document has no <body> element".to_string());
            }
        }

        for m in self.img_no_alt.find_iter(content) {
            if !m.as_str().contains("alt=") {
                errors.push(format!("image still missing alt attribute: {}", m.as_str()));
            }
        }
        for m in self.bare_input.find_iter(content) {
            let tag = m.as_str();
            if !self.non_labelable_input.is_match(tag) && !self.labeled.is_match(tag) {
                errors.push(format!("input still has no accessible label: {tag}"));
            }
        }

        (errors, warnings)
    }

    fn check_css(&self, content: &str) -> (Vec<String>, Vec<String>) {
        let mut errors = Vec::new();
        let opens = content.matches('{').count();
        let closes = content.matches('}').count();
        if opens != closes {
            errors.push(format!(
                "unbalanced braces: {opens} opening vs {closes} closing"
            ));
        }
        (errors, Vec::new())
    }
}

impl Default for RuleValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Validator for RuleValidator {
    async fn validate(
        &self,
        touched: &BTreeSet<String>,
        files: &FileSet,
    ) -> Result<Vec<ValidationResult>> {
        let mut results = Vec::with_capacity(touched.len());
        for path in touched {
            let Some(content) = files.get(path) else {
                results.push(ValidationResult {
                    file_path: path.clone(),
                    passed: false,
                    errors: vec!["file missing from patched set".to_string()],
                    warnings: Vec::new(),
                });
                continue;
            };

            let (errors, warnings) = if path.ends_with(".css") {
                self.check_css(content)
            } else {
                self.check_html(content)
            };

            results.push(ValidationResult {
                file_path: path.clone(),
                passed: errors.is_empty(),
                errors,
                warnings,
            });
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touched(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[tokio::test]
    async fn test_clean_file_passes() {
        let files = FileSet::from_entries([(
            "a.html".to_string(),
            "<img src=\"x\" alt=\"logo\">".to_string(),
        )]);
        let results = RuleValidator::new()
            .validate(&touched(&["a.html"]), &files)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].passed);
        assert!(results[0].errors.is_empty());
    }

    #[tokio::test]
    async fn test_remaining_alt_violation_fails() {
        let files =
            FileSet::from_entries([("a.html".to_string(), "<img src=\"x\">".to_string())]);
        let results = RuleValidator::new()
            .validate(&touched(&["a.html"]), &files)
            .await
            .unwrap();
        assert!(!results[0].passed);
        assert_eq!(results[0].errors.len(), 1);
    }

    #[tokio::test]
    async fn test_warnings_alone_pass() {
        let files = FileSet::from_entries([(
            "a.html".to_string(),
            "<html lang=\"en\"><body></body></html>".to_string(),
        )]);
        let results = RuleValidator::new()
            .validate(&touched(&["a.html"]), &files)
            .await
            .unwrap();
        assert!(results[0].passed);
        assert!(!results[0].warnings.is_empty()); // no doctype, no head
    }

    #[tokio::test]
    async fn test_unbalanced_css_fails() {
        let files =
            FileSet::from_entries([("s.css".to_string(), "a { color: red;".to_string())]);
        let results = RuleValidator::new()
            .validate(&touched(&["s.css"]), &files)
            .await
            .unwrap();
        assert!(!results[0].passed);
    }

    #[tokio::test]
    async fn test_one_result_per_touched_file() {
        let files = FileSet::from_entries([
            ("a.html".to_string(), "<p>ok</p>".to_string()),
            ("b.html".to_string(), "<p>ok</p>".to_string()),
            ("c.html".to_string(), "<p>never touched</p>".to_string()),
        ]);
        let results = RuleValidator::new()
            .validate(&touched(&["a.html", "b.html"]), &files)
            .await
            .unwrap();
        let paths: Vec<_> = results.iter().map(|r| r.file_path.clone()).collect();
        assert_eq!(paths, vec!["a.html", "b.html"]);
    }

    #[tokio::test]
    async fn test_idempotent() {
        let files =
            FileSet::from_entries([("a.html".to_string(), "<img src=\"x\">".to_string())]);
        let v = RuleValidator::new();
        let first = v.validate(&touched(&["a.html"]), &files).await.unwrap();
        let second = v.validate(&touched(&["a.html"]), &files).await.unwrap();
        assert_eq!(first, second);
    }
}
