//! Rule-based static detector.
//!
//! Line-oriented regex scans over HTML/JSX/CSS content. Each rule carries a
//! stable `rule_id` that the category agents key their rewrites on, so the
//! rule set and the agent rewrite tables evolve together.

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

use super::{DetectError, IssueDetector};
use crate::fileset::FileSet;
use crate::models::{Category, Issue, Severity};

/// Detector tuning. Exempt globs are matched against relative paths.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Paths matching any of these globs are skipped entirely
    pub exempt_globs: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            exempt_globs: vec![
                "**/node_modules/**".to_string(),
                "**/*.min.js".to_string(),
                "**/*.min.css".to_string(),
                "**/dist/**".to_string(),
            ],
        }
    }
}

/// The built-in detector: a fixed table of markup and stylesheet rules.
pub struct RuleDetector {
    config: DetectorConfig,
    img_tag: Regex,
    alt_attr: Regex,
    input_tag: Regex,
    non_labelable_input: Regex,
    labeled: Regex,
    click_handler: Regex,
    heading: Regex,
    html_tag: Regex,
    lang_attr: Regex,
    div_tag: Regex,
    role_attr: Regex,
    deprecated_tag: Regex,
    css_color: Regex,
    css_background: Regex,
}

impl RuleDetector {
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        // All patterns are literals known to compile; panic here would be a
        // programming error caught by the unit tests.
        let rx = |p: &str| Regex::new(p).unwrap_or_else(|e| panic!("bad rule pattern {p}: {e}"));
        Self {
            config,
            img_tag: rx(r"<img\b[^>]*>"),
            alt_attr: rx(r#"\balt\s*="#),
            input_tag: rx(r"<input\b[^>]*>"),
            non_labelable_input: rx(r#"\btype\s*=\s*["']?(hidden|submit|button|reset)"#),
            labeled: rx(r#"\b(aria-label|aria-labelledby|id)\s*="#),
            click_handler: rx(r"\bon[Cc]lick\s*="),
            heading: rx(r"<h([1-6])\b"),
            html_tag: rx(r"<html\b[^>]*>"),
            lang_attr: rx(r"\blang\s*="),
            div_tag: rx(r"<(div|span)\b[^>]*>"),
            role_attr: rx(r"\brole\s*="),
            deprecated_tag: rx(r"<(font|center|marquee|blink|big|strike)\b"),
            css_color: rx(r"(^|[^-\w])color\s*:"),
            css_background: rx(r"\bbackground(-color)?\s*:"),
        }
    }

    fn is_exempt(&self, path: &str) -> bool {
        self.config.exempt_globs.iter().any(|g| {
            glob::Pattern::new(g)
                .map(|p| p.matches(path))
                .unwrap_or(false)
        })
    }

    fn scan_markup(&self, path: &str, content: &str, issues: &mut Vec<Issue>) {
        let mut last_heading_level: Option<u32> = None;

        for (idx, line) in content.lines().enumerate() {
            let line_no = (idx + 1) as u32;

            if let Some(m) = self.img_tag.find(line) {
                if !self.alt_attr.is_match(m.as_str()) {
                    issues.push(make_issue(
                        path,
                        line_no,
                        "img-alt",
                        Category::Perceivable,
                        Severity::High,
                        "Image element is missing an alt attribute",
                        line,
                    ));
                }
            }

            if let Some(m) = self.input_tag.find(line) {
                let tag = m.as_str();
                if !self.non_labelable_input.is_match(tag) && !self.labeled.is_match(tag) {
                    issues.push(make_issue(
                        path,
                        line_no,
                        "label",
                        Category::Operable,
                        Severity::High,
                        "Form input has no associated label or aria-label",
                        line,
                    ));
                }
            }

            if self.click_handler.is_match(line)
                && !line.contains("aria-label")
                && !line.contains("<button")
                && !line.contains("<a ")
            {
                issues.push(make_issue(
                    path,
                    line_no,
                    "aria-label",
                    Category::Operable,
                    Severity::Medium,
                    "Interactive element with a click handler lacks an accessible name",
                    line,
                ));
            }

            if let Some(caps) = self.heading.captures(line) {
                // Capture group 1 is a single digit 1-6 by construction.
                let level: u32 = caps[1].parse().unwrap_or(1);
                if let Some(prev) = last_heading_level {
                    if level > prev + 1 {
                        issues.push(make_issue(
                            path,
                            line_no,
                            "heading-order",
                            Category::Understandable,
                            Severity::Medium,
                            &format!("Heading level skips from h{prev} to h{level}"),
                            line,
                        ));
                    }
                }
                last_heading_level = Some(level);
            }

            if let Some(m) = self.html_tag.find(line) {
                if !self.lang_attr.is_match(m.as_str()) {
                    issues.push(make_issue(
                        path,
                        line_no,
                        "html-lang",
                        Category::Understandable,
                        Severity::Medium,
                        "Document root is missing a lang attribute",
                        line,
                    ));
                }
            }

            if let Some(m) = self.div_tag.find(line) {
                if self.click_handler.is_match(line) && !self.role_attr.is_match(m.as_str()) {
                    issues.push(make_issue(
                        path,
                        line_no,
                        "role",
                        Category::Robust,
                        Severity::Medium,
                        "Clickable non-semantic element has no role",
                        line,
                    ));
                }
            }

            if let Some(caps) = self.deprecated_tag.captures(line) {
                issues.push(make_issue(
                    path,
                    line_no,
                    "deprecated-element",
                    Category::Robust,
                    Severity::Medium,
                    &format!("Deprecated element <{}> in use", &caps[1]),
                    line,
                ));
            }
        }
    }

    fn scan_stylesheet(&self, path: &str, content: &str, issues: &mut Vec<Issue>) {
        // Per-rule-block check: a declared foreground color without any
        // background declaration in the same block cannot be contrast-checked.
        let mut block_start: u32 = 0;
        let mut block_lines: Vec<(u32, String)> = Vec::new();
        let mut depth = 0i32;

        for (idx, line) in content.lines().enumerate() {
            let line_no = (idx + 1) as u32;
            if depth == 0 && line.contains('{') {
                block_start = line_no;
                block_lines.clear();
            }
            depth += line.matches('{').count() as i32;
            if depth > 0 {
                block_lines.push((line_no, line.to_string()));
            }
            depth -= line.matches('}').count() as i32;

            if depth == 0 && line.contains('}') {
                let has_color = block_lines
                    .iter()
                    .any(|(_, l)| self.css_color.is_match(l) && !self.css_background.is_match(l));
                let has_background =
                    block_lines.iter().any(|(_, l)| self.css_background.is_match(l));
                if has_color && !has_background {
                    let snippet = block_lines
                        .iter()
                        .map(|(_, l)| l.as_str())
                        .collect::<Vec<_>>()
                        .join("\n");
                    let end = block_lines.last().map(|(n, _)| *n).unwrap_or(block_start);
                    let mut issue = make_issue(
                        path,
                        block_start,
                        "color-contrast",
                        Category::Perceivable,
                        Severity::Medium,
                        "Text color declared without a background color; contrast cannot be verified",
                        &snippet,
                    );
                    issue.line_end = end;
                    issues.push(issue);
                }
            }
        }
    }
}

impl Default for RuleDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IssueDetector for RuleDetector {
    async fn detect(&self, files: &FileSet) -> Result<Vec<Issue>, DetectError> {
        if files.is_empty() {
            return Err(DetectError::UnreadableInput(
                "file set contains no scannable files".to_string(),
            ));
        }

        let mut issues = Vec::new();
        for (path, content) in files.iter() {
            if self.is_exempt(path) {
                debug!(%path, "skipping exempt file");
                continue;
            }
            let ext = path.rsplit('.').next().unwrap_or("");
            match ext {
                "css" => self.scan_stylesheet(path, content, &mut issues),
                _ => self.scan_markup(path, content, &mut issues),
            }
        }

        // Stable ordering: path, then line, then rule. Duplicate ids (two
        // hits of one rule on one line) get a disambiguating counter.
        issues.sort_by(|a, b| {
            (&a.file_path, a.line_start, &a.rule_id)
                .cmp(&(&b.file_path, b.line_start, &b.rule_id))
        });
        let mut seen: HashMap<String, u32> = HashMap::new();
        for issue in &mut issues {
            let n = seen.entry(issue.id.clone()).or_insert(0);
            if *n > 0 {
                issue.id = format!("{}_{}", issue.id, n);
            }
            *n += 1;
        }

        Ok(issues)
    }
}

fn make_issue(
    path: &str,
    line: u32,
    rule_id: &str,
    category: Category,
    severity: Severity,
    description: &str,
    snippet: &str,
) -> Issue {
    Issue {
        id: format!("{}_{}_{}", path, line, rule_id),
        file_path: path.to_string(),
        line_start: line,
        line_end: line,
        category,
        severity,
        description: description.to_string(),
        code_snippet: snippet.trim_end().to_string(),
        rule_id: Some(rule_id.to_string()),
    }
}
