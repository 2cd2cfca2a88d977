//! In-memory file sets.
//!
//! A job operates on a materialized snapshot of its input files; nothing
//! downstream of ingestion touches the filesystem. `BTreeMap` keeps path
//! iteration deterministic across the whole pipeline.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Extensions the pipeline considers scannable source files
pub const SOURCE_EXTENSIONS: &[&str] = &["html", "htm", "js", "jsx", "ts", "tsx", "css"];

/// A set of text files keyed by relative path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileSet {
    pub files: BTreeMap<String, String>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from (path, content) pairs, e.g. an upload payload
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            files: entries.into_iter().collect(),
        }
    }

    /// Load scannable files from a directory on disk.
    ///
    /// Honors `.gitignore`/hidden-file conventions via the `ignore` walker
    /// and keeps only [`SOURCE_EXTENSIONS`]. Paths are stored relative to
    /// `root` with forward slashes.
    pub fn load_dir(root: &Path) -> Result<Self> {
        let mut files = BTreeMap::new();
        let walker = ignore::WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .build();

        for entry in walker {
            let entry = entry.context("failed to walk input directory")?;
            let path = entry.path();
            if !path.is_file() || !is_source_file(path) {
                continue;
            }
            let rel = path
                .strip_prefix(root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            files.insert(rel, content);
        }

        Ok(Self { files })
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// The subset containing only the given paths. Used to hand each
    /// category agent just the files its issues reference.
    pub fn subset(&self, paths: &BTreeSet<String>) -> FileSet {
        FileSet {
            files: self
                .files
                .iter()
                .filter(|(p, _)| paths.contains(*p))
                .map(|(p, c)| (p.clone(), c.clone()))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.files.iter()
    }
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SOURCE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subset_filters_paths() {
        let set = FileSet::from_entries([
            ("a.html".to_string(), "<p>a</p>".to_string()),
            ("b.css".to_string(), "p { color: red; }".to_string()),
        ]);
        let wanted: BTreeSet<String> = ["a.html".to_string()].into_iter().collect();
        let sub = set.subset(&wanted);
        assert_eq!(sub.len(), 1);
        assert!(sub.get("a.html").is_some());
        assert!(sub.get("b.css").is_none());
    }

    #[test]
    fn test_load_dir_keeps_source_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page.html"), "<html></html>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();
        std::fs::create_dir(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css/site.css"), "body {}").unwrap();

        let set = FileSet::load_dir(dir.path()).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.get("page.html").is_some());
        assert!(set.get("css/site.css").is_some());
        assert!(set.get("notes.txt").is_none());
    }

    #[test]
    fn test_iteration_is_sorted() {
        let set = FileSet::from_entries([
            ("z.html".to_string(), String::new()),
            ("a.html".to_string(), String::new()),
        ]);
        let paths: Vec<_> = set.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(paths, vec!["a.html", "z.html"]);
    }
}
