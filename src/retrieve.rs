//! Local document search: load a document, find keyword windows, compose
//! a bounded context string.

use std::path::Path;

use store_harness_core::error::Result;
use store_harness_core::models::ContextSection;
use store_harness_core::search::{compose_context, merge_overlapping, search};

use crate::config::SearchConfig;
use crate::document::load_lines;

#[derive(Debug, Clone, Copy)]
pub struct LocalSearchOptions {
    pub radius: usize,
    pub max_chars: usize,
    pub max_sections: usize,
    /// Collapse overlapping windows before composing.
    pub merge: bool,
}

impl LocalSearchOptions {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            radius: config.radius,
            max_chars: config.max_chars,
            max_sections: config.max_sections,
            merge: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalSearchResult {
    /// Every keyword section found, in document order.
    pub sections: Vec<ContextSection>,
    /// The first `max_sections` sections, composed and size-bounded.
    pub context: String,
}

impl LocalSearchResult {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

pub fn search_document(
    path: &Path,
    query: &str,
    options: &LocalSearchOptions,
) -> Result<LocalSearchResult> {
    let lines = load_lines(path)?;
    let mut sections = search(&lines, query, options.radius);
    if options.merge {
        sections = merge_overlapping(sections);
    }
    let context = compose_context(&sections, options.max_chars, options.max_sections);

    tracing::debug!(
        document = %path.display(),
        sections = sections.len(),
        chars = context.chars().count(),
        "local search"
    );
    Ok(LocalSearchResult { sections, context })
}

#[cfg(test)]
mod tests {
    use super::*;
    use store_harness_core::error::HarnessError;
    use tempfile::TempDir;

    fn options(radius: usize, merge: bool) -> LocalSearchOptions {
        LocalSearchOptions {
            radius,
            max_chars: 10_000,
            max_sections: 5,
            merge,
        }
    }

    fn write_doc(content: &str) -> (TempDir, std::path::PathBuf) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("guide.md");
        std::fs::write(&path, content).unwrap();
        (tmp, path)
    }

    #[test]
    fn finds_sections_and_composes_context() {
        let (_tmp, path) = write_doc("intro\nViewer setup\nmore\nother\nviewer close\n");
        let result = search_document(&path, "viewer", &options(0, false)).unwrap();
        assert_eq!(result.sections.len(), 2);
        assert_eq!(
            result.context,
            "\n\n[line 2]\nViewer setup\n\n[line 5]\nviewer close"
        );
    }

    #[test]
    fn merge_collapses_overlapping_windows() {
        let (_tmp, path) = write_doc("a\nkey one\nkey two\nb\n");
        let unmerged = search_document(&path, "key", &options(1, false)).unwrap();
        let merged = search_document(&path, "key", &options(1, true)).unwrap();
        assert_eq!(unmerged.sections.len(), 2);
        assert_eq!(merged.sections.len(), 1);
        assert_eq!(merged.sections[0].anchor_line, 2);
        assert_eq!(merged.sections[0].lines, vec!["a", "key one", "key two", "b"]);
    }

    #[test]
    fn no_match_is_empty_not_error() {
        let (_tmp, path) = write_doc("nothing to see\n");
        let result = search_document(&path, "viewer", &options(2, false)).unwrap();
        assert!(result.is_empty());
        assert!(result.context.is_empty());
    }

    #[test]
    fn missing_document_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = search_document(&tmp.path().join("nope.md"), "x", &options(1, false))
            .unwrap_err();
        assert!(matches!(err, HarnessError::NotFound(_)));
    }
}
