//! File selection policy.
//!
//! Walks a sync root and decides which files qualify for upload:
//!
//! 1. Directories whose name is in the exclusion set (build output, version
//!    control, package caches, `Debug`/`Release`) are never entered.
//! 2. A file qualifies only if its extension, compared case-insensitively,
//!    is on the profile's allow-list.
//! 3. A file is rejected if *any* ancestor segment relative to the root is
//!    in the exclusion set, not only its immediate parent.
//!
//! Traversal is sorted by file name, so repeated calls on an unchanged tree
//! return the same ordered sequence. Selection only reads the filesystem.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::path::{Component, Path};
use std::str::FromStr;
use walkdir::WalkDir;

use store_harness_core::error::{HarnessError, Result};
use store_harness_core::models::UploadCandidate;

use crate::config::SelectionConfig;

/// Which extension allow-list to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionProfile {
    /// Text, markup and office documents.
    Documents,
    /// Source project trees (code, project files, READMEs).
    Samples,
}

impl FromStr for SelectionProfile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "documents" | "docs" => Ok(SelectionProfile::Documents),
            "samples" => Ok(SelectionProfile::Samples),
            other => Err(format!(
                "unknown selection profile '{}': use documents or samples",
                other
            )),
        }
    }
}

/// Options for a single [`SelectionPolicy::select`] call.
#[derive(Debug, Clone, Copy)]
pub struct SelectOptions {
    /// Descend into subdirectories. When false only direct children count.
    pub recursive: bool,
    /// Use the root-relative path (with `/` separators) as display name.
    pub relative_names: bool,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            relative_names: false,
        }
    }
}

/// Compiled allow-list plus exclusion set.
pub struct SelectionPolicy {
    include: GlobSet,
    exclude: HashSet<String>,
}

impl SelectionPolicy {
    pub fn new(extensions: &[String], exclude_dirs: &[String]) -> Result<Self> {
        Ok(Self {
            include: build_extension_set(extensions)?,
            exclude: exclude_dirs.iter().cloned().collect(),
        })
    }

    pub fn from_config(config: &SelectionConfig, profile: SelectionProfile) -> Result<Self> {
        Self::new(config.extensions(profile), &config.exclude_dirs)
    }

    /// True when a root-relative file path has an excluded ancestor segment.
    pub fn is_excluded(&self, relative: &Path) -> bool {
        relative
            .parent()
            .map(|parent| {
                parent.components().any(|c| match c {
                    Component::Normal(seg) => self.exclude.contains(seg.to_string_lossy().as_ref()),
                    _ => false,
                })
            })
            .unwrap_or(false)
    }

    /// True when the file name carries an allowed extension.
    pub fn allows(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.include.is_match(Path::new(name)))
            .unwrap_or(false)
    }

    /// Resolve the ordered upload candidates under `root`.
    pub fn select(&self, root: &Path, options: SelectOptions) -> Result<Vec<UploadCandidate>> {
        if !root.is_dir() {
            return Err(HarnessError::NotFound(root.to_path_buf()));
        }

        let max_depth = if options.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !(e.file_type().is_dir() && self.is_excluded_dir_name(e.file_name()))
            });

        let mut candidates = Vec::new();
        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            if self.is_excluded(relative) || !self.allows(path) {
                continue;
            }

            let extension = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            let display_name = if options.relative_names {
                relative_display(relative)
            } else {
                entry.file_name().to_string_lossy().to_string()
            };

            candidates.push(UploadCandidate {
                path: path.to_path_buf(),
                extension,
                display_name,
            });
        }

        tracing::debug!(root = %root.display(), count = candidates.len(), "selected files");
        Ok(candidates)
    }

    fn is_excluded_dir_name(&self, name: &std::ffi::OsStr) -> bool {
        self.exclude.contains(name.to_string_lossy().as_ref())
    }
}

/// Candidate for a single explicitly named file, bypassing the allow-list.
pub fn single_file_candidate(path: &Path) -> Result<UploadCandidate> {
    if !path.is_file() {
        return Err(HarnessError::NotFound(path.to_path_buf()));
    }
    Ok(UploadCandidate {
        path: path.to_path_buf(),
        extension: path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default(),
        display_name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
    })
}

fn relative_display(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn build_extension_set(extensions: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for ext in extensions {
        let ext = ext.trim_start_matches('.');
        let glob = GlobBuilder::new(&format!("*.{}", ext))
            .case_insensitive(true)
            .literal_separator(true)
            .build()
            .map_err(|e| HarnessError::Configuration(format!("bad extension '{}': {}", ext, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| HarnessError::Configuration(e.to_string()))
}
