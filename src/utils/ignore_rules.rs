//! Ignore rules applied on top of the scoped `.gitignore` files
//!
//! Patterns use gitignore syntax:
//! - `build/` matches the directory `build` (and so everything beneath it)
//! - `docs/*.md` contains a `/` and is anchored to the scan root
//! - `*.log` has no `/` and matches at any depth

use std::path::{Path, PathBuf};

use ignore::overrides::{Override, OverrideBuilder};

use crate::config::{DEFAULT_IGNORE_DIRS, DEFAULT_IGNORE_FILES, ScanConfig};
use crate::error::Result;

/// Project-local ignore file, read with the same scoping as `.gitignore`.
pub const PROJECT_IGNORE_FILE: &str = ".strataignore";

/// Compiled configured and default ignore patterns for one scan root.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    root: PathBuf,
    overrides: Override,
    patterns: Vec<String>,
}

impl IgnoreRules {
    pub fn new(root: &Path, config: &ScanConfig) -> Result<Self> {
        let patterns = collect_patterns(config);
        let mut builder = OverrideBuilder::new(root);
        for pattern in &patterns {
            // In an override set a bare glob whitelists and `!glob` ignores.
            builder.add(&format!("!{}", pattern))?;
        }

        Ok(Self {
            root: root.to_path_buf(),
            overrides: builder.build()?,
            patterns,
        })
    }

    /// The override set handed to the directory walker.
    pub fn overrides(&self) -> &Override {
        &self.overrides
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Checks a root-relative path (and each of its ancestors) against the
    /// configured patterns. `.gitignore` files are not consulted here.
    pub fn is_ignored(&self, relative: &str, is_dir: bool) -> bool {
        let parts: Vec<&str> = relative.split('/').filter(|p| !p.is_empty()).collect();
        let mut current = self.root.clone();
        for (i, part) in parts.iter().enumerate() {
            current.push(part);
            let last = i + 1 == parts.len();
            if self
                .overrides
                .matched(&current, !last || is_dir)
                .is_ignore()
            {
                return true;
            }
        }
        false
    }
}

/// Defaults first, then the configured entries; none of them can be negated.
fn collect_patterns(config: &ScanConfig) -> Vec<String> {
    let dirs = DEFAULT_IGNORE_DIRS
        .iter()
        .copied()
        .chain(config.ignore_dirs.iter().map(String::as_str));
    let files = DEFAULT_IGNORE_FILES
        .iter()
        .copied()
        .chain(config.ignore_files.iter().map(String::as_str));

    let mut patterns = Vec::new();
    for dir in dirs {
        let trimmed = dir.trim().trim_end_matches('/');
        if !trimmed.is_empty() {
            patterns.push(format!("{}/", trimmed));
        }
    }
    for pattern in files {
        let trimmed = pattern.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if trimmed.starts_with('!') {
            // Configured patterns only ever exclude.
            tracing::debug!(pattern = trimmed, "ignoring negated configured pattern");
            continue;
        }
        patterns.push(trimmed.to_string());
    }
    patterns.sort();
    patterns.dedup();
    patterns
}
