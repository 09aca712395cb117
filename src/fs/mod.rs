use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::config::ScanConfig;
use crate::utils::ignore_rules::{IgnoreRules, PROJECT_IGNORE_FILE};

/// A file kept by the walk, before any content has been read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    pub relative: String,
    pub absolute: PathBuf,
    pub size: u64,
}

/// Everything the walk saw, including what it had to skip.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub files: Vec<WalkedFile>,
    /// Relative paths of every directory visited below the root
    pub directories: Vec<String>,
    pub skipped_oversized: usize,
    pub io_errors: usize,
    pub truncated: bool,
}

/// Root-relative path with `/` separators.
pub fn relative_path(path: &Path, root: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    Some(parts.join("/"))
}

/// Walks `root` depth-first in file-name order.
///
/// Scoped `.gitignore` files (when enabled) and `.strataignore` files apply to
/// the directory that contains them; the compiled `rules` apply everywhere.
/// The walk stops once `config.max_files` files have been kept. Anything
/// below `config.max_depth` is left out and marks the outcome truncated.
pub fn walk_directory(root: &Path, rules: &IgnoreRules, config: &ScanConfig) -> WalkOutcome {
    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .hidden(false)
        .parents(false)
        .follow_links(false)
        .git_ignore(config.respect_gitignore)
        .require_git(false)
        // One level past the cap, to notice that there is more.
        .max_depth(Some(config.max_depth.saturating_add(1)))
        .overrides(rules.overrides().clone())
        .sort_by_file_name(|a, b| a.cmp(b));
    builder.add_custom_ignore_filename(PROJECT_IGNORE_FILE);

    let mut outcome = WalkOutcome::default();

    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable entry");
                outcome.io_errors += 1;
                continue;
            }
        };

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if entry.depth() == 0 {
            continue;
        }
        let Some(relative) = relative_path(entry.path(), root) else {
            continue;
        };
        if entry.depth() > config.max_depth {
            if !outcome.truncated {
                tracing::info!(limit = config.max_depth, path = %relative, "depth cap reached");
            }
            outcome.truncated = true;
            continue;
        }

        if file_type.is_dir() {
            outcome.directories.push(relative);
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(err) => {
                tracing::warn!(path = %relative, error = %err, "failed to stat file");
                outcome.io_errors += 1;
                continue;
            }
        };

        if size > config.max_file_size {
            tracing::debug!(
                path = %relative,
                size,
                limit = config.max_file_size,
                "skipping oversized file"
            );
            outcome.skipped_oversized += 1;
            continue;
        }

        if outcome.files.len() >= config.max_files {
            tracing::info!(limit = config.max_files, "file cap reached, stopping walk");
            outcome.truncated = true;
            break;
        }

        outcome.files.push(WalkedFile {
            relative,
            absolute: entry.into_path(),
            size,
        });
    }

    outcome
}
