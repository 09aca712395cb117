//! Directory scanner
//!
//! Walks the root, sniffs every kept file for binary content on the worker
//! pool and aggregates directory and language statistics.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::config::ScanConfig;
use crate::core::{
    DirectoryRecord, FileRecord, LanguageStats, ProjectStructure, ScanResult, ScanStats,
};
use crate::error::{AnalysisError, Result};
use crate::fs::{WalkedFile, walk_directory};
use crate::utils::binary::sniff_file;
use crate::utils::ignore_rules::IgnoreRules;
use crate::utils::language::language_for_extension;

/// Share (in percent) a language needs to be a main-language candidate.
const MAIN_LANGUAGE_MIN_SHARE: f64 = 10.0;

pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Scanner for building a [`ProjectStructure`] from a directory
pub struct Scanner {
    config: ScanConfig,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Scan `root`. Only an unusable root or malformed ignore pattern is an
    /// error; unreadable entries are counted in [`ScanStats::io_errors`].
    pub fn scan(&self, root: &Path) -> Result<ScanResult> {
        let root = canonical_root(root)?;
        let rules = IgnoreRules::new(&root, &self.config)?;
        let outcome = walk_directory(&root, &rules, &self.config);

        let (files, sniff_errors) = inspect_files(&outcome.files);

        let directories = aggregate_directories(&files, &outcome.directories);
        let languages = language_histogram(&files);
        let main_language = main_language(&languages);

        let stats = ScanStats {
            files_analyzed: files.len(),
            directories: directories.len(),
            skipped_oversized: outcome.skipped_oversized,
            io_errors: outcome.io_errors + sniff_errors,
            truncated: outcome.truncated,
        };

        tracing::info!(
            root = %root.display(),
            files = stats.files_analyzed,
            directories = stats.directories,
            skipped = stats.skipped_oversized,
            errors = stats.io_errors,
            truncated = stats.truncated,
            main_language = %main_language,
            "scan complete"
        );

        Ok(ScanResult {
            structure: ProjectStructure {
                files,
                directories,
                languages,
                main_language,
            },
            stats,
        })
    }
}

/// Resolves the scan root, failing fast if it is not a readable directory.
pub fn canonical_root(root: &Path) -> Result<PathBuf> {
    let canonical = root
        .canonicalize()
        .map_err(|e| AnalysisError::InvalidRoot(format!("{}: {}", root.display(), e)))?;
    if !canonical.is_dir() {
        return Err(AnalysisError::InvalidRoot(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    Ok(canonical)
}

/// Path-sorted records for the walked files, plus the number that could
/// not be read.
fn inspect_files(walked: &[WalkedFile]) -> (Vec<FileRecord>, usize) {
    let failures = AtomicUsize::new(0);
    let mut files: Vec<FileRecord> = walked
        .par_iter()
        .filter_map(|walked| match build_record(walked) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(path = %walked.relative, error = %err, "failed to sniff file");
                failures.fetch_add(1, Ordering::Relaxed);
                None
            }
        })
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    (files, failures.into_inner())
}

fn build_record(walked: &WalkedFile) -> std::io::Result<FileRecord> {
    let is_binary = sniff_file(&walked.absolute)?;
    let name = walked
        .relative
        .rsplit('/')
        .next()
        .unwrap_or(&walked.relative)
        .to_string();
    let extension = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    };
    let language = language_for_extension(&extension).map(String::from);

    Ok(FileRecord {
        path: walked.relative.clone(),
        name,
        extension,
        size: walked.size,
        language,
        is_binary,
    })
}

fn aggregate_directories(files: &[FileRecord], walked_dirs: &[String]) -> Vec<DirectoryRecord> {
    let mut records: BTreeMap<String, DirectoryRecord> = BTreeMap::new();
    let entry = |path: &str| -> DirectoryRecord {
        DirectoryRecord {
            path: path.to_string(),
            file_count: 0,
            subdirectory_count: 0,
            total_size: 0,
        }
    };

    records.insert(".".to_string(), entry("."));
    for dir in walked_dirs {
        records.insert(dir.clone(), entry(dir));
    }

    for dir in walked_dirs {
        let parent = parent_dir(dir);
        if let Some(record) = records.get_mut(parent) {
            record.subdirectory_count += 1;
        }
    }

    for file in files {
        let direct = match file.parent() {
            "" => ".",
            dir => dir,
        };
        if let Some(record) = records.get_mut(direct) {
            record.file_count += 1;
        }

        // Every ancestor, including the root, accumulates the size.
        let mut current = direct;
        loop {
            if let Some(record) = records.get_mut(current) {
                record.total_size += file.size;
            }
            if current == "." {
                break;
            }
            current = parent_dir(current);
        }
    }

    records.into_values().collect()
}

fn parent_dir(dir: &str) -> &str {
    dir.rsplit_once('/').map(|(parent, _)| parent).unwrap_or(".")
}

fn language_histogram(files: &[FileRecord]) -> BTreeMap<String, LanguageStats> {
    let mut languages: BTreeMap<String, LanguageStats> = BTreeMap::new();
    for file in files {
        if let Some(language) = &file.language {
            let stats = languages.entry(language.clone()).or_insert(LanguageStats {
                files: 0,
                size: 0,
                percentage: 0.0,
            });
            stats.files += 1;
            stats.size += file.size;
        }
    }

    let total = files.len();
    for stats in languages.values_mut() {
        stats.percentage = stats.files as f64 / total as f64 * 100.0;
    }
    languages
}

/// Most frequent language among those with at least a 10% share, falling
/// back to the most frequent language overall, then `unknown`.
fn main_language(languages: &BTreeMap<String, LanguageStats>) -> String {
    let most_frequent = |min_share: f64| {
        languages
            .iter()
            .filter(|(_, stats)| stats.percentage >= min_share)
            // BTreeMap order makes ties resolve to the alphabetically first name.
            .fold(None::<(&String, usize)>, |best, (name, stats)| match best {
                Some((_, files)) if files >= stats.files => best,
                _ => Some((name, stats.files)),
            })
            .map(|(name, _)| name.clone())
    };

    most_frequent(MAIN_LANGUAGE_MIN_SHARE)
        .or_else(|| most_frequent(0.0))
        .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string())
}
