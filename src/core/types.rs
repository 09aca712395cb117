//! Core types shared across strata modules

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Events emitted during an analysis run
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// Scanning has started
    StartScanning,
    /// Number of files kept by the scanner
    FilesFound(usize),
    /// The walk stopped early at the file cap
    ScanTruncated(usize),
    /// Number of functionalities reported
    FunctionalitiesDetected(usize),
    /// Dependency graph finished
    GraphBuilt {
        nodes: usize,
        edges: usize,
        cycles: usize,
    },
    /// Number of non-empty groups after priority resolution
    GroupsResolved(usize),
    /// Run complete with message
    Complete(String),
    /// Error occurred
    Error(String),
}

/// Metadata for one scanned file. Paths are relative to the scan root and
/// always use `/` separators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub name: String,
    pub extension: String,
    pub size: u64,
    pub language: Option<String>,
    pub is_binary: bool,
}

impl FileRecord {
    /// Lowercased file name without the final extension.
    pub fn stem(&self) -> String {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_lowercase(),
            _ => self.name.to_lowercase(),
        }
    }

    /// Directory part of the relative path, empty for files at the root.
    pub fn parent(&self) -> &str {
        self.path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }
}

/// Metadata for one scanned directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    /// Relative path, `.` for the scan root
    pub path: String,
    /// Files directly inside this directory
    pub file_count: usize,
    /// Subdirectories directly inside this directory
    pub subdirectory_count: usize,
    /// Total size of every scanned file beneath this directory
    pub total_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageStats {
    pub files: usize,
    pub size: u64,
    pub percentage: f64,
}

/// Everything the scanner learned about the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStructure {
    pub files: Vec<FileRecord>,
    pub directories: Vec<DirectoryRecord>,
    pub languages: BTreeMap<String, LanguageStats>,
    pub main_language: String,
}

impl ProjectStructure {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn file_paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

/// Counters for everything the scanner skipped or recovered from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub files_analyzed: usize,
    pub directories: usize,
    pub skipped_oversized: usize,
    pub io_errors: usize,
    /// The walk stopped early at the file cap
    pub truncated: bool,
}

/// Result of a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub structure: ProjectStructure,
    pub stats: ScanStats,
}
