use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Directory names that are never descended into.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    // Version Control
    ".git",
    ".hg",
    ".svn",
    ".bzr",
    // IDEs
    ".idea",
    ".vscode",
    ".vs",
    // Build / Dependency
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    "vendor",
    "venv",
    ".venv",
    ".tox",
    // Caches
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    ".cache",
    ".next",
    ".turbo",
    "coverage",
];

/// File patterns excluded from every scan.
pub const DEFAULT_IGNORE_FILES: &[&str] = &[
    "*.swp",
    "*.swo",
    "*.pyc",
    "*.pyo",
    "*.class",
    "*.o",
    "*.so",
    "*.dll",
    "*.dylib",
    "*.exe",
    // Lockfiles
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.lock",
    "poetry.lock",
    // System
    ".DS_Store",
    "Thumbs.db",
    // Logs
    "*.log",
];

/// Limits and ignore rules for the directory walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Stop the walk once this many files have been collected
    pub max_files: usize,
    /// Files larger than this (in bytes) are counted as skipped
    pub max_file_size: u64,
    /// Maximum directory depth to traverse
    pub max_depth: usize,
    /// Directory names to skip at any depth, on top of [`DEFAULT_IGNORE_DIRS`]
    pub ignore_dirs: Vec<String>,
    /// Gitignore-style file patterns to skip (e.g. "*.log"), on top of
    /// [`DEFAULT_IGNORE_FILES`]
    pub ignore_files: Vec<String>,
    /// Honour `.gitignore` files found inside the tree
    pub respect_gitignore: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_files: 10_000,
            max_file_size: 1024 * 1024,
            max_depth: 20,
            ignore_dirs: Vec::new(),
            ignore_files: Vec::new(),
            respect_gitignore: true,
        }
    }
}

/// PageRank iteration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRankSettings {
    pub damping: f64,
    pub max_iterations: usize,
    /// Sum of absolute score changes below which the iteration has converged
    pub tolerance: f64,
}

impl Default for PageRankSettings {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

/// Knobs for functionality detection, dependency analysis and grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Minimum confidence (0.0 - 1.0) for a functionality to be reported
    pub functionality_threshold: f64,
    /// Minimum accumulated keyword score for a functionality to be reported
    pub score_threshold: f64,
    /// Scan file contents for keywords (path matching always runs)
    pub detect_patterns: bool,
    /// Maximum evidence files listed per functionality
    pub evidence_limit: usize,
    /// Files above this size (in bytes) are never content-scanned
    pub content_scan_limit: u64,
    /// Stop enumerating import cycles after this many
    pub max_cycles: usize,
    pub pagerank: PageRankSettings,
    /// Drop group members that no longer exist on disk
    pub verify_file_existence: bool,
    /// Worker pool size; defaults to the number of CPUs
    pub workers: Option<usize>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            functionality_threshold: 0.5,
            score_threshold: 2.0,
            detect_patterns: true,
            evidence_limit: 5,
            content_scan_limit: 1024 * 1024,
            max_cycles: 1000,
            pagerank: PageRankSettings::default(),
            verify_file_existence: false,
            workers: None,
        }
    }
}

/// Main configuration for an analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub scan: ScanConfig,
    pub analysis: AnalysisOptions,
}

impl AnalyzerConfig {
    /// Parses a TOML document handed over by the configuration loader.
    /// Missing keys fall back to their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects limits and thresholds that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        let scan = &self.scan;
        let analysis = &self.analysis;

        if scan.max_files == 0 {
            return invalid("scan.max_files must be positive");
        }
        if scan.max_file_size == 0 {
            return invalid("scan.max_file_size must be positive");
        }
        if scan.max_depth == 0 {
            return invalid("scan.max_depth must be positive");
        }
        if !(0.0..=1.0).contains(&analysis.functionality_threshold) {
            return invalid(format!(
                "analysis.functionality_threshold must be within [0, 1], got {}",
                analysis.functionality_threshold
            ));
        }
        if !analysis.score_threshold.is_finite() || analysis.score_threshold <= 0.0 {
            return invalid(format!(
                "analysis.score_threshold must be positive, got {}",
                analysis.score_threshold
            ));
        }
        if analysis.evidence_limit == 0 {
            return invalid("analysis.evidence_limit must be positive");
        }
        if analysis.content_scan_limit == 0 {
            return invalid("analysis.content_scan_limit must be positive");
        }
        if analysis.max_cycles == 0 {
            return invalid("analysis.max_cycles must be positive");
        }
        if analysis.workers == Some(0) {
            return invalid("analysis.workers must be positive when set");
        }

        let pagerank = &analysis.pagerank;
        if !(pagerank.damping > 0.0 && pagerank.damping < 1.0) {
            return invalid(format!(
                "analysis.pagerank.damping must be within (0, 1), got {}",
                pagerank.damping
            ));
        }
        if pagerank.max_iterations == 0 {
            return invalid("analysis.pagerank.max_iterations must be positive");
        }
        if !pagerank.tolerance.is_finite() || pagerank.tolerance <= 0.0 {
            return invalid("analysis.pagerank.tolerance must be positive");
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> Result<()> {
    Err(AnalysisError::Configuration(message.into()))
}
