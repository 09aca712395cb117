//! Heuristic functionality detection
//!
//! Every file is scored against a fixed table of categories. A path or file
//! name containing a category keyword adds one point per distinct keyword; a
//! whole-word, case-insensitive keyword hit in the file content adds half a
//! point. Scores accumulate over the whole tree.

use std::collections::BTreeSet;
use std::path::Path;

use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::AnalysisOptions;
use crate::core::FileRecord;

const PATH_HIT_SCORE: f64 = 1.0;
const CONTENT_HIT_SCORE: f64 = 0.5;

/// Extensions whose content is worth scanning for keywords.
const CONTENT_EXTENSIONS: &[&str] = &[
    "py", "pyw", "js", "jsx", "mjs", "cjs", "ts", "tsx", "rs", "go", "java", "kt", "rb", "php",
    "cs", "c", "h", "cpp", "hpp", "swift", "scala", "sh", "sql", "html", "vue", "svelte", "json",
    "yaml", "yml", "toml", "ini", "cfg", "md",
];

pub struct Category {
    pub name: &'static str,
    pub description: &'static str,
    pub path_keywords: &'static [&'static str],
    pub content_keywords: &'static [&'static str],
}

pub const CATEGORIES: &[Category] = &[
    Category {
        name: "authentication",
        description: "User authentication, sessions and credential handling",
        path_keywords: &["auth", "login", "session", "oauth", "jwt", "password"],
        content_keywords: &["authenticate", "login", "logout", "password", "jwt", "oauth"],
    },
    Category {
        name: "database",
        description: "Persistence layer, models, queries and migrations",
        path_keywords: &["db", "database", "model", "migration", "schema", "repository"],
        content_keywords: &["select", "insert", "cursor", "transaction", "sqlalchemy", "orm"],
    },
    Category {
        name: "api",
        description: "HTTP endpoints, routing and request handling",
        path_keywords: &["api", "route", "endpoint", "controller", "handler"],
        content_keywords: &["endpoint", "router", "request", "response", "http"],
    },
    Category {
        name: "testing",
        description: "Automated tests, fixtures and mocks",
        path_keywords: &["test", "spec", "fixture", "mock"],
        content_keywords: &["assert", "pytest", "unittest", "describe", "expect"],
    },
    Category {
        name: "configuration",
        description: "Settings, environment and configuration loading",
        path_keywords: &["config", "settings", "env"],
        content_keywords: &["config", "settings", "environ", "dotenv"],
    },
    Category {
        name: "logging",
        description: "Logging and diagnostics output",
        path_keywords: &["log", "logger", "logging"],
        content_keywords: &["logger", "logging", "tracing"],
    },
    Category {
        name: "caching",
        description: "Caches, memoization and key-value stores",
        path_keywords: &["cache", "redis", "memo"],
        content_keywords: &["cache", "redis", "memcached", "ttl", "lru"],
    },
    Category {
        name: "cli",
        description: "Command-line entry points and argument parsing",
        path_keywords: &["cli", "cmd", "command", "console"],
        content_keywords: &["argparse", "click", "argv", "clap", "commander"],
    },
    Category {
        name: "ui",
        description: "User interface components, views and templates",
        path_keywords: &["component", "view", "page", "template", "widget"],
        content_keywords: &["render", "react", "component", "template", "onclick"],
    },
    Category {
        name: "data_processing",
        description: "Parsing, transformation and data pipelines",
        path_keywords: &["etl", "pipeline", "parser", "transform"],
        content_keywords: &["parse", "transform", "serialize", "dataframe", "pandas"],
    },
];

lazy_static! {
    // One whole-word, case-insensitive pattern per content keyword, indexed like CATEGORIES.
    static ref CONTENT_PATTERNS: Vec<Vec<Regex>> = CATEGORIES
        .iter()
        .map(|category| {
            category
                .content_keywords
                .iter()
                .map(|keyword| {
                    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(keyword))).unwrap()
                })
                .collect()
        })
        .collect();
}

/// A detected capability area of the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionalityDetection {
    pub name: String,
    pub confidence: f64,
    pub description: String,
    pub score: f64,
    pub evidence_files: Vec<String>,
    pub matched_patterns: Vec<String>,
}

/// Hits of one file against one category.
#[derive(Debug, Default, Clone)]
struct CategoryHits {
    score: f64,
    patterns: BTreeSet<&'static str>,
}

pub struct FunctionalityDetector {
    functionality_threshold: f64,
    score_threshold: f64,
    detect_patterns: bool,
    evidence_limit: usize,
    content_scan_limit: u64,
}

impl FunctionalityDetector {
    pub fn new(options: &AnalysisOptions) -> Self {
        Self {
            functionality_threshold: options.functionality_threshold,
            score_threshold: options.score_threshold,
            detect_patterns: options.detect_patterns,
            evidence_limit: options.evidence_limit,
            content_scan_limit: options.content_scan_limit,
        }
    }

    /// Scores `files` (relative to `root`) and returns every category that
    /// clears both thresholds, most confident first.
    pub fn detect(&self, root: &Path, files: &[FileRecord]) -> Vec<FunctionalityDetection> {
        let per_file: Vec<Vec<CategoryHits>> =
            files.par_iter().map(|file| self.score_file(root, file)).collect();

        let mut detections = Vec::new();
        for (index, category) in CATEGORIES.iter().enumerate() {
            let mut total = 0.0;
            let mut patterns = BTreeSet::new();
            let mut contributors: Vec<(&str, f64)> = Vec::new();

            for (file, hits) in files.iter().zip(&per_file) {
                let hits = &hits[index];
                if hits.score > 0.0 {
                    total += hits.score;
                    patterns.extend(hits.patterns.iter().copied());
                    contributors.push((file.path.as_str(), hits.score));
                }
            }

            if total < self.score_threshold {
                continue;
            }
            let confidence = (total / (2.0 * self.score_threshold)).min(1.0);
            if confidence < self.functionality_threshold {
                continue;
            }

            contributors.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.cmp(b.0))
            });

            detections.push(FunctionalityDetection {
                name: category.name.to_string(),
                confidence,
                description: category.description.to_string(),
                score: total,
                evidence_files: contributors
                    .iter()
                    .take(self.evidence_limit)
                    .map(|(path, _)| path.to_string())
                    .collect(),
                matched_patterns: patterns.into_iter().map(String::from).collect(),
            });
        }

        detections.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });

        tracing::info!(detected = detections.len(), "functionality detection complete");
        detections
    }

    fn score_file(&self, root: &Path, file: &FileRecord) -> Vec<CategoryHits> {
        let path_lower = file.path.to_lowercase();
        let content = if self.detect_patterns && self.is_scannable(file) {
            read_content(root, file)
        } else {
            None
        };

        CATEGORIES
            .iter()
            .zip(CONTENT_PATTERNS.iter())
            .map(|(category, patterns)| {
                let mut hits = CategoryHits::default();
                for keyword in category.path_keywords {
                    if path_lower.contains(*keyword) {
                        hits.score += PATH_HIT_SCORE;
                        hits.patterns.insert(*keyword);
                    }
                }
                if let Some(content) = &content {
                    for (keyword, pattern) in category.content_keywords.iter().zip(patterns) {
                        if pattern.is_match(content) {
                            hits.score += CONTENT_HIT_SCORE;
                            hits.patterns.insert(*keyword);
                        }
                    }
                }
                hits
            })
            .collect()
    }

    fn is_scannable(&self, file: &FileRecord) -> bool {
        !file.is_binary
            && file.size <= self.content_scan_limit
            && CONTENT_EXTENSIONS.contains(&file.extension.as_str())
    }
}

/// Unreadable or non-UTF-8 content counts as a miss.
fn read_content(root: &Path, file: &FileRecord) -> Option<String> {
    match std::fs::read_to_string(root.join(&file.path)) {
        Ok(content) => Some(content),
        Err(err) => {
            tracing::debug!(path = %file.path, error = %err, "content scan skipped");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn record(path: &str, size: u64) -> FileRecord {
        let name = path.rsplit('/').next().unwrap().to_string();
        let extension = name.rsplit_once('.').map(|(_, e)| e.to_string()).unwrap_or_default();
        FileRecord {
            path: path.to_string(),
            name,
            extension,
            size,
            language: None,
            is_binary: false,
        }
    }

    fn write(root: &Path, path: &str, content: &str) -> FileRecord {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full, content).unwrap();
        record(path, content.len() as u64)
    }

    #[test]
    fn test_path_keywords_accumulate() {
        let temp = TempDir::new().unwrap();
        let files = vec![
            write(temp.path(), "auth/login.py", ""),
            write(temp.path(), "auth/session.py", ""),
        ];
        let detector = FunctionalityDetector::new(&AnalysisOptions::default());
        let detections = detector.detect(temp.path(), &files);

        let auth = detections.iter().find(|d| d.name == "authentication").unwrap();
        // auth + login, auth + session
        assert_eq!(auth.score, 4.0);
        assert_eq!(auth.confidence, 1.0);
        assert_eq!(auth.matched_patterns, vec!["auth", "login", "session"]);
        assert_eq!(auth.evidence_files.len(), 2);
    }

    #[test]
    fn test_content_keywords_are_whole_word() {
        let temp = TempDir::new().unwrap();
        let files = vec![
            write(temp.path(), "a.py", "import redis\ncache = {}\nTTL = 30\n# LRU eviction\n"),
            write(temp.path(), "b.py", "cachedValue = 1\nredistribute()\n"),
        ];
        let detector = FunctionalityDetector::new(&AnalysisOptions::default());
        let detections = detector.detect(temp.path(), &files);

        let caching = detections.iter().find(|d| d.name == "caching").unwrap();
        // cache, redis, ttl and lru from a.py only
        assert_eq!(caching.score, 2.0);
        assert_eq!(caching.evidence_files, vec!["a.py"]);
    }

    #[test]
    fn test_below_threshold_is_not_reported() {
        let temp = TempDir::new().unwrap();
        let files = vec![write(temp.path(), "cli.py", "")];
        let detector = FunctionalityDetector::new(&AnalysisOptions::default());
        assert!(detector
            .detect(temp.path(), &files)
            .iter()
            .all(|d| d.name != "cli"));
    }

    #[test]
    fn test_content_scan_can_be_disabled() {
        let temp = TempDir::new().unwrap();
        let files = vec![write(
            temp.path(),
            "x.py",
            "authenticate login logout password jwt oauth",
        )];
        let options = AnalysisOptions {
            detect_patterns: false,
            ..AnalysisOptions::default()
        };
        let detections = FunctionalityDetector::new(&options).detect(temp.path(), &files);
        assert!(detections.is_empty());

        let detections =
            FunctionalityDetector::new(&AnalysisOptions::default()).detect(temp.path(), &files);
        assert_eq!(detections[0].name, "authentication");
        assert_eq!(detections[0].score, 3.0);
    }

    #[test]
    fn test_evidence_is_capped() {
        let temp = TempDir::new().unwrap();
        let files: Vec<_> = (0..8)
            .map(|i| write(temp.path(), &format!("api/route_{}.py", i), ""))
            .collect();
        let options = AnalysisOptions {
            evidence_limit: 3,
            ..AnalysisOptions::default()
        };
        let detections = FunctionalityDetector::new(&options).detect(temp.path(), &files);
        let api = detections.iter().find(|d| d.name == "api").unwrap();

        assert_eq!(api.evidence_files.len(), 3);
        assert_eq!(api.evidence_files[0], "api/route_0.py");
        assert_eq!(api.score, 16.0);
    }

    #[test]
    fn test_missing_file_is_a_content_miss() {
        let temp = TempDir::new().unwrap();
        let files = vec![record("auth/ghost.py", 10), record("auth/token.py", 10)];
        let detections =
            FunctionalityDetector::new(&AnalysisOptions::default()).detect(temp.path(), &files);
        let auth = detections.iter().find(|d| d.name == "authentication").unwrap();
        assert_eq!(auth.score, 2.0);
        assert_eq!(auth.confidence, 0.5);
    }
}
