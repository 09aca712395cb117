//! Heuristic role classification
//!
//! Rules are tried in order and the first match decides a file's role
//! bucket: test, configuration, core, utility, otherwise feature. Files on an
//! import cycle are additionally placed in the circular-dependency bucket,
//! which is what makes the classification overlap.

use std::collections::BTreeSet;

use crate::core::FileRecord;
use crate::grouping::{GroupKind, RawGroups};

const TEST_DIRS: &[&str] = &["tests", "test", "__tests__", "spec", "specs", "testing"];

const CONFIG_DIRS: &[&str] = &["config", "configs", "conf", "settings", ".github"];
const CONFIG_STEMS: &[&str] = &["config", "configuration", "settings", "conf"];
const CONFIG_FILES: &[&str] = &[
    "setup.py",
    "setup.cfg",
    "pyproject.toml",
    "requirements.txt",
    "tox.ini",
    "package.json",
    "tsconfig.json",
    "cargo.toml",
    "go.mod",
    "makefile",
    "dockerfile",
    "docker-compose.yml",
    "docker-compose.yaml",
    ".editorconfig",
];
const CONFIG_EXTENSIONS: &[&str] = &["ini", "cfg", "toml", "yaml", "yml", "env", "conf"];

const CORE_DIRS: &[&str] = &["core"];
const CORE_STEMS: &[&str] = &["app", "index", "server", "__main__", "lib", "core", "application"];

const UTILITY_DIRS: &[&str] = &["utils", "util", "helpers", "common", "shared", "tools"];
const UTILITY_KEYWORDS: &[&str] = &["util", "helper", "common", "shared", "tool"];

/// Rule-based role classifier.
#[derive(Debug, Default, Clone)]
pub struct GroupAssigner;

impl GroupAssigner {
    pub fn new() -> Self {
        Self
    }

    /// Classifies every file; `cycle_members` also land in the
    /// circular-dependency bucket.
    pub fn classify(&self, files: &[FileRecord], cycle_members: &BTreeSet<String>) -> RawGroups {
        let mut raw = RawGroups::new();
        for file in files {
            let (kind, reason) = classify_file(file);
            raw.insert(kind, &file.path, reason);
            if cycle_members.contains(&file.path) {
                raw.insert(
                    GroupKind::CircularDependency,
                    &file.path,
                    "participates in an import cycle",
                );
            }
        }
        raw
    }
}

/// First matching rule wins.
pub fn classify_file(file: &FileRecord) -> (GroupKind, &'static str) {
    let name = file.name.to_lowercase();
    let stem = file.stem();
    let parent = file.parent().to_lowercase();
    let dirs: Vec<&str> = parent.split('/').filter(|d| !d.is_empty()).collect();
    let in_dir = |set: &[&str]| dirs.iter().any(|d| set.contains(d));

    if is_test_name(&name, &stem) {
        return (GroupKind::Test, "test file naming");
    }
    if in_dir(TEST_DIRS) {
        return (GroupKind::Test, "inside a test directory");
    }

    if CONFIG_FILES.contains(&name.as_str())
        || name.starts_with(".env")
        || CONFIG_STEMS.contains(&stem.as_str())
        || stem.starts_with("config")
        || stem.ends_with("_config")
        || stem.ends_with("_settings")
        || CONFIG_EXTENSIONS.contains(&file.extension.as_str())
    {
        return (GroupKind::Configuration, "configuration file naming");
    }
    if in_dir(CONFIG_DIRS) {
        return (GroupKind::Configuration, "inside a configuration directory");
    }

    if name.contains("main") {
        return (GroupKind::Core, "name contains 'main'");
    }
    if CORE_STEMS.contains(&stem.as_str()) {
        return (GroupKind::Core, "entry point name");
    }
    if in_dir(CORE_DIRS) {
        return (GroupKind::Core, "inside a core directory");
    }

    if UTILITY_KEYWORDS.iter().any(|k| stem.contains(k)) {
        return (GroupKind::Utility, "utility naming");
    }
    if in_dir(UTILITY_DIRS) {
        return (GroupKind::Utility, "inside a utility directory");
    }

    (GroupKind::Feature, "no structural rule matched")
}

fn is_test_name(name: &str, stem: &str) -> bool {
    stem == "test"
        || stem == "conftest"
        || stem == "tests"
        || name.starts_with("test_")
        || stem.ends_with("_test")
        || stem.ends_with("_tests")
        || name.contains(".test.")
        || name.contains(".spec.")
}
