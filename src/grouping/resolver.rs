use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::config::AnalysisOptions;
use crate::error::ValidationError;
use crate::grouping::{Group, GroupingResult, RawGroups, validate_groups};

/// Settles overlapping candidate groups into disjoint, non-empty groups.
///
/// Buckets are visited in [`crate::grouping::GroupKind::rank`] order; each takes only the
/// files no higher bucket has claimed.
#[derive(Debug, Clone)]
pub struct PriorityResolver {
    verify_file_existence: bool,
}

impl PriorityResolver {
    pub fn new(options: &AnalysisOptions) -> Self {
        Self {
            verify_file_existence: options.verify_file_existence,
        }
    }

    pub fn resolve(&self, root: &Path, raw: &RawGroups) -> Result<GroupingResult, ValidationError> {
        let mut claimed: BTreeSet<&str> = BTreeSet::new();
        let mut reasons: BTreeMap<String, String> = BTreeMap::new();
        let mut dropped_missing = Vec::new();
        let mut groups = Vec::new();

        for (kind, members) in raw.by_priority() {
            let mut files = Vec::new();
            for (path, reason) in members {
                if !claimed.insert(path.as_str()) {
                    tracing::debug!(
                        path = %path,
                        group = kind.as_str(),
                        "already claimed by a higher-priority group"
                    );
                    continue;
                }
                if self.verify_file_existence && !root.join(path).exists() {
                    tracing::debug!(path = %path, "dropping missing file");
                    dropped_missing.push(path.clone());
                    continue;
                }
                reasons.insert(path.clone(), reason.clone());
                files.push(path.clone());
            }

            // Emptiness is judged after the existence filter.
            if files.is_empty() {
                continue;
            }
            groups.push(Group {
                name: kind.as_str().to_string(),
                kind,
                files,
            });
        }

        validate_groups(&groups)?;

        tracing::info!(
            groups = groups.len(),
            files = reasons.len(),
            dropped = dropped_missing.len(),
            "groups resolved"
        );

        Ok(GroupingResult {
            groups,
            reasons,
            dropped_missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::GroupKind;
    use std::fs;
    use tempfile::TempDir;

    fn resolver(verify: bool) -> PriorityResolver {
        PriorityResolver::new(&AnalysisOptions {
            verify_file_existence: verify,
            ..AnalysisOptions::default()
        })
    }

    #[test]
    fn test_core_beats_utility() {
        let mut raw = RawGroups::new();
        raw.insert(GroupKind::Core, "main.py", "name contains 'main'");
        raw.insert(GroupKind::Utility, "main.py", "utility naming");
        raw.insert(GroupKind::Utility, "utils.py", "utility naming");

        let result = resolver(false).resolve(Path::new("."), &raw).unwrap();
        let groups = result.groups_map();

        assert_eq!(groups["core"], vec!["main.py"]);
        assert_eq!(groups["utility"], vec!["utils.py"]);
        assert_eq!(result.reasons["main.py"], "name contains 'main'");
    }

    #[test]
    fn test_rank_decides_regardless_of_insertion_order() {
        let mut raw = RawGroups::new();
        raw.insert(GroupKind::Configuration, "tests/conftest.py", "config stem");
        raw.insert(GroupKind::Test, "tests/conftest.py", "pytest fixture file");

        let result = resolver(false).resolve(Path::new("."), &raw).unwrap();

        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].kind, GroupKind::Test);
        assert_eq!(result.reasons["tests/conftest.py"], "pytest fixture file");
    }

    #[test]
    fn test_drained_buckets_are_dropped() {
        let mut raw = RawGroups::new();
        raw.insert(GroupKind::CircularDependency, "a.py", "cycle");
        raw.insert(GroupKind::CircularDependency, "b.py", "cycle");
        raw.insert(GroupKind::Feature, "a.py", "default");
        raw.insert(GroupKind::Test, "b.py", "test naming");

        let result = resolver(false).resolve(Path::new("."), &raw).unwrap();

        let names: Vec<&str> = result.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["circular_dependency"]);
        assert_eq!(result.file_count(), 2);
    }

    #[test]
    fn test_existence_filter_reevaluates_emptiness() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        fs::write(temp.path().join("kept.py"), "")?;

        let mut raw = RawGroups::new();
        raw.insert(GroupKind::Feature, "kept.py", "default");
        raw.insert(GroupKind::Test, "test_gone.py", "test naming");

        let result = resolver(true).resolve(temp.path(), &raw)?;

        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].kind, GroupKind::Feature);
        assert_eq!(result.dropped_missing, vec!["test_gone.py"]);
        assert!(!result.reasons.contains_key("test_gone.py"));

        let unchecked = resolver(false).resolve(temp.path(), &raw)?;
        assert_eq!(unchecked.groups.len(), 2);
        Ok(())
    }

    #[test]
    fn test_empty_input() {
        let result = resolver(false)
            .resolve(Path::new("."), &RawGroups::new())
            .unwrap();
        assert!(result.groups.is_empty());
    }
}
