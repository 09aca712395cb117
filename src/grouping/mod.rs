//! Conflict-free grouping of files by structural role
//!
//! [`GroupAssigner`] produces a possibly overlapping classification;
//! [`PriorityResolver`] settles every file into exactly one group.

pub mod assigner;
pub mod resolver;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use assigner::GroupAssigner;
pub use resolver::PriorityResolver;

/// Group buckets. Ordering follows [`GroupKind::rank`], highest priority
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    CircularDependency,
    Core,
    Feature,
    Utility,
    Test,
    Configuration,
}

impl GroupKind {
    pub const ALL: [GroupKind; 6] = [
        GroupKind::CircularDependency,
        GroupKind::Core,
        GroupKind::Feature,
        GroupKind::Utility,
        GroupKind::Test,
        GroupKind::Configuration,
    ];

    /// Resolution priority; 0 is the highest.
    pub fn rank(self) -> usize {
        match self {
            GroupKind::CircularDependency => 0,
            GroupKind::Core => 1,
            GroupKind::Feature => 2,
            GroupKind::Utility => 3,
            GroupKind::Test => 4,
            GroupKind::Configuration => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GroupKind::CircularDependency => "circular_dependency",
            GroupKind::Core => "core",
            GroupKind::Feature => "feature",
            GroupKind::Utility => "utility",
            GroupKind::Test => "test",
            GroupKind::Configuration => "configuration",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl Ord for GroupKind {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for GroupKind {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for GroupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candidate membership before priority resolution. A file may sit in
/// several buckets; each membership carries the rule that produced it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawGroups {
    buckets: BTreeMap<GroupKind, BTreeMap<String, String>>,
}

impl RawGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first reason recorded for a (kind, path) pair.
    pub fn insert(&mut self, kind: GroupKind, path: &str, reason: impl Into<String>) {
        self.buckets
            .entry(kind)
            .or_default()
            .entry(path.to_string())
            .or_insert_with(|| reason.into());
    }

    pub fn members(&self, kind: GroupKind) -> Option<&BTreeMap<String, String>> {
        self.buckets.get(&kind)
    }

    /// Non-empty buckets, highest priority first.
    pub fn by_priority(&self) -> impl Iterator<Item = (GroupKind, &BTreeMap<String, String>)> {
        self.buckets.iter().map(|(kind, members)| (*kind, members))
    }

    pub fn contains(&self, kind: GroupKind, path: &str) -> bool {
        self.buckets
            .get(&kind)
            .is_some_and(|members| members.contains_key(path))
    }
}

/// A final group. `files` is sorted and never empty once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub kind: GroupKind,
    pub files: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingResult {
    /// Ordered by priority
    pub groups: Vec<Group>,
    /// Why each file landed in its group
    pub reasons: BTreeMap<String, String>,
    /// Members removed because they no longer exist on disk
    pub dropped_missing: Vec<String>,
}

impl GroupingResult {
    pub fn groups_map(&self) -> BTreeMap<String, Vec<String>> {
        self.groups
            .iter()
            .map(|g| (g.name.clone(), g.files.clone()))
            .collect()
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn file_count(&self) -> usize {
        self.groups.iter().map(|g| g.files.len()).sum()
    }
}

/// No group is empty and no file belongs to two groups.
pub fn validate_groups(groups: &[Group]) -> Result<(), ValidationError> {
    let mut owner: HashMap<&str, &str> = HashMap::new();
    for group in groups {
        if group.files.is_empty() {
            return Err(ValidationError::EmptyGroup {
                group: group.name.clone(),
            });
        }
        for file in &group.files {
            if let Some(first) = owner.insert(file.as_str(), group.name.as_str()) {
                return Err(ValidationError::DuplicateAssignment {
                    file: file.clone(),
                    first: first.to_string(),
                    second: group.name.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(kind: GroupKind, files: &[&str]) -> Group {
        Group {
            name: kind.as_str().to_string(),
            kind,
            files: files.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn test_priority_is_a_total_order() {
        let mut shuffled = vec![
            GroupKind::Test,
            GroupKind::Core,
            GroupKind::Configuration,
            GroupKind::CircularDependency,
            GroupKind::Utility,
            GroupKind::Feature,
        ];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![
                GroupKind::CircularDependency,
                GroupKind::Core,
                GroupKind::Feature,
                GroupKind::Utility,
                GroupKind::Test,
                GroupKind::Configuration,
            ]
        );

        for pair in shuffled.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
        for kind in GroupKind::ALL {
            assert_eq!(GroupKind::from_name(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_validate_groups() {
        assert!(validate_groups(&[group(GroupKind::Core, &["main.py"])]).is_ok());

        assert_eq!(
            validate_groups(&[group(GroupKind::Test, &[])]),
            Err(ValidationError::EmptyGroup {
                group: "test".into()
            })
        );

        assert_eq!(
            validate_groups(&[
                group(GroupKind::Core, &["main.py"]),
                group(GroupKind::Utility, &["main.py", "utils.py"]),
            ]),
            Err(ValidationError::DuplicateAssignment {
                file: "main.py".into(),
                first: "core".into(),
                second: "utility".into(),
            })
        );
    }

    #[test]
    fn test_raw_groups_keep_first_reason() {
        let mut raw = RawGroups::new();
        raw.insert(GroupKind::Core, "main.py", "entry point");
        raw.insert(GroupKind::Core, "main.py", "later rule");
        raw.insert(GroupKind::Utility, "main.py", "shared helper");

        assert!(raw.contains(GroupKind::Core, "main.py"));
        assert!(raw.contains(GroupKind::Utility, "main.py"));
        assert_eq!(raw.members(GroupKind::Core).unwrap()["main.py"], "entry point");
        assert!(raw.members(GroupKind::Test).is_none());
    }

    #[test]
    fn test_buckets_iterate_by_rank() {
        let mut raw = RawGroups::new();
        raw.insert(GroupKind::Configuration, "setup.cfg", "config file");
        raw.insert(GroupKind::Test, "test_app.py", "test naming");
        raw.insert(GroupKind::Core, "main.py", "entry point");

        let kinds: Vec<GroupKind> = raw.by_priority().map(|(kind, _)| kind).collect();
        assert_eq!(
            kinds,
            vec![GroupKind::Core, GroupKind::Test, GroupKind::Configuration]
        );
    }
}
