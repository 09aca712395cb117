use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::grouping::{GroupKind, GroupingResult};

/// Provenance of one file's group assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileGroupMapping {
    pub file_path: String,
    pub group_name: String,
    pub group_type: GroupKind,
    pub confidence: f64,
    pub assignment_reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSize {
    pub group: String,
    pub files: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingStatistics {
    pub total_mappings: usize,
    pub unique_files: usize,
    pub group_count: usize,
    pub average_group_size: f64,
    pub largest_group: Option<GroupSize>,
    pub smallest_group: Option<GroupSize>,
    /// Files per group type
    pub group_type_distribution: BTreeMap<GroupKind, usize>,
    /// Files from the supplied file list that have no mapping
    pub orphaned_files: Vec<String>,
}

/// How much a heuristic placement in each group is trusted.
pub fn kind_confidence(kind: GroupKind) -> f64 {
    match kind {
        GroupKind::CircularDependency => 0.9,
        GroupKind::Core => 0.9,
        GroupKind::Feature => 0.6,
        GroupKind::Utility => 0.85,
        GroupKind::Test => 0.95,
        GroupKind::Configuration => 0.9,
    }
}

/// Bidirectional file <-> group index.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceabilityMapper {
    forward: BTreeMap<String, FileGroupMapping>,
    reverse: BTreeMap<String, Vec<String>>,
    created_at: DateTime<Utc>,
}

impl Default for TraceabilityMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceabilityMapper {
    pub fn new() -> Self {
        Self::with_timestamp(Utc::now())
    }

    /// Every mapping built by this mapper carries `timestamp`.
    pub fn with_timestamp(timestamp: DateTime<Utc>) -> Self {
        Self {
            forward: BTreeMap::new(),
            reverse: BTreeMap::new(),
            created_at: timestamp,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Replaces both indices with the assignments in `grouping`.
    pub fn build(&mut self, grouping: &GroupingResult) -> Result<(), ValidationError> {
        let mappings = grouping.groups.iter().flat_map(|group| {
            group.files.iter().map(|file| FileGroupMapping {
                file_path: file.clone(),
                group_name: group.name.clone(),
                group_type: group.kind,
                confidence: kind_confidence(group.kind),
                assignment_reason: grouping
                    .reasons
                    .get(file)
                    .cloned()
                    .unwrap_or_else(|| format!("assigned to {}", group.kind)),
                timestamp: self.created_at,
            })
        });
        let mappings: Vec<FileGroupMapping> = mappings.collect();

        self.load(mappings)?;
        tracing::debug!(
            mappings = self.forward.len(),
            groups = self.reverse.len(),
            "traceability index built"
        );
        Ok(())
    }

    /// Rebuilds both indices from a flat mapping list. On error the mapper
    /// keeps its previous contents.
    pub(crate) fn load(
        &mut self,
        mappings: Vec<FileGroupMapping>,
    ) -> Result<(), ValidationError> {
        let mut forward: BTreeMap<String, FileGroupMapping> = BTreeMap::new();
        let mut reverse: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for mapping in mappings {
            if let Some(previous) = forward.get(&mapping.file_path) {
                return Err(ValidationError::DuplicateAssignment {
                    file: mapping.file_path.clone(),
                    first: previous.group_name.clone(),
                    second: mapping.group_name,
                });
            }
            reverse
                .entry(mapping.group_name.clone())
                .or_default()
                .push(mapping.file_path.clone());
            forward.insert(mapping.file_path.clone(), mapping);
        }
        for files in reverse.values_mut() {
            files.sort();
        }

        let candidate = Self {
            forward,
            reverse,
            created_at: self.created_at,
        };
        candidate.validate_integrity()?;
        *self = candidate;
        Ok(())
    }

    /// Cross-checks that the forward and reverse indices describe the same
    /// assignment.
    pub fn validate_integrity(&self) -> Result<(), ValidationError> {
        for (file, mapping) in &self.forward {
            if mapping.file_path != *file {
                return Err(mismatch(file, "forward key differs from mapping path"));
            }
            let listed = self
                .reverse
                .get(&mapping.group_name)
                .is_some_and(|files| files.binary_search(file).is_ok());
            if !listed {
                return Err(mismatch(
                    file,
                    &format!("missing from reverse index of `{}`", mapping.group_name),
                ));
            }
        }

        let mut reverse_total = 0;
        for (group, files) in &self.reverse {
            if files.is_empty() {
                return Err(ValidationError::EmptyGroup {
                    group: group.clone(),
                });
            }
            let unique: BTreeSet<&String> = files.iter().collect();
            if unique.len() != files.len() {
                return Err(mismatch(group, "reverse index lists a file twice"));
            }
            for file in files {
                match self.forward.get(file) {
                    Some(mapping) if mapping.group_name == *group => {}
                    Some(mapping) => {
                        return Err(mismatch(
                            file,
                            &format!(
                                "reverse index says `{}`, forward says `{}`",
                                group, mapping.group_name
                            ),
                        ));
                    }
                    None => return Err(mismatch(file, "missing from forward index")),
                }
            }
            reverse_total += files.len();
        }

        if reverse_total != self.forward.len() {
            return Err(mismatch("*", "index sizes differ"));
        }
        Ok(())
    }

    pub fn group_for_file(&self, file: &str) -> Option<&FileGroupMapping> {
        self.forward.get(file)
    }

    pub fn files_in_group(&self, group: &str) -> &[String] {
        self.reverse.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All mappings, ordered by file path.
    pub fn mappings(&self) -> Vec<&FileGroupMapping> {
        self.forward.values().collect()
    }

    pub fn groups(&self) -> &BTreeMap<String, Vec<String>> {
        &self.reverse
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Aggregate figures; `all_files`, when given, is checked for files
    /// without a mapping.
    pub fn statistics(&self, all_files: Option<&[String]>) -> MappingStatistics {
        let group_count = self.reverse.len();
        let sizes = || {
            self.reverse.iter().map(|(group, files)| GroupSize {
                group: group.clone(),
                files: files.len(),
            })
        };

        // Ties go to the alphabetically first group.
        let largest_group = sizes().fold(None::<GroupSize>, |best, g| match best {
            Some(b) if b.files >= g.files => Some(b),
            _ => Some(g),
        });
        let smallest_group = sizes().fold(None::<GroupSize>, |best, g| match best {
            Some(b) if b.files <= g.files => Some(b),
            _ => Some(g),
        });

        let mut group_type_distribution = BTreeMap::new();
        for mapping in self.forward.values() {
            *group_type_distribution.entry(mapping.group_type).or_insert(0) += 1;
        }

        let orphaned_files: Vec<String> = all_files
            .map(|files| {
                let orphans: BTreeSet<&String> = files
                    .iter()
                    .filter(|f| !self.forward.contains_key(f.as_str()))
                    .collect();
                orphans.into_iter().cloned().collect()
            })
            .unwrap_or_default();

        MappingStatistics {
            total_mappings: self.forward.len(),
            unique_files: self.forward.len(),
            group_count,
            average_group_size: if group_count == 0 {
                0.0
            } else {
                self.forward.len() as f64 / group_count as f64
            },
            largest_group,
            smallest_group,
            group_type_distribution,
            orphaned_files,
        }
    }

    #[cfg(test)]
    pub(crate) fn reverse_mut(&mut self) -> &mut BTreeMap<String, Vec<String>> {
        &mut self.reverse
    }
}

fn mismatch(file: &str, detail: &str) -> ValidationError {
    ValidationError::IndexMismatch {
        file: file.to_string(),
        detail: detail.to_string(),
    }
}
