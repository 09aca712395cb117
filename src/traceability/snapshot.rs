//! Persisted form of the traceability index
//!
//! `{ "metadata": { total_mappings, created_at, statistics }, "mappings": [...] }`.
//! Reloading rebuilds both indices and re-runs the integrity check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result, ValidationError};
use crate::traceability::{FileGroupMapping, MappingStatistics, TraceabilityMapper};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub total_mappings: usize,
    pub created_at: DateTime<Utc>,
    pub statistics: MappingStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSnapshot {
    pub metadata: SnapshotMetadata,
    pub mappings: Vec<FileGroupMapping>,
}

impl TraceabilityMapper {
    pub fn snapshot(&self) -> MappingSnapshot {
        MappingSnapshot {
            metadata: SnapshotMetadata {
                total_mappings: self.len(),
                created_at: self.created_at(),
                statistics: self.statistics(None),
            },
            mappings: self.mappings().into_iter().cloned().collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    pub fn from_snapshot(snapshot: MappingSnapshot) -> Result<Self> {
        if snapshot.metadata.total_mappings != snapshot.mappings.len() {
            return Err(AnalysisError::Validation(ValidationError::IndexMismatch {
                file: "*".to_string(),
                detail: format!(
                    "snapshot declares {} mappings but holds {}",
                    snapshot.metadata.total_mappings,
                    snapshot.mappings.len()
                ),
            }));
        }
        let mut mapper = TraceabilityMapper::with_timestamp(snapshot.metadata.created_at);
        mapper.load(snapshot.mappings)?;
        Ok(mapper)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_snapshot(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::{Group, GroupKind, GroupingResult};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn mapper() -> TraceabilityMapper {
        let grouping = GroupingResult {
            groups: vec![
                Group {
                    name: "core".into(),
                    kind: GroupKind::Core,
                    files: vec!["app/main.py".into(), "app/server.py".into()],
                },
                Group {
                    name: "feature".into(),
                    kind: GroupKind::Feature,
                    files: vec!["billing/invoice.py".into()],
                },
            ],
            reasons: BTreeMap::new(),
            dropped_missing: vec![],
        };
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let mut mapper = TraceabilityMapper::with_timestamp(ts);
        mapper.build(&grouping).unwrap();
        mapper
    }

    #[test]
    fn test_reload_rebuilds_identical_indices() -> anyhow::Result<()> {
        let original = mapper();
        let json = original.to_json()?;
        let reloaded = TraceabilityMapper::from_json(&json)?;

        assert_eq!(reloaded, original);
        assert_eq!(reloaded.groups(), original.groups());
        assert_eq!(reloaded.to_json()?, json);
        Ok(())
    }

    #[test]
    fn test_snapshot_shape() -> anyhow::Result<()> {
        let value: serde_json::Value = serde_json::from_str(&mapper().to_json()?)?;

        assert_eq!(value["metadata"]["total_mappings"], 3);
        assert_eq!(value["metadata"]["created_at"], "2024-01-02T03:04:05Z");
        assert_eq!(value["metadata"]["statistics"]["group_count"], 2);
        assert_eq!(value["mappings"][0]["file_path"], "app/main.py");
        assert_eq!(value["mappings"][0]["group_type"], "core");
        Ok(())
    }

    #[test]
    fn test_corrupt_snapshots_are_rejected() -> anyhow::Result<()> {
        let mut snapshot = mapper().snapshot();
        snapshot.mappings[1].file_path = "app/main.py".into();
        assert!(matches!(
            TraceabilityMapper::from_snapshot(snapshot),
            Err(AnalysisError::Validation(ValidationError::DuplicateAssignment { .. }))
        ));

        let mut snapshot = mapper().snapshot();
        snapshot.metadata.total_mappings = 7;
        assert!(TraceabilityMapper::from_snapshot(snapshot).is_err());

        assert!(matches!(
            TraceabilityMapper::from_json("{\"mappings\": 3}"),
            Err(AnalysisError::Json(_))
        ));
        Ok(())
    }
}
