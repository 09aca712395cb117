//! Bidirectional file <-> group traceability

pub mod mapper;
pub mod snapshot;

pub use mapper::{FileGroupMapping, GroupSize, MappingStatistics, TraceabilityMapper};
pub use snapshot::{MappingSnapshot, SnapshotMetadata};
