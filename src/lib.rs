pub mod config;
pub mod core;
pub mod error;
pub mod fs;
pub mod grouping;
pub mod runner;
pub mod traceability;
pub mod utils;

// Re-export key items for convenience
pub use config::{AnalysisOptions, AnalyzerConfig, PageRankSettings, ScanConfig};
pub use core::{FileRecord, ProjectStructure, ScanEvent, ScanResult, Scanner};
pub use error::{AnalysisError, Result, ValidationError};
pub use grouping::{Group, GroupKind, GroupingResult};
pub use runner::{AnalysisReport, Analyzer};
pub use traceability::{FileGroupMapping, TraceabilityMapper};
pub use utils::analysis::{DependencyAnalysisResult, DependencyGraphBuilder};
