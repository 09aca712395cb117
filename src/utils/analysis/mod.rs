//! Analysis utilities for source trees
//!
//! Contains functionality detection, import extraction and resolution, and
//! the dependency graph with its cycle and importance passes.

pub mod dependencies;
pub mod functionality;
pub mod graph;
pub mod imports;
pub mod resolve;

// Re-export commonly used items
pub use dependencies::{
    DependencyAnalysisResult, DependencyEdge, DependencyGraphBuilder, DependencyStats,
};
pub use functionality::{FunctionalityDetection, FunctionalityDetector};
pub use graph::{Cycle, DependencyGraph, ImportEdge};
pub use imports::{ExtractError, ImportExtractor, extractor_for};
pub use resolve::{ModuleTable, Resolution};
