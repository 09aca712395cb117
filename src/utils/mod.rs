//! Utility modules for the strata analyzer
//!
//! Organized into logical groups:
//! - `analysis/` - Code intelligence (functionality, imports, graph)
//! - flat modules - Walk support (ignore rules, binary sniff, languages)

// Grouped submodules
pub mod analysis;

// Remaining flat modules
pub mod binary;
pub mod ignore_rules;
pub mod language;

// Analysis re-exports
pub use analysis::dependencies;
pub use analysis::functionality;
pub use analysis::graph;
