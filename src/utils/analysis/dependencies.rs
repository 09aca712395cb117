//! Import-dependency graph construction
//!
//! Extraction runs on the worker pool and streams `(path, outcome)` pairs to
//! a single consumer, which owns the [`DependencyGraph`] and applies every
//! mutation in path order.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Read;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{AnalysisOptions, PageRankSettings};
use crate::core::FileRecord;
use crate::utils::analysis::graph::{Cycle, DependencyGraph, ImportEdge};
use crate::utils::analysis::imports::{ExtractError, extractor_for};
use crate::utils::analysis::resolve::{ModuleTable, Resolution};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    pub confidence: f64,
    pub resolution: Resolution,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyStats {
    /// Files whose source did not parse; they stay in the graph without edges
    pub parse_errors: usize,
    pub io_errors: usize,
    /// Syntax-tree sources above the content scan limit, left without edges
    pub oversized_sources: usize,
    pub unresolved_imports: usize,
    pub fuzzy_edges: usize,
    pub cycles_truncated: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyAnalysisResult {
    pub edges: Vec<DependencyEdge>,
    pub cycles: Vec<Cycle>,
    pub importance: BTreeMap<String, f64>,
    pub stats: DependencyStats,
}

impl DependencyAnalysisResult {
    /// Every file that takes part in at least one cycle.
    pub fn cycle_members(&self) -> BTreeSet<String> {
        self.cycles.iter().flatten().cloned().collect()
    }
}

enum Extraction {
    Imports(Vec<String>),
    Skipped,
    Oversized,
    ParseFailed(ExtractError),
    Unreadable(std::io::Error),
}

pub struct DependencyGraphBuilder {
    max_cycles: usize,
    content_scan_limit: u64,
    pagerank: PageRankSettings,
}

impl DependencyGraphBuilder {
    pub fn new(options: &AnalysisOptions) -> Self {
        Self {
            max_cycles: options.max_cycles,
            content_scan_limit: options.content_scan_limit,
            pagerank: options.pagerank.clone(),
        }
    }

    /// Builds the graph for `files`, then enumerates cycles and ranks files.
    pub fn build(&self, root: &Path, files: &[FileRecord]) -> DependencyAnalysisResult {
        let (graph, mut stats) = self.build_graph(root, files);

        let search = graph.find_cycles(self.max_cycles);
        stats.cycles_truncated = search.truncated;
        if search.truncated {
            tracing::warn!(limit = self.max_cycles, "cycle enumeration capped");
        }

        let importance = graph.importance(&self.pagerank);
        let edges = graph
            .edges()
            .into_iter()
            .map(|(from, to, edge)| DependencyEdge {
                from,
                to,
                confidence: edge.confidence,
                resolution: edge.resolution,
            })
            .collect();

        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            cycles = search.cycles.len(),
            parse_errors = stats.parse_errors,
            unresolved = stats.unresolved_imports,
            "dependency graph built"
        );

        DependencyAnalysisResult {
            edges,
            cycles: search.cycles,
            importance,
            stats,
        }
    }

    /// Every file becomes a node, imported or not.
    pub fn build_graph(
        &self,
        root: &Path,
        files: &[FileRecord],
    ) -> (DependencyGraph, DependencyStats) {
        let table = ModuleTable::new(files.iter().map(|f| f.path.as_str()));
        let (tx, rx) = crossbeam_channel::unbounded::<(String, Extraction)>();
        // The consumer logs to whatever subscriber this call runs under.
        let dispatch = tracing::dispatcher::get_default(|d| d.clone());

        std::thread::scope(|s| {
            let consumer = s.spawn(|| {
                tracing::dispatcher::with_default(&dispatch, || {
                    let mut outcomes: Vec<(String, Extraction)> = rx.iter().collect();
                    outcomes.sort_by(|a, b| a.0.cmp(&b.0));
                    apply_outcomes(files, outcomes, &table)
                })
            });

            files.par_iter().for_each_with(tx, |tx, file| {
                let _ = tx.send((file.path.clone(), self.extract(root, file)));
            });

            consumer
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        })
    }

    fn extract(&self, root: &Path, file: &FileRecord) -> Extraction {
        if file.is_binary {
            return Extraction::Skipped;
        }
        let Some(extractor) = extractor_for(&file.extension) else {
            return Extraction::Skipped;
        };

        if extractor.parses_syntax_tree() && file.size > self.content_scan_limit {
            return Extraction::Oversized;
        }

        let content = match read_prefix(&root.join(&file.path), self.content_scan_limit) {
            Ok(content) => content,
            Err(err) => return Extraction::Unreadable(err),
        };

        match extractor.extract(&content) {
            Ok(imports) => Extraction::Imports(imports),
            Err(err) => Extraction::ParseFailed(err),
        }
    }
}

/// Sole writer of the graph.
fn apply_outcomes(
    files: &[FileRecord],
    outcomes: Vec<(String, Extraction)>,
    table: &ModuleTable,
) -> (DependencyGraph, DependencyStats) {
    let mut graph = DependencyGraph::new();
    let mut stats = DependencyStats::default();
    for file in files {
        graph.add_node(&file.path);
    }

    for (path, outcome) in outcomes {
        let imports = match outcome {
            Extraction::Imports(imports) => imports,
            Extraction::Skipped => continue,
            Extraction::Oversized => {
                tracing::debug!(path = %path, "source too large to parse, skipping imports");
                stats.oversized_sources += 1;
                continue;
            }
            Extraction::ParseFailed(err) => {
                tracing::warn!(path = %path, error = %err, "import extraction failed");
                stats.parse_errors += 1;
                continue;
            }
            Extraction::Unreadable(err) => {
                tracing::warn!(path = %path, error = %err, "failed to read source");
                stats.io_errors += 1;
                continue;
            }
        };

        for import in &imports {
            let Some(resolved) = table.resolve(import, &path) else {
                tracing::debug!(path = %path, import = %import, "unresolved import");
                stats.unresolved_imports += 1;
                continue;
            };
            if graph.add_edge(&path, &resolved.target, ImportEdge::new(resolved.resolution))
                && resolved.resolution == Resolution::Fuzzy
            {
                stats.fuzzy_edges += 1;
            }
        }
    }

    (graph, stats)
}

fn read_prefix(path: &Path, limit: u64) -> std::io::Result<String> {
    let mut bytes = Vec::new();
    fs::File::open(path)?.take(limit).read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
