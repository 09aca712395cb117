use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PageRankSettings;
use crate::utils::analysis::resolve::Resolution;

/// Closed chain of imports, starting at its lexicographically smallest file.
pub type Cycle = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImportEdge {
    pub confidence: f64,
    pub resolution: Resolution,
}

impl ImportEdge {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            confidence: resolution.confidence(),
            resolution,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RankError {
    #[error("pagerank did not converge within {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error("pagerank produced non-finite scores")]
    NonFinite,

    #[error("pagerank produced no positive score")]
    Degenerate,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CycleSearch {
    pub cycles: Vec<Cycle>,
    /// Enumeration stopped at the cap
    pub truncated: bool,
}

/// Directed import graph over file paths. Cycles are ordinary data here.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<String, ImportEdge>,
    index: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, path: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(path) {
            return idx;
        }
        let idx = self.graph.add_node(path.to_string());
        self.index.insert(path.to_string(), idx);
        idx
    }

    /// Adds `from -> to`. Self-imports are dropped; a repeated edge keeps the
    /// more confident resolution. Returns whether a new edge was created.
    pub fn add_edge(&mut self, from: &str, to: &str, edge: ImportEdge) -> bool {
        if from == to {
            return false;
        }
        let a = self.add_node(from);
        let b = self.add_node(to);
        if let Some(existing) = self.graph.find_edge(a, b) {
            let weight = &mut self.graph[existing];
            if edge.confidence > weight.confidence {
                *weight = edge;
            }
            return false;
        }
        self.graph.add_edge(a, b, edge);
        true
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn has_node(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    /// All edges ordered by (from, to).
    pub fn edges(&self) -> Vec<(String, String, ImportEdge)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_indices()
            .filter_map(|e| {
                let (a, b) = self.graph.edge_endpoints(e)?;
                Some((self.graph[a].clone(), self.graph[b].clone(), self.graph[e]))
            })
            .collect();
        edges.sort_by(|x, y| x.0.cmp(&y.0).then_with(|| x.1.cmp(&y.1)));
        edges
    }

    /// Enumerates every simple cycle of length >= 2, at most `max_cycles`.
    ///
    /// Only strongly connected components with two or more files can hold a
    /// cycle. Inside each, a cycle is reported once, from its smallest path,
    /// by only extending through files that sort after the start.
    pub fn find_cycles(&self, max_cycles: usize) -> CycleSearch {
        let mut search = CycleSearch::default();

        let mut components: Vec<Vec<NodeIndex>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|c| c.len() >= 2)
            .map(|mut c| {
                c.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
                c
            })
            .collect();
        components.sort_by(|a, b| self.graph[a[0]].cmp(&self.graph[b[0]]));

        'components: for component in &components {
            let rank: HashMap<NodeIndex, usize> =
                component.iter().enumerate().map(|(i, n)| (*n, i)).collect();

            for (start_rank, &start) in component.iter().enumerate() {
                if !self.cycles_from(start, start_rank, &rank, max_cycles, &mut search) {
                    break 'components;
                }
            }
        }

        search.cycles.sort();
        search
    }

    /// Iterative DFS for cycles through `start`. Returns false once capped.
    fn cycles_from(
        &self,
        start: NodeIndex,
        start_rank: usize,
        rank: &HashMap<NodeIndex, usize>,
        max_cycles: usize,
        search: &mut CycleSearch,
    ) -> bool {
        let successors = |node: NodeIndex| -> Vec<NodeIndex> {
            let mut next: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(node, Direction::Outgoing)
                .filter(|n| rank.get(n).is_some_and(|r| *r >= start_rank))
                .collect();
            next.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
            next.dedup();
            next
        };

        let mut path = vec![start];
        let mut on_path: HashSet<NodeIndex> = HashSet::from([start]);
        let mut frames: Vec<(Vec<NodeIndex>, usize)> = vec![(successors(start), 0)];

        while let Some((next, cursor)) = frames.last_mut() {
            let Some(&node) = next.get(*cursor) else {
                frames.pop();
                if let Some(done) = path.pop() {
                    on_path.remove(&done);
                }
                continue;
            };
            *cursor += 1;

            if node == start {
                if path.len() >= 2 {
                    if search.cycles.len() >= max_cycles {
                        search.truncated = true;
                        return false;
                    }
                    search
                        .cycles
                        .push(path.iter().map(|n| self.graph[*n].clone()).collect());
                }
            } else if on_path.insert(node) {
                path.push(node);
                frames.push((successors(node), 0));
            }
        }
        true
    }

    /// Normalized PageRank, falling back to degree centrality when the
    /// iteration fails. An empty graph has no scores.
    pub fn importance(&self, settings: &PageRankSettings) -> BTreeMap<String, f64> {
        if self.graph.node_count() == 0 {
            return BTreeMap::new();
        }
        match self.pagerank(settings) {
            Ok(scores) => scores,
            Err(err) => {
                tracing::warn!(error = %err, "falling back to degree centrality");
                self.degree_centrality()
            }
        }
    }

    /// PageRank where an import is a vote for the imported file. Rank held by
    /// files without imports is spread evenly over the graph each round.
    pub fn pagerank(
        &self,
        settings: &PageRankSettings,
    ) -> std::result::Result<BTreeMap<String, f64>, RankError> {
        let n = self.graph.node_count();
        if n == 0 {
            return Err(RankError::Degenerate);
        }
        let n_f = n as f64;

        let out_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|i| self.graph.neighbors_directed(i, Direction::Outgoing).count())
            .collect();

        let mut scores = vec![1.0 / n_f; n];
        let mut converged = false;

        for iteration in 0..settings.max_iterations {
            let sink_rank: f64 = self
                .graph
                .node_indices()
                .filter(|i| out_degree[i.index()] == 0)
                .map(|i| scores[i.index()])
                .sum();
            let sink_contribution = sink_rank / n_f;

            let mut next = vec![0.0; n];
            for node in self.graph.node_indices() {
                let incoming: f64 = self
                    .graph
                    .neighbors_directed(node, Direction::Incoming)
                    .map(|voter| scores[voter.index()] / out_degree[voter.index()] as f64)
                    .sum();
                next[node.index()] = (1.0 - settings.damping) / n_f
                    + settings.damping * (incoming + sink_contribution);
            }

            let delta: f64 = next
                .iter()
                .zip(&scores)
                .map(|(new, old)| (new - old).abs())
                .sum();
            scores = next;

            if !delta.is_finite() {
                return Err(RankError::NonFinite);
            }
            if delta < settings.tolerance {
                tracing::debug!(iterations = iteration + 1, delta, "pagerank converged");
                converged = true;
                break;
            }
        }

        if !converged {
            return Err(RankError::NotConverged {
                iterations: settings.max_iterations,
            });
        }

        let max = scores.iter().cloned().fold(0.0_f64, f64::max);
        if max <= 0.0 || !max.is_finite() {
            return Err(RankError::Degenerate);
        }

        Ok(self
            .graph
            .node_indices()
            .map(|i| (self.graph[i].clone(), scores[i.index()] / max))
            .collect())
    }

    /// (in + out) / (n - 1), normalized by the maximum.
    pub fn degree_centrality(&self) -> BTreeMap<String, f64> {
        let n = self.graph.node_count();
        let denom = n.saturating_sub(1).max(1) as f64;

        let raw: Vec<(String, f64)> = self
            .graph
            .node_indices()
            .map(|i| {
                let degree = self.graph.neighbors_directed(i, Direction::Incoming).count()
                    + self.graph.neighbors_directed(i, Direction::Outgoing).count();
                (self.graph[i].clone(), degree as f64 / denom)
            })
            .collect();

        let max = raw.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
        raw.into_iter()
            .map(|(path, v)| (path, if max > 0.0 { v / max } else { 0.0 }))
            .collect()
    }
}
