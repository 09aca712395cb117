use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use tracing::Dispatch;

use crate::config::AnalyzerConfig;
use crate::core::scanner::canonical_root;
use crate::core::{FileRecord, ProjectStructure, ScanEvent, ScanStats, Scanner};
use crate::error::{Result, ValidationError};
use crate::grouping::{GroupAssigner, GroupingResult, PriorityResolver};
use crate::traceability::{FileGroupMapping, MappingStatistics, TraceabilityMapper};
use crate::utils::analysis::{DependencyAnalysisResult, DependencyGraphBuilder};
use crate::utils::functionality::{FunctionalityDetection, FunctionalityDetector};

/// Everything one run produced, in the shape the report generator consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub structure: ProjectStructure,
    pub scan_stats: ScanStats,
    pub functionalities: Vec<FunctionalityDetection>,
    pub dependencies: DependencyAnalysisResult,
    /// Group name -> member files, keyed alphabetically by group name
    pub groups: BTreeMap<String, Vec<String>>,
    pub mappings: Vec<FileGroupMapping>,
    pub statistics: MappingStatistics,
}

impl AnalysisReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs the whole pipeline over one root directory.
///
/// Scan, functionality detection, dependency analysis, grouping and
/// traceability run in that order; per-file work uses a worker pool sized
/// by `analysis.workers`.
pub struct Analyzer {
    config: AnalyzerConfig,
    events: Option<Sender<ScanEvent>>,
    dispatch: Option<Dispatch>,
    timestamp: Option<DateTime<Utc>>,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            events: None,
            dispatch: None,
            timestamp: None,
        }
    }

    /// Streams progress events to `tx`.
    pub fn with_events(mut self, tx: Sender<ScanEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Routes every log line of a run, worker threads included, to `dispatch`.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Pins the mapping timestamp so repeated runs serialize identically.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn analyze(&self, root: &Path) -> Result<AnalysisReport> {
        let result = match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, || self.run(root)),
            None => self.run(root),
        };
        if let Err(err) = &result {
            notify(&self.events, ScanEvent::Error(err.to_string()));
        }
        result
    }

    fn run(&self, root: &Path) -> Result<AnalysisReport> {
        self.config.validate()?;
        let pool = build_pool(self.config.analysis.workers)?;
        pool.install(|| self.pipeline(root))
    }

    fn pipeline(&self, root: &Path) -> Result<AnalysisReport> {
        let options = &self.config.analysis;
        let root = canonical_root(root)?;
        notify(&self.events, ScanEvent::StartScanning);

        // 1. Scan
        let scan = Scanner::new(self.config.scan.clone()).scan(&root)?;
        let files = &scan.structure.files;
        notify(&self.events, ScanEvent::FilesFound(files.len()));
        if scan.stats.truncated {
            notify(&self.events, ScanEvent::ScanTruncated(files.len()));
        }

        // 2. Functionality
        let functionalities = FunctionalityDetector::new(options).detect(&root, files);
        notify(
            &self.events,
            ScanEvent::FunctionalitiesDetected(functionalities.len()),
        );

        // 3. Dependencies
        let dependencies = DependencyGraphBuilder::new(options).build(&root, files);
        notify(
            &self.events,
            ScanEvent::GraphBuilt {
                nodes: files.len(),
                edges: dependencies.edges.len(),
                cycles: dependencies.cycles.len(),
            },
        );

        // 4. Grouping
        let raw = GroupAssigner::new().classify(files, &dependencies.cycle_members());
        let grouping = PriorityResolver::new(options).resolve(&root, &raw)?;
        check_coverage(files, &grouping)?;
        notify(&self.events, ScanEvent::GroupsResolved(grouping.groups.len()));

        // 5. Traceability
        let mut mapper = match self.timestamp {
            Some(ts) => TraceabilityMapper::with_timestamp(ts),
            None => TraceabilityMapper::new(),
        };
        mapper.build(&grouping)?;
        let statistics = mapper.statistics(Some(&scan.structure.file_paths()));

        let summary = format!(
            "{} files in {} groups, {} dependencies, {} cycles",
            mapper.len(),
            grouping.groups.len(),
            dependencies.edges.len(),
            dependencies.cycles.len()
        );
        tracing::info!(root = %root.display(), "{}", summary);
        notify(&self.events, ScanEvent::Complete(summary));

        let mappings = mapper.mappings().into_iter().cloned().collect();
        Ok(AnalysisReport {
            groups: grouping.groups_map(),
            structure: scan.structure,
            scan_stats: scan.stats,
            functionalities,
            dependencies,
            mappings,
            statistics,
        })
    }
}

/// Worker pool whose threads log to the caller's subscriber.
fn build_pool(workers: Option<usize>) -> Result<rayon::ThreadPool> {
    let dispatch = tracing::dispatcher::get_default(|d| d.clone());
    let mut builder =
        rayon::ThreadPoolBuilder::new().thread_name(|i| format!("strata-worker-{}", i));
    if let Some(n) = workers {
        builder = builder.num_threads(n);
    }

    let pool = builder
        .spawn_handler(move |thread| {
            let dispatch = dispatch.clone();
            let mut spawn = std::thread::Builder::new();
            if let Some(name) = thread.name() {
                spawn = spawn.name(name.to_owned());
            }
            if let Some(size) = thread.stack_size() {
                spawn = spawn.stack_size(size);
            }
            spawn.spawn(move || tracing::dispatcher::with_default(&dispatch, || thread.run()))?;
            Ok(())
        })
        .build()?;
    Ok(pool)
}

/// Every scanned file that survived the existence filter sits in exactly
/// one group.
fn check_coverage(files: &[FileRecord], grouping: &GroupingResult) -> Result<()> {
    let grouped: BTreeSet<&str> = grouping
        .groups
        .iter()
        .flat_map(|g| g.files.iter().map(String::as_str))
        .collect();
    let dropped: BTreeSet<&str> = grouping.dropped_missing.iter().map(String::as_str).collect();

    for file in files {
        if !grouped.contains(file.path.as_str()) && !dropped.contains(file.path.as_str()) {
            return Err(ValidationError::UnassignedFile {
                file: file.path.clone(),
            }
            .into());
        }
    }
    Ok(())
}

fn notify(tx: &Option<Sender<ScanEvent>>, event: ScanEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event);
    }
}
