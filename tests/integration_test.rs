use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use strata::{AnalysisReport, Analyzer, AnalyzerConfig, GroupKind};
use tempfile::TempDir;

fn analyze(root: &Path, config: AnalyzerConfig) -> anyhow::Result<AnalysisReport> {
    let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
    Ok(Analyzer::new(config).with_timestamp(ts).analyze(root)?)
}

/// No duplicates, no empty groups, and every scanned file is grouped.
fn assert_partition(report: &AnalysisReport) {
    let mut seen = BTreeSet::new();
    for (group, files) in &report.groups {
        assert!(!files.is_empty(), "group {} is empty", group);
        for file in files {
            assert!(seen.insert(file.clone()), "{} is in two groups", file);
        }
    }
    let scanned: BTreeSet<String> = report.structure.file_paths().into_iter().collect();
    assert_eq!(seen, scanned);
}

#[test]
fn test_end_to_end_python_project() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    fs::write(root.join("main.py"), "import utils\nimport config\n")?;
    fs::write(root.join("utils.py"), "def helper():\n    return 42\n")?;
    fs::write(root.join("test_main.py"), "import main\n\ndef test_run():\n    pass\n")?;
    fs::write(root.join("config.py"), "DEBUG = False\n")?;

    let report = analyze(root, AnalyzerConfig::default())?;

    assert_eq!(report.structure.main_language, "python");
    assert_eq!(report.groups["core"], vec!["main.py"]);
    assert_eq!(report.groups["utility"], vec!["utils.py"]);
    assert_eq!(report.groups["test"], vec!["test_main.py"]);
    assert_eq!(report.groups["configuration"], vec!["config.py"]);
    assert_partition(&report);

    assert_eq!(report.mappings.len(), 4);
    assert_eq!(report.statistics.total_mappings, 4);
    assert_eq!(report.statistics.unique_files, 4);
    assert!(report.statistics.orphaned_files.is_empty());

    let main = report
        .mappings
        .iter()
        .find(|m| m.file_path == "main.py")
        .unwrap();
    assert_eq!(main.group_type, GroupKind::Core);
    assert_eq!(main.assignment_reason, "name contains 'main'");

    assert!(report.dependencies.cycles.is_empty());
    assert_eq!(report.dependencies.edges.len(), 3);
    assert_eq!(report.dependencies.importance.len(), 4);
    Ok(())
}

#[test]
fn test_mutual_imports_are_grouped_as_circular() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    fs::create_dir_all(root.join("shop"))?;
    fs::write(root.join("shop/orders.py"), "from shop.payments import charge\n")?;
    fs::write(root.join("shop/payments.py"), "from shop.orders import Order\n")?;
    fs::write(root.join("shop/catalog.py"), "from shop.orders import Order\n")?;

    let report = analyze(root, AnalyzerConfig::default())?;

    assert_eq!(
        report.dependencies.cycles,
        vec![vec![
            "shop/orders.py".to_string(),
            "shop/payments.py".to_string()
        ]]
    );
    assert_eq!(
        report.groups["circular_dependency"],
        vec!["shop/orders.py", "shop/payments.py"]
    );
    assert_eq!(report.groups["feature"], vec!["shop/catalog.py"]);
    assert_partition(&report);
    Ok(())
}

#[test]
fn test_repeated_runs_are_identical() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    fs::create_dir_all(root.join("src/components"))?;
    fs::write(root.join("src/index.ts"), "import { App } from './components/app';\n")?;
    fs::write(
        root.join("src/components/app.tsx"),
        "import { format } from '../utils';\nexport const App = () => null;\n",
    )?;
    fs::write(root.join("src/utils.ts"), "export const format = (s: string) => s;\n")?;
    fs::write(root.join("src/app.test.ts"), "import { App } from './components/app';\n")?;
    fs::write(root.join("package.json"), "{\"name\": \"web\"}\n")?;

    let first = analyze(root, AnalyzerConfig::default())?.to_json()?;
    let second = analyze(root, AnalyzerConfig::default())?.to_json()?;

    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_ignore_patterns_and_truncation() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    fs::create_dir_all(root.join("build/lib"))?;
    fs::write(root.join("build/lib/generated.py"), "x = 1\n")?;
    fs::create_dir_all(root.join("logs/old"))?;
    fs::write(root.join("logs/old/run.log"), "noise\n")?;
    for i in 0..6 {
        fs::write(root.join(format!("feature_{}.py", i)), "pass\n")?;
    }

    let mut config = AnalyzerConfig::default();
    config.scan.ignore_files = vec!["*.log".to_string()];
    let report = analyze(root, config.clone())?;

    let paths = report.structure.file_paths();
    assert!(!paths.iter().any(|p| p.starts_with("build/")));
    assert!(!paths.iter().any(|p| p.ends_with(".log")));
    assert_eq!(paths.len(), 6);
    assert!(!report.scan_stats.truncated);

    config.scan.max_files = 4;
    let truncated = analyze(root, config)?;
    assert!(truncated.scan_stats.truncated);
    assert_eq!(truncated.structure.file_count(), 4);
    assert_partition(&truncated);
    Ok(())
}

#[test]
fn test_custom_ignore_lists_keep_default_ignores() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    fs::create_dir_all(root.join(".git"))?;
    fs::write(root.join(".git/HEAD"), "ref: refs/heads/main\n")?;
    fs::write(root.join(".git/config"), "[core]\n")?;
    fs::create_dir_all(root.join("node_modules/react"))?;
    fs::write(root.join("node_modules/react/index.js"), "module.exports = {};\n")?;
    fs::create_dir_all(root.join("generated"))?;
    fs::write(root.join("generated/schema.py"), "x = 1\n")?;
    fs::write(root.join("app.py"), "print('hi')\n")?;
    fs::write(root.join("app.pyc"), [0u8, 1, 2])?;
    fs::write(root.join("debug.log"), "noise\n")?;

    let config = AnalyzerConfig::from_toml_str(
        "[scan]\nignore_dirs = [\"generated\"]\nignore_files = [\"*.log\"]\n",
    )?;
    let report = analyze(root, config)?;

    assert_eq!(report.structure.file_paths(), vec!["app.py"]);
    assert_eq!(report.groups["core"], vec!["app.py"]);
    assert_eq!(report.groups.len(), 1);
    assert_partition(&report);
    Ok(())
}

#[test]
fn test_depth_cap_marks_the_scan_truncated() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    fs::create_dir_all(root.join("a/b/c"))?;
    fs::write(root.join("a/one.py"), "pass\n")?;
    fs::write(root.join("a/b/c/deep.py"), "pass\n")?;

    let mut config = AnalyzerConfig::default();
    config.scan.max_depth = 2;
    let report = analyze(root, config)?;

    assert_eq!(report.structure.file_paths(), vec!["a/one.py"]);
    assert!(report.scan_stats.truncated);
    assert_partition(&report);
    Ok(())
}

#[test]
fn test_invalid_root_and_config() {
    let missing =
        Analyzer::new(AnalyzerConfig::default()).analyze(Path::new("/definitely/not/here"));
    assert!(matches!(missing, Err(strata::AnalysisError::InvalidRoot(_))));

    let bad = AnalyzerConfig::from_toml_str("[analysis]\nfunctionality_threshold = 1.5\n");
    assert!(matches!(bad, Err(strata::AnalysisError::Configuration(_))));
}

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_logs_go_to_injected_dispatch() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    fs::write(temp_dir.path().join("app.py"), "import os\n")?;

    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();

    Analyzer::new(AnalyzerConfig::default())
        .with_dispatch(tracing::Dispatch::new(subscriber))
        .analyze(temp_dir.path())?;

    let logs = String::from_utf8(capture.0.lock().unwrap().clone())?;
    assert!(logs.contains("scan complete"));
    assert!(logs.contains("groups resolved"));
    Ok(())
}
