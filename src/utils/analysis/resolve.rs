//! Best-effort resolution of imported module names to scanned files.
//!
//! The table maps candidate module names to files:
//! - `pkg/sub/module.py` answers to `pkg.sub.module`, `pkg/sub/module` and `module`
//! - a leading `src/` is optional (`src/utils/graph.rs` also answers to `utils.graph`)
//! - package markers (`__init__.py`, `index.js`, `mod.rs`) answer for their directory
//!
//! Names that match nothing exactly fall back to substring containment,
//! which can pick the wrong file in trees with similar names; such edges are
//! tagged [`Resolution::Fuzzy`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Stems that stand for their containing directory.
const PACKAGE_MARKERS: &[&str] = &["__init__", "index", "mod"];

/// Extensions tried when a relative script import omits one.
/// `d.ts` comes first so `types.d.ts` loses the whole suffix.
const SCRIPT_EXTENSIONS: &[&str] = &["d.ts", "ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// Shortest name or key considered for substring matching.
const FUZZY_MIN_LEN: usize = 3;

/// How an import was tied to its target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Matched a module name in the table
    Exact,
    /// Resolved against the importing file's directory
    Relative,
    /// Substring containment fallback
    Fuzzy,
}

impl Resolution {
    pub fn confidence(self) -> f64 {
        match self {
            Resolution::Exact | Resolution::Relative => 1.0,
            Resolution::Fuzzy => 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImport {
    pub target: String,
    pub resolution: Resolution,
}

/// Module-name lookup table over the scanned file set.
#[derive(Debug, Default)]
pub struct ModuleTable {
    paths: BTreeSet<String>,
    /// Dotted module names and bare stems
    modules: BTreeMap<String, String>,
    /// Slash paths without extension, for script-style relative imports
    slash_paths: BTreeMap<String, String>,
}

impl ModuleTable {
    pub fn new<'a>(files: impl IntoIterator<Item = &'a str>) -> Self {
        let paths: BTreeSet<String> = files.into_iter().map(String::from).collect();
        let mut table = Self {
            paths,
            ..Self::default()
        };

        // Path-derived names first so a bare stem never shadows a full module path.
        for path in &table.paths {
            let without_ext = strip_extension(path);
            let mut slash_keys = vec![without_ext.to_string()];
            if let Some((dir, stem)) = without_ext.rsplit_once('/')
                && PACKAGE_MARKERS.contains(&stem)
            {
                slash_keys.push(dir.to_string());
            }

            for slash in slash_keys {
                let dotted = slash.replace('/', ".");
                if let Some(rest) = dotted.strip_prefix("src.") {
                    table
                        .modules
                        .entry(rest.to_string())
                        .or_insert_with(|| path.clone());
                }
                table.modules.entry(dotted).or_insert_with(|| path.clone());
                table.slash_paths.entry(slash).or_insert_with(|| path.clone());
            }
        }

        for path in &table.paths {
            let without_ext = strip_extension(path);
            let mut parts = without_ext.rsplit('/');
            let stem = parts.next().unwrap_or(without_ext);
            let key = if PACKAGE_MARKERS.contains(&stem) {
                match parts.next() {
                    Some(dir) => dir,
                    None => continue,
                }
            } else {
                stem
            };
            table
                .modules
                .entry(key.to_string())
                .or_insert_with(|| path.clone());
        }

        table
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Resolves `import` as written in `importer`. Never resolves a file to itself.
    pub fn resolve(&self, import: &str, importer: &str) -> Option<ResolvedImport> {
        let resolved = if import.starts_with("./") || import.starts_with("../") {
            self.resolve_script_relative(import, importer)
                .map(|target| (target, Resolution::Relative))
        } else if import.starts_with('.') {
            self.resolve_dotted_relative(import, importer)
                .map(|target| (target, Resolution::Relative))
        } else {
            let name = normalize_absolute(import);
            self.lookup_trimmed(&name, importer)
                .map(|target| (target, Resolution::Exact))
                .or_else(|| {
                    self.fuzzy_match(&name, importer)
                        .map(|target| (target, Resolution::Fuzzy))
                })
        };

        resolved
            .filter(|(target, _)| target != importer)
            .map(|(target, resolution)| ResolvedImport { target, resolution })
    }

    /// `./utils`, `../shared/helper.js` relative to the importer's directory.
    fn resolve_script_relative(&self, import: &str, importer: &str) -> Option<String> {
        let joined = join_relative(parent_of(importer), import)?;
        if self.paths.contains(&joined) {
            return Some(joined);
        }
        self.slash_paths
            .get(strip_script_extension(&joined))
            .cloned()
    }

    /// `.sibling`, `..parent.module` (Python), `.module` (Rust `mod`/`self::`).
    fn resolve_dotted_relative(&self, import: &str, importer: &str) -> Option<String> {
        let levels = import.chars().take_while(|c| *c == '.').count();
        let rest = &import[levels..];

        let mut base: Vec<&str> = parent_of(importer)
            .split('/')
            .filter(|p| !p.is_empty())
            .collect();
        for _ in 1..levels {
            base.pop()?;
        }

        let base = base.join(".");
        let name = match (base.is_empty(), rest.is_empty()) {
            (true, true) => return None,
            (true, false) => rest.to_string(),
            (false, true) => base,
            (false, false) => format!("{}.{}", base, rest),
        };
        self.lookup_trimmed(&name, importer)
    }

    /// Exact lookup, dropping trailing segments (`pkg.mod.Class` -> `pkg.mod`).
    fn lookup_trimmed(&self, name: &str, importer: &str) -> Option<String> {
        let mut current = name;
        loop {
            if let Some(target) = self.modules.get(current)
                && target != importer
            {
                return Some(target.clone());
            }
            current = current.rsplit_once('.')?.0;
        }
    }

    /// Longest table key containing (or contained in) the name.
    fn fuzzy_match(&self, name: &str, importer: &str) -> Option<String> {
        if name.len() < FUZZY_MIN_LEN {
            return None;
        }
        self.modules
            .iter()
            .filter(|(key, target)| {
                key.len() >= FUZZY_MIN_LEN
                    && target.as_str() != importer
                    && (key.contains(name) || name.contains(key.as_str()))
            })
            .max_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| b.0.cmp(a.0)))
            .map(|(_, target)| target.clone())
    }
}

fn strip_extension(path: &str) -> &str {
    let file_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    if let Some(stripped) = path.strip_suffix(".d.ts") {
        return stripped;
    }
    match path[file_start..].rfind('.') {
        Some(0) | None => path,
        Some(dot) => &path[..file_start + dot],
    }
}

fn strip_script_extension(path: &str) -> &str {
    SCRIPT_EXTENSIONS
        .iter()
        .find_map(|ext| {
            path.strip_suffix(ext)
                .and_then(|rest| rest.strip_suffix('.'))
        })
        .unwrap_or(path)
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Lexically joins a `./` or `../` specifier onto a directory.
fn join_relative(dir: &str, specifier: &str) -> Option<String> {
    let mut parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Bare specifiers become dotted names; `@/` and `~/` aliases point at the root.
fn normalize_absolute(import: &str) -> String {
    let trimmed = import
        .strip_prefix("@/")
        .or_else(|| import.strip_prefix("~/"))
        .unwrap_or(import);
    strip_script_extension(trimmed)
        .trim_matches('/')
        .replace('/', ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(files: &[&str]) -> ModuleTable {
        ModuleTable::new(files.iter().copied())
    }

    fn target(table: &ModuleTable, import: &str, importer: &str) -> Option<(String, Resolution)> {
        table
            .resolve(import, importer)
            .map(|r| (r.target, r.resolution))
    }

    #[test]
    fn test_python_absolute_and_relative() {
        let t = table(&[
            "main.py",
            "utils.py",
            "pkg/__init__.py",
            "pkg/models.py",
            "pkg/sub/views.py",
        ]);

        assert_eq!(
            target(&t, "utils", "main.py"),
            Some(("utils.py".into(), Resolution::Exact))
        );
        assert_eq!(
            target(&t, "pkg.models", "main.py"),
            Some(("pkg/models.py".into(), Resolution::Exact))
        );
        assert_eq!(
            target(&t, "pkg", "main.py"),
            Some(("pkg/__init__.py".into(), Resolution::Exact))
        );
        assert_eq!(
            target(&t, "..models", "pkg/sub/views.py"),
            Some(("pkg/models.py".into(), Resolution::Relative))
        );
        assert_eq!(
            target(&t, ".models", "pkg/__init__.py"),
            Some(("pkg/models.py".into(), Resolution::Relative))
        );
        assert_eq!(target(&t, "os", "main.py"), None);
    }

    #[test]
    fn test_script_relative_imports() {
        let t = table(&[
            "src/app.ts",
            "src/lib/ab.js",
            "src/components/index.tsx",
            "src/types.d.ts",
        ]);

        assert_eq!(
            target(&t, "./lib/ab", "src/app.ts"),
            Some(("src/lib/ab.js".into(), Resolution::Relative))
        );
        assert_eq!(
            target(&t, "./components", "src/app.ts"),
            Some(("src/components/index.tsx".into(), Resolution::Relative))
        );
        assert_eq!(
            target(&t, "../app.js", "src/lib/ab.js"),
            Some(("src/app.ts".into(), Resolution::Relative))
        );
        assert_eq!(
            target(&t, "./types.d.ts", "src/app.ts"),
            Some(("src/types.d.ts".into(), Resolution::Relative))
        );
        assert_eq!(target(&t, "../../../outside", "src/app.ts"), None);
    }

    #[test]
    fn test_rust_module_paths() {
        let t = table(&[
            "src/lib.rs",
            "src/core/mod.rs",
            "src/core/scanner.rs",
            "src/utils/graph.rs",
        ]);

        assert_eq!(
            target(&t, "utils.graph.DependencyGraph", "src/lib.rs"),
            Some(("src/utils/graph.rs".into(), Resolution::Exact))
        );
        assert_eq!(
            target(&t, ".core", "src/lib.rs"),
            Some(("src/core/mod.rs".into(), Resolution::Relative))
        );
        assert_eq!(
            target(&t, ".scanner", "src/core/mod.rs"),
            Some(("src/core/scanner.rs".into(), Resolution::Relative))
        );
    }

    #[test]
    fn test_fuzzy_fallback_and_self_imports() {
        let t = table(&["helpers/string_utils.py", "app.py"]);

        assert_eq!(
            target(&t, "string_util", "app.py"),
            Some(("helpers/string_utils.py".into(), Resolution::Fuzzy))
        );
        // Too short to be matched by containment.
        assert_eq!(target(&t, "st", "app.py"), None);
        assert_eq!(target(&t, "app", "app.py"), None);
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("a/b/c.py"), "a/b/c");
        assert_eq!(strip_extension("a/types.d.ts"), "a/types");
        assert_eq!(strip_extension("a/.env"), "a/.env");
        assert_eq!(strip_extension("Makefile"), "Makefile");
        assert_eq!(strip_script_extension("a/b.d.ts"), "a/b");
        assert_eq!(strip_script_extension("pkg.models"), "pkg.models");
    }
}
