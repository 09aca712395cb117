//! Per-language import extraction
//!
//! Each supported language family implements [`ImportExtractor`]; the
//! extractor is picked from the file extension with [`extractor_for`].
//! Module names are returned in a normalized form:
//! - dotted absolute names (`pkg.sub.module`)
//! - leading dots for relative Python/Rust modules (`.sibling`, `..parent`)
//! - raw specifiers for JavaScript/TypeScript (`./utils`, `react`)

use lazy_static::lazy_static;
use regex::Regex;
use streaming_iterator::StreamingIterator;
use thiserror::Error;
use tree_sitter::{Language, Parser, Query, QueryCursor, Tree};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("{language} source does not parse")]
    Parse { language: &'static str },

    #[error("{language} grammar unavailable: {detail}")]
    Grammar {
        language: &'static str,
        detail: String,
    },
}

/// Extracts the set of modules a source file imports.
pub trait ImportExtractor: Send + Sync {
    fn language(&self) -> &'static str;

    /// Whether extraction needs the whole file. A cut-off source does not
    /// parse, so such files are never handed over as a prefix.
    fn parses_syntax_tree(&self) -> bool {
        false
    }

    /// Returns the sorted, deduplicated module names imported by `content`.
    fn extract(&self, content: &str) -> Result<Vec<String>, ExtractError>;
}

/// Selects the extractor for a (lowercase) file extension.
pub fn extractor_for(extension: &str) -> Option<Box<dyn ImportExtractor>> {
    match extension {
        "py" | "pyw" | "pyi" => Some(Box::new(PythonExtractor)),
        "js" | "jsx" | "mjs" | "cjs" => Some(Box::new(JsExtractor)),
        "ts" | "tsx" | "mts" | "cts" => Some(Box::new(TsExtractor)),
        "rs" => Some(Box::new(RustExtractor)),
        _ => None,
    }
}

fn parse(language: &Language, name: &'static str, content: &str) -> Result<Tree, ExtractError> {
    let mut parser = Parser::new();
    parser
        .set_language(language)
        .map_err(|e| ExtractError::Grammar {
            language: name,
            detail: e.to_string(),
        })?;

    let tree = parser
        .parse(content, None)
        .ok_or(ExtractError::Parse { language: name })?;
    if tree.root_node().has_error() {
        return Err(ExtractError::Parse { language: name });
    }
    Ok(tree)
}

fn compile_query(
    language: &Language,
    name: &'static str,
    source: &str,
) -> Result<Query, ExtractError> {
    Query::new(language, source).map_err(|e| ExtractError::Grammar {
        language: name,
        detail: e.to_string(),
    })
}

fn finish(mut imports: Vec<String>) -> Vec<String> {
    imports.retain(|i| !i.is_empty());
    imports.sort();
    imports.dedup();
    imports
}

fn strip_alias(text: &str) -> String {
    match text.find(" as ") {
        Some(idx) => text[..idx].trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Python imports via the tree-sitter syntax tree.
pub struct PythonExtractor;

const PYTHON_QUERY: &str = r#"
(import_statement name: (dotted_name) @import)
(import_statement name: (aliased_import name: (dotted_name) @import))
(import_from_statement module_name: (_) @module)
"#;

impl ImportExtractor for PythonExtractor {
    fn language(&self) -> &'static str {
        "python"
    }

    fn parses_syntax_tree(&self) -> bool {
        true
    }

    fn extract(&self, content: &str) -> Result<Vec<String>, ExtractError> {
        let language: Language = tree_sitter_python::LANGUAGE.into();
        let tree = parse(&language, self.language(), content)?;
        let query = compile_query(&language, self.language(), PYTHON_QUERY)?;
        let source = content.as_bytes();

        let mut imports = Vec::new();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, tree.root_node(), source);

        while let Some(m) = matches.next() {
            for capture in m.captures {
                let Ok(text) = capture.node.utf8_text(source) else {
                    continue;
                };
                match query.capture_names()[capture.index as usize] {
                    "import" => imports.push(strip_alias(text)),
                    "module" if text.chars().all(|c| c == '.') => {
                        // `from . import helper`: the imported names are the modules.
                        let Some(statement) = capture.node.parent() else {
                            continue;
                        };
                        let mut walker = statement.walk();
                        for name in statement.children_by_field_name("name", &mut walker) {
                            if let Ok(name) = name.utf8_text(source) {
                                imports.push(format!("{}{}", text, strip_alias(name)));
                            }
                        }
                    }
                    "module" => imports.push(text.trim().to_string()),
                    _ => {}
                }
            }
        }

        Ok(finish(imports))
    }
}

lazy_static! {
    // `import x from './a'`, `import { a, b } from "b"`, `import type T from 'c'`, `import './side-effect'`
    static ref ES_IMPORT: Regex = Regex::new(
        r#"(?m)^[^\S\n]*import\s+(?:[\w$*{}\s,]+?\s+from\s+)?['"]([^'"\n]+)['"]"#
    )
    .unwrap();

    // `export * from './a'`, `export { x } from './b'`
    static ref ES_EXPORT_FROM: Regex = Regex::new(
        r#"(?m)^[^\S\n]*export\s+(?:type\s+)?(?:\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})\s*from\s+['"]([^'"\n]+)['"]"#
    )
    .unwrap();

    static ref REQUIRE_CALL: Regex =
        Regex::new(r#"\brequire\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).unwrap();

    static ref DYNAMIC_IMPORT: Regex =
        Regex::new(r#"\bimport\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).unwrap();

    static ref REFERENCE_PATH: Regex =
        Regex::new(r#"(?m)^[^\S\n]*///\s*<reference\s+path\s*=\s*['"]([^'"\n]+)['"]"#).unwrap();

    static ref RUST_ALIAS: Regex = Regex::new(r"\s+as\s+[A-Za-z_][A-Za-z0-9_]*").unwrap();
}

fn capture_all(pattern: &Regex, content: &str, imports: &mut Vec<String>) {
    for caps in pattern.captures_iter(content) {
        if let Some(specifier) = caps.get(1) {
            imports.push(specifier.as_str().trim().to_string());
        }
    }
}

fn script_imports(content: &str) -> Vec<String> {
    let mut imports = Vec::new();
    capture_all(&ES_IMPORT, content, &mut imports);
    capture_all(&ES_EXPORT_FROM, content, &mut imports);
    capture_all(&REQUIRE_CALL, content, &mut imports);
    capture_all(&DYNAMIC_IMPORT, content, &mut imports);
    imports
}

/// JavaScript imports: ES modules, re-exports, `require(...)` and `import(...)`.
pub struct JsExtractor;

impl ImportExtractor for JsExtractor {
    fn language(&self) -> &'static str {
        "javascript"
    }

    fn extract(&self, content: &str) -> Result<Vec<String>, ExtractError> {
        Ok(finish(script_imports(content)))
    }
}

/// TypeScript imports: everything JavaScript has plus `/// <reference path>`.
pub struct TsExtractor;

impl ImportExtractor for TsExtractor {
    fn language(&self) -> &'static str {
        "typescript"
    }

    fn extract(&self, content: &str) -> Result<Vec<String>, ExtractError> {
        let mut imports = script_imports(content);
        for caps in REFERENCE_PATH.captures_iter(content) {
            if let Some(path) = caps.get(1) {
                let path = path.as_str().trim();
                // Reference paths are file-relative even without a leading `./`.
                if path.starts_with('.') {
                    imports.push(path.to_string());
                } else {
                    imports.push(format!("./{}", path));
                }
            }
        }
        Ok(finish(imports))
    }
}

/// Rust `use` and out-of-line `mod` declarations via tree-sitter.
pub struct RustExtractor;

const RUST_QUERY: &str = r#"
(use_declaration argument: (_) @use)
(mod_item name: (identifier) @module !body)
"#;

impl ImportExtractor for RustExtractor {
    fn language(&self) -> &'static str {
        "rust"
    }

    fn parses_syntax_tree(&self) -> bool {
        true
    }

    fn extract(&self, content: &str) -> Result<Vec<String>, ExtractError> {
        let language: Language = tree_sitter_rust::LANGUAGE.into();
        let tree = parse(&language, self.language(), content)?;
        let query = compile_query(&language, self.language(), RUST_QUERY)?;
        let source = content.as_bytes();

        let mut imports = Vec::new();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, tree.root_node(), source);

        while let Some(m) = matches.next() {
            for capture in m.captures {
                let Ok(text) = capture.node.utf8_text(source) else {
                    continue;
                };
                match query.capture_names()[capture.index as usize] {
                    "use" => {
                        for path in expand_use_tree(text) {
                            imports.push(normalize_rust_path(&path));
                        }
                    }
                    "module" => imports.push(format!(".{}", text.trim())),
                    _ => {}
                }
            }
        }

        Ok(finish(imports))
    }
}

/// Expands one level of `prefix::{a, b::c}` into separate paths.
fn expand_use_tree(text: &str) -> Vec<String> {
    let compact: String = RUST_ALIAS
        .replace_all(text, "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let Some(open) = compact.find('{') else {
        return vec![compact];
    };
    let prefix = compact[..open].trim_end_matches("::");
    let inner = compact[open + 1..].trim_end_matches('}');

    let mut paths = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                paths.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    paths.push(&inner[start..]);

    paths
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(|p| {
            // Nested groups keep only their shared prefix.
            let p = p.split('{').next().unwrap_or(p).trim_end_matches("::");
            if p == "self" || p.is_empty() {
                prefix.to_string()
            } else {
                format!("{}::{}", prefix, p)
            }
        })
        .collect()
}

fn normalize_rust_path(path: &str) -> String {
    let path = path.trim_end_matches("::*");

    if let Some(rest) = path.strip_prefix("crate::") {
        rest.replace("::", ".")
    } else if let Some(rest) = path
        .strip_prefix("super::")
        .or_else(|| path.strip_prefix("self::"))
    {
        format!(".{}", rest.replace("::", "."))
    } else {
        path.replace("::", ".")
    }
}
