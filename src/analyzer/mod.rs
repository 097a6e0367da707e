//! Scope-aware detection of the globals a package touches.
//!
//! Every identifier that does not resolve to a local binding is reported
//! along with how it is used. Member chains are reduced to their root
//! (`document.cookie` reports `document`), references through the global
//! object (`window.fetch`, `globalThis.x`, webpack's `__webpack_require__.g`)
//! are unwrapped, and reads of ECMAScript built-ins are dropped.
//!
//! # Example
//!
//! ```
//! use prscan::analyzer::analyze_source;
//! use prscan::model::Access;
//!
//! let usage = analyze_source("y = 1; fetch('/x');").unwrap();
//! assert_eq!(usage.get("y"), Some(Access::ReadWrite));
//! assert_eq!(usage.get("fetch"), Some(Access::Read));
//! ```

mod builtins;
mod scope;
mod visitor;

use oxc_allocator::Allocator;
use oxc_parser::{ParseOptions, Parser};
use oxc_span::SourceType;
use tracing::{debug, warn};

use crate::error::{Result, ScanError};
use crate::model::{ExtractedFile, GlobalUsage, SkippedFile};
use visitor::GlobalVisitor;

/// A JavaScript source file to analyze.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn from_extracted(file: &ExtractedFile) -> Self {
        Self::new(file.path.clone(), file.text().into_owned())
    }
}

/// Merged usage of every file in a package, plus the files that failed to parse.
#[derive(Debug, Clone, Default)]
pub struct PackageAnalysis {
    pub usage: GlobalUsage,
    pub skipped: Vec<SkippedFile>,
}

/// Analyzes source of unknown kind: as an ES module first, then as a classic
/// script if module parsing fails.
pub fn analyze_source(text: &str) -> Result<GlobalUsage> {
    match analyze_source_as(text, SourceType::mjs()) {
        Ok(usage) => Ok(usage),
        Err(module_err) => {
            debug!(error = %module_err, "module parse failed, retrying as script");
            analyze_source_as(text, SourceType::cjs()).map_err(|_| module_err)
        }
    }
}

pub fn analyze_source_as(text: &str, source_type: SourceType) -> Result<GlobalUsage> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, text, source_type)
        .with_options(ParseOptions {
            allow_return_outside_function: true,
            ..ParseOptions::default()
        })
        .parse();

    if let Some(error) = ret.errors.first() {
        return Err(ScanError::ParseFailure {
            path: "<source>".to_string(),
            message: error.to_string(),
        });
    }

    GlobalVisitor::analyze(&ret.program)
}

/// Analyzes one file, choosing the parse mode from its extension.
pub fn analyze_file(file: &SourceFile) -> Result<GlobalUsage> {
    let path = file.path.to_lowercase();
    let result = if path.ends_with(".mjs") {
        analyze_source_as(&file.text, SourceType::mjs())
    } else if path.ends_with(".cjs") {
        analyze_source_as(&file.text, SourceType::cjs())
    } else {
        analyze_source(&file.text)
    };

    result.map_err(|err| match err {
        ScanError::ParseFailure { message, .. } => ScanError::ParseFailure {
            path: file.path.clone(),
            message,
        },
        other => other,
    })
}

/// Analyzes every file of a package and merges the results.
///
/// A file that fails to parse is logged and listed in
/// [`PackageAnalysis::skipped`]; it never fails the package.
pub fn analyze_files(files: &[SourceFile]) -> PackageAnalysis {
    let mut analysis = PackageAnalysis::default();

    for file in files {
        match analyze_file(file) {
            Ok(usage) => analysis.usage.merge(&usage),
            Err(err) => {
                warn!(path = %file.path, error = %err, "skipping unparseable file");
                analysis.skipped.push(SkippedFile {
                    path: file.path.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Access;

    fn usage(source: &str) -> Vec<(String, Access)> {
        analyze_source(source)
            .unwrap()
            .iter()
            .map(|(name, access)| (name.clone(), *access))
            .collect()
    }

    fn names(source: &str) -> Vec<String> {
        usage(source).into_iter().map(|(name, _)| name).collect()
    }

    fn rw(name: &str) -> (String, Access) {
        (name.to_string(), Access::ReadWrite)
    }

    fn read(name: &str) -> (String, Access) {
        (name.to_string(), Access::Read)
    }

    #[test]
    fn test_locals_and_builtins_yield_nothing() {
        assert!(usage("function f(x){ return Math.max(x,0); }").is_empty());
    }

    #[test]
    fn test_undeclared_assignment_and_call() {
        assert_eq!(usage("y = 1; fetch('/x');"), vec![read("fetch"), rw("y")]);
    }

    #[test]
    fn test_member_chain_reports_root() {
        assert_eq!(usage("document.body.innerHTML = '';"), vec![read("document")]);
        assert_eq!(usage("x.y = 1;"), vec![read("x")]);
        assert_eq!(usage("localStorage['token'];"), vec![read("localStorage")]);
    }

    #[test]
    fn test_global_object_aliases_are_unwrapped() {
        assert_eq!(usage("window.fetch('/a');"), vec![read("fetch")]);
        assert_eq!(usage("globalThis.self.window.eval('1');"), vec![read("eval")]);
        assert_eq!(usage("window.onclick = h;"), vec![read("h"), rw("onclick")]);
        assert!(usage("window; self; globalThis;").is_empty());
    }

    #[test]
    fn test_alias_forces_global_even_when_shadowed() {
        let source = "function f(fetch) { fetch(); window.fetch(); }";
        assert_eq!(usage(source), vec![read("fetch")]);
    }

    #[test]
    fn test_locally_bound_alias_is_not_unwrapped() {
        assert!(usage("function f(window) { window.fetch(); }").is_empty());
    }

    #[test]
    fn test_bundler_global_prefix() {
        assert_eq!(usage("__webpack_require__.g.chrome.runtime;"), vec![read("chrome")]);
        assert_eq!(usage("__webpack_require__.g.foo = 1;"), vec![rw("foo")]);
    }

    #[test]
    fn test_builtin_writes_are_reported() {
        assert_eq!(usage("Array = 1;"), vec![rw("Array")]);
        assert!(usage("JSON.parse('{}'); new Map();").is_empty());
    }

    #[test]
    fn test_arguments_is_ignored() {
        assert!(usage("function f() { return arguments.length + arguments[0]; }").is_empty());
    }

    #[test]
    fn test_hoisting_resolves_before_declaration() {
        assert!(usage("g(); function g() { return v; var v = 1; }").is_empty());
        assert!(usage("if (a) { var a = 1; }").is_empty());
    }

    #[test]
    fn test_block_scoping() {
        assert_eq!(usage("{ let a = 1; } a;"), vec![read("a")]);
        assert_eq!(usage("for (let i = 0; i < 3; i++) {} i;"), vec![read("i")]);
        assert_eq!(usage("try {} catch (e) { e; } e;"), vec![read("e")]);
        assert!(usage("switch (1) { case 1: let k = 1; k; }").is_empty());
    }

    #[test]
    fn test_function_expression_name_is_local() {
        assert_eq!(usage("const f = function inner() { inner(); }; inner;"), vec![read("inner")]);
    }

    #[test]
    fn test_class_scope() {
        let source = "class A extends Base { static make() { return new A(); } field = dep; }";
        assert_eq!(names(source), vec!["Base", "dep"]);
    }

    #[test]
    fn test_destructuring_and_updates_are_reads() {
        assert_eq!(usage("[a] = [1];"), vec![read("a")]);
        assert_eq!(usage("({ b } = {});"), vec![read("b")]);
        assert_eq!(usage("counter++;"), vec![read("counter")]);
        assert_eq!(usage("for (k in o) {}"), vec![read("k"), read("o")]);
    }

    #[test]
    fn test_compound_assignment_is_a_write() {
        assert_eq!(usage("total += 1;"), vec![rw("total")]);
    }

    #[test]
    fn test_computed_keys_are_walked() {
        assert_eq!(usage("const o = {}; o[key];"), vec![read("key")]);
        assert_eq!(usage("({ [name]: 1 });"), vec![read("name")]);
    }

    #[test]
    fn test_optional_chain_and_shorthand() {
        assert_eq!(usage("navigator?.sendBeacon('/x');"), vec![read("navigator")]);
        assert_eq!(usage("({ token });"), vec![read("token")]);
    }

    #[test]
    fn test_imports_bind_names() {
        let source = "import fs from 'fs'; import { join } from 'path'; fs.read(join(dir));";
        assert_eq!(usage(source), vec![read("dir")]);
    }

    #[test]
    fn test_commonjs_top_level_return() {
        let source = "if (cached) return module.exports; module.exports = require('x');";
        assert_eq!(names(source), vec!["cached", "module", "require"]);
    }

    #[test]
    fn test_script_fallback() {
        let source = "var await = 1; fetch(await);";
        assert_eq!(usage(source), vec![read("fetch")]);
    }

    #[test]
    fn test_parse_failure() {
        let err = analyze_source("function (").unwrap_err();
        assert!(matches!(err, ScanError::ParseFailure { .. }));
    }

    #[test]
    fn test_analyze_file_reports_path() {
        let file = SourceFile::new("package/broken.cjs", "let = ;");
        match analyze_file(&file) {
            Err(ScanError::ParseFailure { path, .. }) => assert_eq!(path, "package/broken.cjs"),
            other => panic!("expected parse failure, got {:?}", other),
        }
    }

    #[test]
    fn test_analyze_files_merges_and_skips() {
        let files = vec![
            SourceFile::new("package/a.js", "fetch('/a');"),
            SourceFile::new("package/b.js", "fetch = null;"),
            SourceFile::new("package/c.js", "function ("),
        ];

        let analysis = analyze_files(&files);

        assert_eq!(analysis.usage.get("fetch"), Some(Access::ReadWrite));
        assert_eq!(analysis.skipped.len(), 1);
        assert_eq!(analysis.skipped[0].path, "package/c.js");
    }

    #[test]
    fn test_long_operator_chain_is_walked() {
        let terms: Vec<String> = (0..50_000).map(|i| format!("a{}", i)).collect();
        let source = format!("var s = {} || fallback;", terms.join(" + "));

        let analysis = analyze_files(&[SourceFile::new("package/min.js", source)]);

        assert!(analysis.skipped.is_empty());
        assert_eq!(analysis.usage.len(), 50_001);
        assert_eq!(analysis.usage.get("a0"), Some(Access::Read));
        assert_eq!(analysis.usage.get("a49999"), Some(Access::Read));
        assert_eq!(analysis.usage.get("fallback"), Some(Access::Read));
    }

    #[test]
    fn test_excessive_nesting_skips_file() {
        let deep = format!("f{};", "()".repeat(5_000));
        let files = vec![
            SourceFile::new("package/deep.js", deep),
            SourceFile::new("package/ok.js", "fetch('/');"),
        ];

        let analysis = analyze_files(&files);

        assert_eq!(analysis.skipped.len(), 1);
        assert_eq!(analysis.skipped[0].path, "package/deep.js");
        assert!(analysis.skipped[0].reason.contains("nesting too deep"));
        assert_eq!(analysis.usage.get("fetch"), Some(Access::Read));
        assert_eq!(analysis.usage.get("f"), None);
    }

    #[test]
    fn test_each_call_starts_fresh() {
        assert_eq!(names("a;"), vec!["a"]);
        assert_eq!(names("b;"), vec!["b"]);
    }
}
