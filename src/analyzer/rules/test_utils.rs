//! Helpers for the rule tests that live next to each rule.
//!
//! Rules are run against a single parsed snippet. The project context holds
//! only that snippet, so same-file declarations and `use function` imports
//! are visible to the matcher.

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use crate::analyzer::features::FeatureTables;
use crate::analyzer::parser;
use crate::analyzer::project::ProjectContext;
use crate::analyzer::rules::{DiagnosticRule, RuleContext};
use crate::analyzer::version::VersionRange;
use crate::analyzer::Diagnostic;

static BUILTIN_TABLES: LazyLock<Arc<FeatureTables>> = LazyLock::new(|| {
    Arc::new(FeatureTables::builtin().expect("built-in feature tables must load"))
});

/// The embedded feature tables, loaded once per test binary.
pub fn builtin_tables() -> Arc<FeatureTables> {
    Arc::clone(&BUILTIN_TABLES)
}

/// Parse PHP source code into a `ParsedSource` named `test.php`.
///
/// ```rust,ignore
/// let parsed = parse_php("<?php\nstr_contains($a, $b);\n");
/// ```
pub fn parse_php(source: &str) -> parser::ParsedSource {
    parse_php_with_path(source, "test.php")
}

pub fn parse_php_with_path(source: &str, path: &str) -> parser::ParsedSource {
    let mut ts_parser = tree_sitter::Parser::new();
    ts_parser
        .set_language(tree_sitter_php::language())
        .expect("failed to load tree-sitter-php language");
    let tree = ts_parser
        .parse(source, None)
        .expect("failed to parse PHP source");

    parser::ParsedSource {
        path: PathBuf::from(path),
        source: Arc::new(source.to_string()),
        tree,
    }
}

/// A project context that knows about `parsed` and nothing else.
pub fn project_for(parsed: &parser::ParsedSource) -> ProjectContext {
    let mut project = ProjectContext::new();
    project.insert(parsed);
    project
}

/// Run a rule without a configured version range. Version-gated rules must
/// stay silent.
pub fn run_rule<R>(rule: &R, parsed: &parser::ParsedSource) -> Vec<Diagnostic>
where
    R: DiagnosticRule,
{
    run_rule_with_versions(rule, parsed, &VersionRange::default())
}

pub fn run_rule_with_versions<R>(
    rule: &R,
    parsed: &parser::ParsedSource,
    versions: &VersionRange,
) -> Vec<Diagnostic>
where
    R: DiagnosticRule,
{
    let project = project_for(parsed);
    let context = RuleContext {
        project: &project,
        versions,
    };
    rule.run(parsed, &context)
}

/// Parse `source` and run a rule against the range written in test-version
/// notation, e.g. `"5.6-8.0"` or `"7.4-"`.
///
/// ```rust,ignore
/// let rule = NewFunctionsRule::new(builtin_tables());
/// let diagnostics = run_rule_for(&rule, "<?php\nstr_contains($a, $b);\n", "7.4");
/// assert_eq!(diagnostics.len(), 1);
/// ```
pub fn run_rule_for<R>(rule: &R, source: &str, notation: &str) -> Vec<Diagnostic>
where
    R: DiagnosticRule,
{
    let versions = VersionRange::parse(notation)
        .unwrap_or_else(|err| panic!("invalid test range {notation:?}: {err}"));
    run_rule_with_versions(rule, &parse_php(source), &versions)
}

pub fn assert_no_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }

    let mut error_msg = String::new();
    error_msg.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    error_msg.push_str("Expected no diagnostics, but got:\n");
    error_msg.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    for (i, diag) in diagnostics.iter().enumerate() {
        error_msg.push_str(&format!(
            "  {}. {}: {} [{}]\n",
            i + 1,
            diag.severity,
            diag.message,
            diag.code
        ));
    }
    error_msg.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    panic!("{}", error_msg);
}

/// Assert that diagnostics read exactly like the lines of an `.expect` file:
/// `{severity}: {message}`, in order.
pub fn assert_diagnostics_exact(diagnostics: &[Diagnostic], expected_lines: &[&str]) {
    let actual_lines: Vec<String> = diagnostics
        .iter()
        .map(|d| format!("{}: {}", d.severity, d.message))
        .collect();

    if actual_lines == expected_lines {
        return;
    }

    let mut error_msg = String::new();
    error_msg.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    error_msg.push_str("Diagnostic mismatch\n");
    error_msg.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    error_msg.push_str("\nExpected diagnostics:\n");
    for (i, line) in expected_lines.iter().enumerate() {
        error_msg.push_str(&format!("  {}. {}\n", i + 1, line));
    }

    error_msg.push_str("\nActual diagnostics:\n");
    for (i, line) in actual_lines.iter().enumerate() {
        error_msg.push_str(&format!("  {}. {}\n", i + 1, line));
    }
    error_msg.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    panic!("{}", error_msg);
}
