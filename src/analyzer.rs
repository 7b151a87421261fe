pub mod compose;
pub mod config;
pub mod features;
mod ignore;
pub mod matcher;
pub mod parser;
pub mod project;
pub mod rules;
mod test_config;
pub mod version;

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use config::AnalyzerConfig;
use ignore::IgnoreState;
use indicatif::ProgressBar;
use parser::{ParsedSource, PhpParser, TreeSitterPhpParser};
use project::{FileMetadata, ProjectContext, collect_file_metadata};
use rayon::prelude::*;
use rules::{DiagnosticRule, RuleContext};
use serde::Serialize;
use test_config::TestConfig;
use tracing::{debug, warn};
use tree_sitter::Point;
use version::VersionRange;
use walkdir::WalkDir;

/// Represents the severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Span {
    pub start: Point,
    pub end: Point,
}

/// A diagnostic that can be emitted during analysis.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub severity: Severity,
    pub message: String,
    /// Stable identifier, e.g. `str_containsFound`.
    pub code: String,
    /// Name of the rule that produced it.
    pub rule: String,
    pub span: Option<Span>,
    pub snippet_before: Option<String>,
    pub snippet_line: Option<String>,
    pub snippet_after: Option<String>,
    pub caret_col: Option<usize>,
    pub caret_len: usize,
}

/// Flat form of a [`Diagnostic`] for `--format json`.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticJson {
    pub file: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub severity: String,
    pub code: String,
    pub rule: String,
    pub message: String,
}

impl Diagnostic {
    #[allow(clippy::too_many_arguments)]
    pub fn with_span(
        file: PathBuf,
        severity: Severity,
        message: impl Into<String>,
        span: Span,
        snippet_before: Option<String>,
        snippet_line: Option<String>,
        snippet_after: Option<String>,
        caret_col: Option<usize>,
        caret_len: usize,
    ) -> Self {
        Self {
            file,
            severity,
            message: message.into(),
            code: String::new(),
            rule: String::new(),
            span: Some(span),
            snippet_before,
            snippet_line,
            snippet_after,
            caret_col,
            caret_len: caret_len.max(1),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = rule.into();
        self
    }

    pub fn to_json(&self) -> DiagnosticJson {
        DiagnosticJson {
            file: self.file.display().to_string(),
            line: self.span.as_ref().map(|span| span.start.row + 1),
            column: self.span.as_ref().map(|span| span.start.column + 1),
            severity: self.severity.to_string(),
            code: self.code.clone(),
            rule: self.rule.clone(),
            message: self.message.clone(),
        }
    }

    fn position(&self) -> Option<(usize, usize)> {
        self.span
            .as_ref()
            .map(|span| (span.start.row, span.start.column))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const RESET: &str = "\x1b[0m";
        const DIM: &str = "\x1b[2m";
        const BOLD_RED: &str = "\x1b[1;31m";
        const BOLD_YELLOW: &str = "\x1b[1;33m";
        const BLUE: &str = "\x1b[34m";

        let severity_color = match self.severity {
            Severity::Warning => BOLD_YELLOW,
            Severity::Error => BOLD_RED,
        };
        write!(
            f,
            "{}{}{}: {}",
            severity_color, self.severity, RESET, self.message
        )?;
        if self.code.is_empty() {
            writeln!(f)?;
        } else {
            writeln!(f, " {DIM}[{}]{RESET}", self.code)?;
        }

        let Some(span) = &self.span else {
            return writeln!(f, " --> {}", self.file.display());
        };

        writeln!(
            f,
            " --> {}:{}:{}",
            self.file.display(),
            span.start.row + 1,
            span.start.column + 1
        )?;
        writeln!(f, "{BLUE}    |{RESET}")?;
        let prefix_line = |line_num: usize| format!("{BLUE}{:>3}{RESET} {BLUE}|{RESET}", line_num);
        let blank_prefix = format!("{BLUE}    |{RESET}");

        if let Some(line_before) = &self.snippet_before {
            writeln!(
                f,
                "{} {}{}{}",
                prefix_line(span.start.row),
                DIM,
                line_before,
                RESET
            )?;
        }

        if let Some(line) = &self.snippet_line {
            writeln!(f, "{} {}", prefix_line(span.start.row + 1), line)?;
            writeln!(
                f,
                "{} {}{}{}{}",
                blank_prefix,
                " ".repeat(self.caret_col.unwrap_or(0)),
                severity_color,
                "^".repeat(self.caret_len),
                RESET
            )?;
        }

        if let Some(line_after) = &self.snippet_after {
            writeln!(
                f,
                "{} {}{}{}",
                prefix_line(span.start.row + 2),
                DIM,
                line_after,
                RESET
            )?;
        }

        Ok(())
    }
}

/// Checks PHP files against the configured version range.
///
/// Rules, tables and configuration are immutable once built, so one analyzer
/// serves any number of runs and files are checked in parallel.
pub struct Analyzer {
    rules: Vec<Box<dyn DiagnosticRule>>,
    config: AnalyzerConfig,
    versions: VersionRange,
}

impl Analyzer {
    /// Fails on a malformed version range or unreadable feature tables, before
    /// any file is looked at.
    pub fn new(config: Option<AnalyzerConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();
        let versions = config.version_range()?;
        let tables = Arc::new(config.feature_tables()?);
        // Surface a broken grammar here rather than once per worker.
        TreeSitterPhpParser::new()?;

        if versions.is_inert() {
            debug!("no php_version configured; version-gated rules are inert");
        } else {
            debug!(%versions, "configured PHP version range");
        }

        Ok(Self {
            rules: rules::default_rules(tables),
            config,
            versions,
        })
    }

    pub fn versions(&self) -> &VersionRange {
        &self.versions
    }

    /// Checks one in-memory file on its own.
    pub fn analyse_source(&self, path: &Path, source: String) -> Result<Vec<Diagnostic>> {
        let mut parser = TreeSitterPhpParser::new()?;
        let parsed = parser.parse_source(path, source)?;
        let mut project = ProjectContext::new();
        project.insert(&parsed);
        Ok(self.check_file(&parsed, &project))
    }

    pub fn analyse_file(&self, path: &Path) -> Result<Vec<Diagnostic>> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        self.analyse_source(path, source)
    }

    pub fn analyse_root(&self, root: &Path) -> Result<Vec<Diagnostic>> {
        let paths = collect_php_files(root)?;
        self.analyse_files(&paths)
    }

    pub fn analyse_files(&self, paths: &[PathBuf]) -> Result<Vec<Diagnostic>> {
        self.analyse_files_with_progress(paths, None)
    }

    /// Parses every file, builds the project context from all of them, then
    /// runs the rules. Diagnostics are grouped by file in `paths` order and
    /// sorted by position within a file. With a progress bar, each file's
    /// diagnostics are printed through it as soon as they are known.
    pub fn analyse_files_with_progress(
        &self,
        paths: &[PathBuf],
        progress: Option<&ProgressBar>,
    ) -> Result<Vec<Diagnostic>> {
        let parsed: Vec<(ParsedSource, FileMetadata)> = paths
            .par_iter()
            .map_init(
                || TreeSitterPhpParser::new().ok(),
                |parser, path| parse_with_metadata(parser.as_mut(), path),
            )
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();

        let mut project = ProjectContext::new();
        let mut sources = Vec::with_capacity(parsed.len());
        for (source, metadata) in parsed {
            project.insert_metadata(source.path.clone(), metadata);
            sources.push(source);
        }
        debug!(files = project.len(), "built project context");

        let per_file: Vec<Vec<Diagnostic>> = sources
            .into_par_iter()
            .map(|parsed| {
                let diagnostics = self.check_file(&parsed, &project);
                if let Some(pb) = progress {
                    if !diagnostics.is_empty() {
                        let rendered: Vec<String> =
                            diagnostics.iter().map(ToString::to_string).collect();
                        pb.println(rendered.join("\n"));
                    }
                    pb.inc(1);
                }
                diagnostics
            })
            .collect();

        Ok(per_file.into_iter().flatten().collect())
    }

    fn check_file(&self, parsed: &ParsedSource, project: &ProjectContext) -> Vec<Diagnostic> {
        let ignore = IgnoreState::from_source(&parsed.source);
        if ignore.ignores_everything() {
            debug!(file = %parsed.path.display(), "file ignored by directive");
            return Vec::new();
        }

        let test_config = TestConfig::from_source(&parsed.source);
        let versions = test_config.php_version.as_ref().unwrap_or(&self.versions);
        let context = RuleContext { project, versions };

        let mut diagnostics = Vec::new();
        for rule in &self.rules {
            let name = rule.name();
            if !self.config.enabled(name) || !test_config.should_run_rule(name) {
                continue;
            }

            diagnostics.extend(
                rule.run(parsed, &context)
                    .into_iter()
                    .filter(|diag| !ignore.should_ignore_diagnostic(name, &diag.code)),
            );
        }

        diagnostics.sort_by_key(Diagnostic::position);
        debug!(
            file = %parsed.path.display(),
            %versions,
            test_file = test_config.is_test_file(),
            count = diagnostics.len(),
            "checked file"
        );
        diagnostics
    }
}

/// Reads and parses one file for the first pass. Unreadable files are skipped.
fn parse_with_metadata(
    parser: Option<&mut TreeSitterPhpParser>,
    path: &Path,
) -> Result<Option<(ParsedSource, FileMetadata)>> {
    let parser = parser.context("failed to load tree-sitter-php language")?;

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            warn!(file = %path.display(), %err, "skipping unreadable file");
            return Ok(None);
        }
    };

    let parsed = match parser.parse_source(path, source) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(file = %path.display(), err = %format!("{err:#}"), "skipping unparsable file");
            return Ok(None);
        }
    };

    let metadata = collect_file_metadata(&parsed);
    Ok(Some((parsed, metadata)))
}

pub fn collect_php_files(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(if is_php_file(root) {
            vec![root.to_path_buf()]
        } else {
            vec![]
        });
    }

    let mut php_files = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if entry.file_type().is_file() && is_php_file(path) {
            php_files.push(path.to_path_buf());
        }
    }

    Ok(php_files)
}

/// Files under every root, sorted and without duplicates.
pub fn collect_php_files_from_roots(roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut php_files = Vec::new();
    for root in roots {
        php_files.extend(collect_php_files(root)?);
    }
    php_files.sort();
    php_files.dedup();
    Ok(php_files)
}

pub fn is_php_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("php"))
}
