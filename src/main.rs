use php_compat::analyzer;
use php_compat::analyzer::{config::AnalyzerConfig, is_php_file};
use serde::Serialize;
use serde_json::to_writer_pretty;
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
}

/// Entry point for the PHP compatibility checker CLI.
#[derive(Parser)]
#[command(
    author,
    version,
    about = "Reports PHP functions and parameters that are missing, deprecated or removed in the supported PHP versions."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// Log per-file and table loading details to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a PHP file or directory.
    Analyse {
        /// Path to a PHP file or directory containing PHP files.
        path: PathBuf,
        /// Supported PHP versions, e.g. "7.4", "5.6-8.0" or "7.0-".
        #[arg(long, value_name = "RANGE")]
        php_version: Option<String>,
        /// Choose the CLI output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Run once, then keep watching for PHP file changes.
    Watch {
        /// Path to a PHP file or directory containing PHP files.
        path: PathBuf,
        /// Supported PHP versions, e.g. "7.4", "5.6-8.0" or "7.0-".
        #[arg(long, value_name = "RANGE")]
        php_version: Option<String>,
        /// Choose the CLI output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

struct AnalysisTargets {
    canonical_targets: Vec<PathBuf>,
    analysis_root: PathBuf,
    config: AnalyzerConfig,
}

impl AnalysisTargets {
    fn new(path: &Path, config_path: Option<PathBuf>, php_version: Option<String>) -> Result<Self> {
        let canonical_targets = resolve_targets(path)?;
        let analysis_root = common_root(&canonical_targets);

        let config = match AnalyzerConfig::find_config(config_path, &analysis_root) {
            Some(path) => AnalyzerConfig::load(path)?,
            None => AnalyzerConfig::default(),
        };

        Ok(Self {
            canonical_targets,
            analysis_root,
            config: config.with_php_version(php_version),
        })
    }

    fn canonical_targets(&self) -> &[PathBuf] {
        &self.canonical_targets
    }

    fn analysis_root(&self) -> &Path {
        &self.analysis_root
    }

    fn build_analyzer(&self) -> Result<analyzer::Analyzer> {
        let analyzer = analyzer::Analyzer::new(Some(self.config.clone()))?;
        if analyzer.versions().is_inert() {
            warn!("no PHP version range configured; set php_version or pass --php-version");
        }
        Ok(analyzer)
    }

    fn collect_php_files(&self) -> Result<Vec<PathBuf>> {
        analyzer::collect_php_files_from_roots(&self.canonical_targets)
    }
}

fn main() -> Result<ExitCode> {
    let Cli {
        command,
        config,
        verbose,
    } = Cli::parse();
    init_tracing(verbose);

    match command {
        Commands::Analyse {
            path,
            php_version,
            format,
        } => {
            let errors = run_analysis(path, config, php_version, format)?;
            Ok(if errors > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::Watch {
            path,
            php_version,
            format,
        } => {
            run_watch_mode(path, config, php_version, format)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "php_compat=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Diagnostics of one run plus what the summary line needs.
struct Report {
    diagnostics: Vec<analyzer::Diagnostic>,
    files: usize,
    duration: Duration,
}

impl Report {
    fn count(&self, severity: analyzer::Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == severity)
            .count()
    }

    fn errors(&self) -> usize {
        self.count(analyzer::Severity::Error)
    }

    /// Text output skips the diagnostics themselves when the progress bar
    /// already printed them.
    fn print(&self, format: OutputFormat, streamed: bool) -> Result<()> {
        let errors = self.errors();
        let warnings = self.count(analyzer::Severity::Warning);

        match format {
            OutputFormat::Text => {
                if self.diagnostics.is_empty() {
                    println!(
                        "Analysis complete ▸ {} PHP file(s), no compatibility issues found.",
                        self.files
                    );
                } else if !streamed {
                    for diag in &self.diagnostics {
                        println!("{diag}");
                    }
                }
                println!(
                    "Stats ▸ {} file(s) | {errors} error(s), {warnings} warning(s) | {:.2}s",
                    self.files,
                    self.duration.as_secs_f64(),
                );
            }
            OutputFormat::Json => {
                let output = JsonOutput {
                    diagnostics: self.diagnostics.iter().map(|diag| diag.to_json()).collect(),
                    stats: JsonStats {
                        files: self.files,
                        errors,
                        warnings,
                        duration_seconds: self.duration.as_secs_f64(),
                    },
                };
                let mut stdout = io::stdout().lock();
                to_writer_pretty(&mut stdout, &output)?;
                stdout.write_all(b"\n")?;
            }
        }
        Ok(())
    }
}

/// Returns the number of errors reported.
fn run_analysis(
    path: PathBuf,
    config_path: Option<PathBuf>,
    php_version: Option<String>,
    format: OutputFormat,
) -> Result<usize> {
    let targets = AnalysisTargets::new(&path, config_path, php_version)?;
    let analyzer = targets.build_analyzer()?;
    let php_files = targets.collect_php_files()?;

    if php_files.is_empty() {
        eprintln!(
            "No PHP files found under {}",
            targets.analysis_root().display()
        );
        return Ok(0);
    }

    let text = matches!(format, OutputFormat::Text);
    if text {
        println!(
            "Checking {} file(s) against PHP {}...",
            php_files.len(),
            analyzer.versions()
        );
    }

    let progress = if text {
        Some(progress_bar(php_files.len())?)
    } else {
        None
    };
    let report = analyse(&analyzer, &php_files, progress)?;
    report.print(format, text)?;
    Ok(report.errors())
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let style = ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
        .context("invalid progress bar template")?
        .progress_chars("#>-");
    Ok(ProgressBar::new(len as u64).with_style(style))
}

fn analyse(
    analyzer: &analyzer::Analyzer,
    paths: &[PathBuf],
    progress: Option<ProgressBar>,
) -> Result<Report> {
    let start = Instant::now();
    let diagnostics = analyzer.analyse_files_with_progress(paths, progress.as_ref())?;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    Ok(Report {
        diagnostics,
        files: paths.len(),
        duration: start.elapsed(),
    })
}

fn run_watch_mode(
    path: PathBuf,
    config: Option<PathBuf>,
    php_version: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    run_analysis(path.clone(), config.clone(), php_version.clone(), format)?;

    let targets = AnalysisTargets::new(&path, config, php_version)?;
    let analyzer = targets.build_analyzer()?;
    let (tx, rx) = channel::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        Config::default(),
    )
    .context("failed to initialize file watcher")?;

    for target in targets.canonical_targets() {
        let mode = if target.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(target, mode)
            .with_context(|| format!("failed to watch {}", target.display()))?;
    }

    println!("Watching for changes (Ctrl+C to exit)...");
    for event in rx {
        match event {
            Ok(event) => reanalyse_changed(event, &analyzer, &targets, format)?,
            Err(err) => warn!(%err, "watch error"),
        }
    }

    Err(anyhow!("file watch channel closed"))
}

/// Re-analyses the whole target set so cross-file declarations stay visible,
/// then reports only the PHP files named in `event`.
fn reanalyse_changed(
    event: Event,
    analyzer: &analyzer::Analyzer,
    targets: &AnalysisTargets,
    format: OutputFormat,
) -> Result<()> {
    let changed: BTreeSet<PathBuf> = event
        .paths
        .iter()
        .filter(|path| is_php_file(path))
        .filter_map(|path| path.canonicalize().ok())
        .filter(|path| path.is_file())
        .collect();

    if changed.is_empty() {
        return Ok(());
    }

    println!("Detected {} PHP file(s) changed:", changed.len());
    for file in &changed {
        println!("  {}", file.display());
    }

    let mut report = analyse(analyzer, &targets.collect_php_files()?, None)?;
    report.diagnostics.retain(|diag| changed.contains(&diag.file));
    report.files = changed.len();
    report.print(format, false)
}

/// Expands `path` when it is a glob pattern, then canonicalizes and dedups
/// every target.
fn resolve_targets(path: &Path) -> Result<Vec<PathBuf>> {
    let pattern = path.to_string_lossy();
    let requested = if pattern.contains(['*', '?', '[', '{']) {
        let matches = glob(&pattern)
            .with_context(|| format!("invalid glob pattern \"{pattern}\""))?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("failed to expand \"{pattern}\""))?;
        if matches.is_empty() {
            bail!("no files matched \"{pattern}\"");
        }
        matches
    } else {
        vec![path.to_path_buf()]
    };

    let mut targets = requested
        .iter()
        .map(|target| {
            target
                .canonicalize()
                .with_context(|| format!("failed to access {}", target.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    targets.sort();
    targets.dedup();
    Ok(targets)
}

/// Deepest directory containing every target; config discovery starts here.
fn common_root(targets: &[PathBuf]) -> PathBuf {
    targets
        .iter()
        .map(|target| match target.parent() {
            Some(parent) if target.is_file() => parent.to_path_buf(),
            _ => target.clone(),
        })
        .reduce(|shared, dir| {
            shared
                .components()
                .zip(dir.components())
                .take_while(|(a, b)| a == b)
                .map(|(component, _)| component)
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Serialize)]
struct JsonStats {
    files: usize,
    errors: usize,
    warnings: usize,
    duration_seconds: f64,
}

#[derive(Serialize)]
struct JsonOutput {
    diagnostics: Vec<analyzer::DiagnosticJson>,
    stats: JsonStats,
}
