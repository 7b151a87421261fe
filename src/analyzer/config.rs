use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use super::features::FeatureTables;
use super::version::VersionRange;

/// Rule toggles, the supported PHP version range and extra feature tables.
#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Range in test-version notation, e.g. `5.6-8.0`.
    #[serde(alias = "testVersion", alias = "test_version")]
    pub php_version: Option<String>,
    #[serde(default)]
    pub rules: HashMap<String, bool>,
    /// Table files merged over the built-in tables, relative to the config file.
    #[serde(default)]
    pub tables: Vec<PathBuf>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl AnalyzerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        debug!(config = %path.display(), php_version = ?config.php_version, "loaded config");
        Ok(config)
    }

    pub fn enabled(&self, rule_name: &str) -> bool {
        let mut candidate = rule_name;
        loop {
            if let Some(enabled) = self.rules.get(candidate) {
                return *enabled;
            }

            if let Some(idx) = candidate.rfind('/') {
                candidate = &candidate[..idx];
                continue;
            }

            break;
        }

        true
    }

    pub fn find_config(path: Option<PathBuf>, root: &Path) -> Option<PathBuf> {
        if let Some(path) = path {
            return Some(path);
        }

        let candidates = ["php_compat.yaml", "php_compat.yml"];
        for candidate in &candidates {
            let candidate_path = root.join(candidate);
            if candidate_path.is_file() {
                return Some(candidate_path);
            }
        }

        None
    }

    /// Replaces the configured range when `notation` is set.
    pub fn with_php_version(mut self, notation: Option<String>) -> Self {
        if notation.is_some() {
            self.php_version = notation;
        }
        self
    }

    /// The configured range; unset means inert.
    pub fn version_range(&self) -> Result<VersionRange> {
        match self.php_version.as_deref().map(str::trim) {
            None | Some("") => Ok(VersionRange::default()),
            Some(notation) => VersionRange::parse(notation)
                .with_context(|| format!("invalid php_version \"{notation}\"")),
        }
    }

    pub fn table_paths(&self) -> Vec<PathBuf> {
        self.tables
            .iter()
            .map(|path| match &self.base_dir {
                Some(base) if path.is_relative() => base.join(path),
                _ => path.clone(),
            })
            .collect()
    }

    /// Built-in tables with the configured table files merged over them, in order.
    pub fn feature_tables(&self) -> Result<FeatureTables> {
        let mut tables = FeatureTables::builtin().context("failed to load built-in feature tables")?;
        for path in self.table_paths() {
            tables
                .merge_file(&path)
                .with_context(|| format!("failed to merge feature table {}", path.display()))?;
        }
        Ok(tables)
    }
}
