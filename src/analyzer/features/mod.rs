//! Version-indexed knowledge base describing when PHP features appeared,
//! were deprecated or removed.
//!
//! Tables are built once from YAML (the embedded built-ins plus any extra
//! files named in the configuration) and are immutable afterwards. Raw keys
//! are split into version keys and metadata keys at build time; lookups never
//! re-inspect them.

mod builtin;
pub mod extract;
mod load;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use thiserror::Error;

use super::version::Version;

pub use extract::{
    ArityHit, IntroductionGap, Lifecycle, RemovalHit, extract_lifecycle, resolve_introduction,
    resolve_optional_to_required, resolve_removal, resolve_required_to_optional,
};

/// Metadata key holding a parameter's display name.
pub const NAME_KEY: &str = "name";
/// Metadata key holding the suggested replacement.
pub const ALTERNATIVE_KEY: &str = "alternative";
/// Raw table value marking a parameter as strongly recommended.
pub const RECOMMENDED_VALUE: &str = "recommended";

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to parse feature table {origin}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to read feature table {origin}")]
    Read {
        origin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{origin}: parameter offset {offset} of {function}() is not valid for a one-based table")]
    InvalidOffset {
        origin: String,
        function: String,
        offset: u32,
    },
}

/// Where a symbol stands at a given version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStatus {
    NotYetPresent,
    Present,
    Deprecated,
    Removed,
    Required,
    Optional,
    Recommended,
}

/// The rule family a table belongs to; decides how raw values map to statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// `false` = not yet present, `true` = present.
    Introduction,
    /// `false` = deprecated, `true` = removed.
    Removal,
    /// `true` = still required, `false` = optional.
    RequiredToOptional,
    /// `false` = omission deprecated, `true` = required, `recommended`.
    OptionalToRequired,
}

impl TableKind {
    fn status_for_flag(self, flag: bool) -> LifecycleStatus {
        match (self, flag) {
            (Self::Introduction, false) => LifecycleStatus::NotYetPresent,
            (Self::Introduction, true) => LifecycleStatus::Present,
            (Self::Removal, false) => LifecycleStatus::Deprecated,
            (Self::Removal, true) => LifecycleStatus::Removed,
            (Self::RequiredToOptional, true) => LifecycleStatus::Required,
            (Self::RequiredToOptional, false) => LifecycleStatus::Optional,
            (Self::OptionalToRequired, true) => LifecycleStatus::Required,
            (Self::OptionalToRequired, false) => LifecycleStatus::Deprecated,
        }
    }

    fn status_for_text(self, text: &str) -> Option<LifecycleStatus> {
        match self {
            Self::OptionalToRequired if text.eq_ignore_ascii_case(RECOMMENDED_VALUE) => {
                Some(LifecycleStatus::Recommended)
            }
            _ => None,
        }
    }
}

/// One symbol (or one parameter of a symbol) with its version history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRecord {
    key: String,
    versions: Vec<(Version, LifecycleStatus)>,
    metadata: BTreeMap<String, String>,
}

impl FeatureRecord {
    pub fn new(
        key: impl Into<String>,
        mut versions: Vec<(Version, LifecycleStatus)>,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        versions.sort_by(|(a, _), (b, _)| a.cmp(b));
        Self {
            key: key.into(),
            versions,
            metadata,
        }
    }

    /// The symbol as spelled in the table.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Version keys in ascending order.
    pub fn versions(&self) -> &[(Version, LifecycleStatus)] {
        &self.versions
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn alternative(&self) -> Option<&str> {
        self.metadata_value(ALTERNATIVE_KEY)
    }

    pub fn parameter_name(&self) -> Option<&str> {
        self.metadata_value(NAME_KEY)
    }
}

/// Symbol-keyed records with a case-insensitive lookup index.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    kind: TableKind,
    records: Vec<FeatureRecord>,
    index: HashMap<String, usize>,
}

impl FeatureTable {
    pub fn new(kind: TableKind) -> Self {
        Self {
            kind,
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    /// Adds a record, replacing any record for the same symbol.
    pub fn insert(&mut self, record: FeatureRecord) {
        let normalized = record.key().to_ascii_lowercase();
        match self.index.get(&normalized) {
            Some(&idx) => self.records[idx] = record,
            None => {
                self.index.insert(normalized, self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn lookup(&self, symbol: &str) -> Option<&FeatureRecord> {
        self.index
            .get(&symbol.to_ascii_lowercase())
            .map(|&idx| &self.records[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// How the offsets of a parameter table were authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetBasis {
    Zero,
    One,
}

impl OffsetBasis {
    pub fn to_zero_based(self, offset: u32) -> Option<usize> {
        match self {
            Self::Zero => Some(offset as usize),
            Self::One => offset.checked_sub(1).map(|offset| offset as usize),
        }
    }
}

/// The tracked parameters of a single function, keyed by zero-based offset.
#[derive(Debug, Clone)]
pub struct ParameterSet {
    function: String,
    parameters: BTreeMap<usize, FeatureRecord>,
}

impl ParameterSet {
    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn parameters(&self) -> impl Iterator<Item = (usize, &FeatureRecord)> {
        self.parameters.iter().map(|(offset, record)| (*offset, record))
    }

    pub fn get(&self, offset: usize) -> Option<&FeatureRecord> {
        self.parameters.get(&offset)
    }

    /// Resolves a named argument to the offset of the parameter it names.
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.parameters
            .iter()
            .find(|(_, record)| record.parameter_name() == Some(name))
            .map(|(offset, _)| *offset)
    }
}

/// Function-keyed parameter records. Offsets are stored zero-based whatever the
/// basis the table was authored with.
#[derive(Debug, Clone)]
pub struct ParameterTable {
    kind: TableKind,
    basis: OffsetBasis,
    functions: Vec<ParameterSet>,
    index: HashMap<String, usize>,
}

impl ParameterTable {
    pub fn new(kind: TableKind, basis: OffsetBasis) -> Self {
        Self {
            kind,
            basis,
            functions: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn basis(&self) -> OffsetBasis {
        self.basis
    }

    /// Adds a parameter record at a zero-based offset.
    pub fn insert(&mut self, function: &str, offset: usize, record: FeatureRecord) {
        let normalized = function.to_ascii_lowercase();
        let idx = match self.index.get(&normalized) {
            Some(&idx) => idx,
            None => {
                self.index.insert(normalized, self.functions.len());
                self.functions.push(ParameterSet {
                    function: function.to_owned(),
                    parameters: BTreeMap::new(),
                });
                self.functions.len() - 1
            }
        };
        self.functions[idx].parameters.insert(offset, record);
    }

    pub fn lookup(&self, symbol: &str) -> Option<&ParameterSet> {
        self.index
            .get(&symbol.to_ascii_lowercase())
            .map(|&idx| &self.functions[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterSet> {
        self.functions.iter()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Every table the rule families consume.
#[derive(Debug, Clone)]
pub struct FeatureTables {
    pub new_functions: FeatureTable,
    pub removed_functions: FeatureTable,
    pub new_parameters: ParameterTable,
    pub removed_parameters: ParameterTable,
    pub required_to_optional: ParameterTable,
    pub optional_to_required: ParameterTable,
}

impl FeatureTables {
    pub fn empty() -> Self {
        Self {
            new_functions: FeatureTable::new(TableKind::Introduction),
            removed_functions: FeatureTable::new(TableKind::Removal),
            new_parameters: ParameterTable::new(TableKind::Introduction, OffsetBasis::Zero),
            removed_parameters: ParameterTable::new(TableKind::Removal, OffsetBasis::Zero),
            required_to_optional: ParameterTable::new(
                TableKind::RequiredToOptional,
                OffsetBasis::One,
            ),
            optional_to_required: ParameterTable::new(
                TableKind::OptionalToRequired,
                OffsetBasis::One,
            ),
        }
    }

    /// The tables embedded in the binary.
    pub fn builtin() -> Result<Self, TableError> {
        let mut tables = Self::empty();
        builtin::fill(&mut tables)?;
        Ok(tables)
    }

    /// Merges a YAML bundle (one section per family) over the current tables.
    pub fn merge_bundle(&mut self, yaml: &str, origin: &str) -> Result<(), TableError> {
        load::merge_bundle(self, yaml, origin)
    }

    pub fn merge_file(&mut self, path: &Path) -> Result<(), TableError> {
        let origin = path.display().to_string();
        let yaml = fs::read_to_string(path).map_err(|source| TableError::Read {
            origin: origin.clone(),
            source,
        })?;
        self.merge_bundle(&yaml, &origin)
    }
}
