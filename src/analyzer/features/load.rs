use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{
    FeatureRecord, FeatureTable, FeatureTables, LifecycleStatus, ParameterTable, TableError,
    TableKind,
};
use crate::analyzer::version::{Version, compare, is_version_key};

/// A table value as written in YAML.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(super) enum RawValue {
    Flag(bool),
    Text(String),
}

type RawRecord = BTreeMap<String, RawValue>;
type RawFunctionSection = BTreeMap<String, RawRecord>;
type RawParameterSection = BTreeMap<String, BTreeMap<u32, RawRecord>>;

/// A table file with one optional section per rule family.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TableBundle {
    new_functions: RawFunctionSection,
    removed_functions: RawFunctionSection,
    new_parameters: RawParameterSection,
    removed_parameters: RawParameterSection,
    required_to_optional: RawParameterSection,
    optional_to_required: RawParameterSection,
}

pub(super) fn merge_bundle(
    tables: &mut FeatureTables,
    yaml: &str,
    origin: &str,
) -> Result<(), TableError> {
    let bundle: TableBundle = parse(yaml, origin)?;

    fill_function_table(&mut tables.new_functions, bundle.new_functions, origin);
    fill_function_table(&mut tables.removed_functions, bundle.removed_functions, origin);
    fill_parameter_table(&mut tables.new_parameters, bundle.new_parameters, origin)?;
    fill_parameter_table(&mut tables.removed_parameters, bundle.removed_parameters, origin)?;
    fill_parameter_table(
        &mut tables.required_to_optional,
        bundle.required_to_optional,
        origin,
    )?;
    fill_parameter_table(
        &mut tables.optional_to_required,
        bundle.optional_to_required,
        origin,
    )?;

    Ok(())
}

pub(super) fn merge_function_section(
    table: &mut FeatureTable,
    yaml: &str,
    origin: &str,
) -> Result<(), TableError> {
    let section: RawFunctionSection = parse(yaml, origin)?;
    fill_function_table(table, section, origin);
    Ok(())
}

pub(super) fn merge_parameter_section(
    table: &mut ParameterTable,
    yaml: &str,
    origin: &str,
) -> Result<(), TableError> {
    let section: RawParameterSection = parse(yaml, origin)?;
    fill_parameter_table(table, section, origin)
}

fn parse<T: DeserializeOwned + Default>(yaml: &str, origin: &str) -> Result<T, TableError> {
    // An empty document deserializes to `null`, which the section maps reject.
    if yaml.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    }) {
        return Ok(T::default());
    }

    serde_yaml::from_str(yaml).map_err(|source| TableError::Parse {
        origin: origin.to_owned(),
        source,
    })
}

fn fill_function_table(table: &mut FeatureTable, section: RawFunctionSection, origin: &str) {
    let count = section.len();
    for (symbol, raw) in section {
        let record = build_record(&symbol, raw, table.kind(), origin);
        table.insert(record);
    }
    debug!(origin, count, kind = ?table.kind(), "loaded function records");
}

fn fill_parameter_table(
    table: &mut ParameterTable,
    section: RawParameterSection,
    origin: &str,
) -> Result<(), TableError> {
    let count = section.len();
    for (function, offsets) in section {
        for (raw_offset, raw) in offsets {
            let offset = table.basis().to_zero_based(raw_offset).ok_or_else(|| {
                TableError::InvalidOffset {
                    origin: origin.to_owned(),
                    function: function.clone(),
                    offset: raw_offset,
                }
            })?;

            let label = format!("{function}#{raw_offset}");
            let record = build_record(&label, raw, table.kind(), origin);
            if record.parameter_name().is_none() {
                warn!(origin, record = %label, "parameter record has no name; named arguments cannot match it");
            }
            table.insert(&function, offset, record);
        }
    }
    debug!(origin, count, kind = ?table.kind(), "loaded parameter records");
    Ok(())
}

/// Splits a raw record into version keys and metadata keys.
fn build_record(key: &str, raw: RawRecord, kind: TableKind, origin: &str) -> FeatureRecord {
    let mut versions = Vec::new();
    let mut metadata = BTreeMap::new();

    for (raw_key, value) in raw {
        if !is_version_key(&raw_key) {
            let text = match value {
                RawValue::Text(text) => text,
                RawValue::Flag(flag) => flag.to_string(),
            };
            metadata.insert(raw_key, text);
            continue;
        }

        let Ok(version) = Version::parse(&raw_key) else {
            warn!(origin, record = key, version = %raw_key, "version key out of range; ignoring");
            continue;
        };

        let status = match &value {
            RawValue::Flag(flag) => Some(kind.status_for_flag(*flag)),
            RawValue::Text(text) => kind.status_for_text(text),
        };

        match status {
            Some(status) => versions.push((version, status)),
            None => {
                warn!(origin, record = key, version = %raw_key, value = ?value, "unsupported table value; ignoring");
            }
        }
    }

    let record = FeatureRecord::new(key, versions, metadata);
    check_ordering(&record, origin);
    record
}

/// Logs records whose thresholds contradict each other. They are kept; the
/// extractor resolves them conservatively.
fn check_ordering(record: &FeatureRecord, origin: &str) {
    let first = |wanted: LifecycleStatus| {
        record
            .versions()
            .iter()
            .find(|(_, status)| *status == wanted)
            .map(|(version, _)| version)
    };

    if let (Some(deprecated), Some(removed)) =
        (first(LifecycleStatus::Deprecated), first(LifecycleStatus::Removed))
    {
        if compare(deprecated, removed).is_ge() {
            warn!(
                origin,
                record = record.key(),
                %deprecated,
                %removed,
                "deprecation does not precede removal"
            );
        }
    }

    if let (Some(present), Some(absent)) = (
        first(LifecycleStatus::Present),
        record
            .versions()
            .iter()
            .rev()
            .find(|(_, status)| *status == LifecycleStatus::NotYetPresent)
            .map(|(version, _)| version),
    ) {
        if present.branch() == absent.branch() && compare(present, absent).is_le() {
            warn!(
                origin,
                record = record.key(),
                %present,
                %absent,
                "feature is marked present before it is marked absent"
            );
        }
    }
}
