//! Resolves which lifecycle thresholds of a record a configured range crosses.
//!
//! The extractor never compares versions against the range itself; it only
//! asks the two [`VersionRange`] predicates.

use std::collections::BTreeMap;

use super::{FeatureRecord, LifecycleStatus};
use crate::analyzer::version::{Version, VersionRange, compare};

/// Range-independent view of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifecycle<'a> {
    pub introduced_at: Option<&'a Version>,
    pub deprecated_at: Option<&'a Version>,
    pub removed_at: Option<&'a Version>,
    pub required_at: Option<&'a Version>,
    pub optional_at: Option<&'a Version>,
    pub recommended_at: Option<&'a Version>,
    pub auxiliary: &'a BTreeMap<String, String>,
}

pub fn extract_lifecycle(record: &FeatureRecord) -> Lifecycle<'_> {
    Lifecycle {
        introduced_at: first_with(record, LifecycleStatus::Present),
        deprecated_at: first_with(record, LifecycleStatus::Deprecated),
        removed_at: first_with(record, LifecycleStatus::Removed),
        required_at: first_with(record, LifecycleStatus::Required),
        optional_at: first_with(record, LifecycleStatus::Optional),
        recommended_at: first_with(record, LifecycleStatus::Recommended),
        auxiliary: record.metadata(),
    }
}

/// The range reaches a version where an introduced feature is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroductionGap<'a> {
    /// The table names the latest version without the feature.
    AbsentIn {
        version: &'a Version,
        /// First version after `version` that has the feature.
        introduced_in: Option<&'a Version>,
    },
    /// Only the introducing version is known; everything before it lacks the
    /// feature.
    Before(&'a Version),
}

impl<'a> IntroductionGap<'a> {
    pub fn absent_in(&self) -> Option<&'a Version> {
        match *self {
            Self::AbsentIn { version, .. } => Some(version),
            Self::Before(_) => None,
        }
    }

    pub fn introduced_in(&self) -> Option<&'a Version> {
        match *self {
            Self::AbsentIn { introduced_in, .. } => introduced_in,
            Self::Before(version) => Some(version),
        }
    }
}

/// Finds the latest absence window the range reaches.
///
/// Every `NotYetPresent` key opens an absence window that ends at the key. A
/// `Present` key not directly preceded by a `NotYetPresent` one opens a window
/// ending just below it. When an earlier key already says `Present` the
/// feature exists on an older release line, so the window only starts at the
/// key's own `major.minor` branch; otherwise it is open downwards. Literal key
/// order does not matter.
pub fn resolve_introduction<'a>(
    record: &'a FeatureRecord,
    range: &VersionRange,
) -> Option<IntroductionGap<'a>> {
    let versions = record.versions();
    let present_before = |version: &Version| {
        versions.iter().any(|(other, status)| {
            *status == LifecycleStatus::Present && compare(other, version).is_lt()
        })
    };
    let window_reached = |ceiling: &Version, branch_of: &Version| {
        (!present_before(branch_of) || range.should_flag_if_at_or_above(&branch_of.branch()))
            && range.should_flag_if_below_or_at(ceiling)
    };

    let explicit = versions
        .iter()
        .filter(|(_, status)| *status == LifecycleStatus::NotYetPresent)
        .map(|(version, _)| version)
        .filter(|absent| window_reached(*absent, *absent))
        .map(|absent| {
            let introduced_in = versions
                .iter()
                .filter(|(version, status)| {
                    *status == LifecycleStatus::Present && compare(version, absent).is_gt()
                })
                .map(|(version, _)| version)
                .min_by(|a, b| compare(a, b));
            (
                absent.clone(),
                IntroductionGap::AbsentIn {
                    version: absent,
                    introduced_in,
                },
            )
        });

    let implicit = versions
        .iter()
        .enumerate()
        .filter(|(idx, (_, status))| {
            *status == LifecycleStatus::Present
                && idx
                    .checked_sub(1)
                    .is_none_or(|prev| versions[prev].1 != LifecycleStatus::NotYetPresent)
        })
        .filter_map(|(_, (present, _))| {
            // A branch that opens with the feature has no gap of its own.
            if present_before(present) && compare(present, &present.branch()).is_eq() {
                return None;
            }
            let ceiling = present.predecessor()?;
            window_reached(&ceiling, present).then_some((ceiling, IntroductionGap::Before(present)))
        });

    explicit
        .chain(implicit)
        .max_by(|(a, _), (b, _)| compare(a, b))
        .map(|(_, gap)| gap)
}

/// Deprecation and removal thresholds the range reaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalHit<'a> {
    pub deprecated_in: Option<&'a Version>,
    pub removed_in: Option<&'a Version>,
}

impl RemovalHit<'_> {
    pub fn is_removal(&self) -> bool {
        self.removed_in.is_some()
    }
}

pub fn resolve_removal<'a>(
    record: &'a FeatureRecord,
    range: &VersionRange,
) -> Option<RemovalHit<'a>> {
    let lifecycle = extract_lifecycle(record);
    let mut deprecated_in = lifecycle
        .deprecated_at
        .filter(|version| range.should_flag_if_at_or_above(version));
    let removed_in = lifecycle
        .removed_at
        .filter(|version| range.should_flag_if_at_or_above(version));

    // A deprecation that does not precede the removal is a data defect; the
    // removal alone is reported.
    if let (Some(deprecated), Some(removed)) = (deprecated_in, removed_in) {
        if compare(deprecated, removed).is_ge() {
            deprecated_in = None;
        }
    }

    if deprecated_in.is_none() && removed_in.is_none() {
        return None;
    }

    Some(RemovalHit {
        deprecated_in,
        removed_in,
    })
}

/// A missing-argument finding for the parameter-arity families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArityHit<'a> {
    /// Required up to and including this version.
    StillRequired(&'a Version),
    /// Required since this version.
    HardRequired(&'a Version),
    /// Omitting it is deprecated since this version.
    SoftRequired(&'a Version),
    /// Passing it is strongly recommended since this version.
    Recommended(&'a Version),
}

/// Latest version the parameter was still required in that the range reaches.
pub fn resolve_required_to_optional<'a>(
    record: &'a FeatureRecord,
    range: &VersionRange,
) -> Option<ArityHit<'a>> {
    record
        .versions()
        .iter()
        .filter(|(_, status)| *status == LifecycleStatus::Required)
        .map(|(version, _)| version)
        .filter(|version| range.should_flag_if_below_or_at(version))
        .max_by(|a, b| compare(a, b))
        .map(ArityHit::StillRequired)
}

/// Resolves the required, deprecated-omission and recommended thresholds
/// independently; the strongest one the range reaches wins.
pub fn resolve_optional_to_required<'a>(
    record: &'a FeatureRecord,
    range: &VersionRange,
) -> Option<ArityHit<'a>> {
    let reached = |wanted: LifecycleStatus| {
        record
            .versions()
            .iter()
            .filter(|(_, status)| *status == wanted)
            .map(|(version, _)| version)
            .find(|version| range.should_flag_if_at_or_above(version))
    };

    reached(LifecycleStatus::Required)
        .map(ArityHit::HardRequired)
        .or_else(|| reached(LifecycleStatus::Deprecated).map(ArityHit::SoftRequired))
        .or_else(|| reached(LifecycleStatus::Recommended).map(ArityHit::Recommended))
}

fn first_with(record: &FeatureRecord, wanted: LifecycleStatus) -> Option<&Version> {
    record
        .versions()
        .iter()
        .find(|(_, status)| *status == wanted)
        .map(|(version, _)| version)
}
