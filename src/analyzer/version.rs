//! PHP version identifiers and the supported-version range of an analysis run.
//!
//! Feature tables mix precision levels (`5.2` next to `5.2.4`), so two kinds of
//! comparison exist:
//!
//! * [`compare`] orders versions with missing components treated as zero. It is
//!   used to sort table keys and to order configured bounds against each other.
//! * [`compare_boundary`] only looks at the components both sides specify, so
//!   `5.2` encompasses `5.2.7`. Every range-membership check goes through it.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Lowest PHP version an open-ended range reaches down to.
pub const LOWEST_KNOWN_VERSION: &str = "4.0";
/// Highest PHP version an open-ended range reaches up to.
pub const HIGHEST_KNOWN_VERSION: &str = "99.9";

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+){0,2}$").unwrap());

/// Errors raised while building a [`VersionRange`] from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("invalid PHP version \"{0}\": expected major[.minor[.patch]]")]
    MalformedVersion(String),
    #[error("invalid PHP version range \"{0}\": expected e.g. \"7.4\", \"5.6-8.0\", \"7.0-\" or \"-5.6\"")]
    MalformedRange(String),
    #[error("minimum PHP version {minimum} is higher than maximum PHP version {maximum}")]
    InvertedRange { minimum: Version, maximum: Version },
}

/// A dotted numeric PHP version with one to three components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    parts: Vec<u32>,
}

impl Version {
    pub fn parse(text: &str) -> Result<Self, ConfigurationError> {
        let text = text.trim();
        if !is_version_key(text) {
            return Err(ConfigurationError::MalformedVersion(text.to_owned()));
        }

        let parts = text
            .split('.')
            .map(str::parse::<u32>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ConfigurationError::MalformedVersion(text.to_owned()))?;

        Ok(Self { parts })
    }

    pub fn major_minor(major: u32, minor: u32) -> Self {
        Self {
            parts: vec![major, minor],
        }
    }

    pub fn parts(&self) -> &[u32] {
        &self.parts
    }

    /// The closest coarser version strictly below this one, read as a boundary:
    /// `5.4.26` gives `5.4.25`, `5.6.0` gives `5.5` and `8.0` gives `7`.
    /// `None` for versions with nothing below them.
    pub fn predecessor(&self) -> Option<Self> {
        let last = self.parts.iter().rposition(|part| *part > 0)?;
        let mut parts = self.parts[..=last].to_vec();
        parts[last] -= 1;
        Some(Self { parts })
    }

    /// The `major.minor` release line this version belongs to.
    pub fn branch(&self) -> Self {
        Self {
            parts: self.parts.iter().copied().take(2).collect(),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, part) in self.parts.iter().enumerate() {
            if idx > 0 {
                write!(f, ".")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // `5.2` and `5.2.0` order equal under `compare`; the length tie-break keeps
        // `Ord` consistent with the structural `Eq`.
        compare(self, other).then_with(|| self.parts.len().cmp(&other.parts.len()))
    }
}

/// Returns `true` when `key` is shaped like a version (`7`, `7.4`, `7.4.1`).
pub fn is_version_key(key: &str) -> bool {
    VERSION_PATTERN.is_match(key)
}

/// Orders two versions treating missing trailing components as zero.
pub fn compare(a: &Version, b: &Version) -> Ordering {
    let len = a.parts.len().max(b.parts.len());
    for idx in 0..len {
        let left = a.parts.get(idx).copied().unwrap_or(0);
        let right = b.parts.get(idx).copied().unwrap_or(0);
        match left.cmp(&right) {
            Ordering::Equal => continue,
            ordering => return ordering,
        }
    }
    Ordering::Equal
}

/// Compares only the components both versions specify.
pub fn compare_boundary(a: &Version, b: &Version) -> Ordering {
    a.parts
        .iter()
        .zip(b.parts.iter())
        .map(|(left, right)| left.cmp(right))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

pub fn is_at_or_below(candidate: &Version, bound: &Version) -> bool {
    compare_boundary(candidate, bound) != Ordering::Greater
}

pub fn is_at_or_above(candidate: &Version, bound: &Version) -> bool {
    compare_boundary(candidate, bound) != Ordering::Less
}

/// The inclusive range of PHP versions the analysed code must stay compatible with.
///
/// A range with a single configured bound describes exactly that version: the
/// missing bound mirrors the one that is set. A range with no bound at all is
/// inert and never lets a version-gated rule fire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionRange {
    minimum: Option<Version>,
    maximum: Option<Version>,
}

impl VersionRange {
    pub fn new(
        minimum: Option<Version>,
        maximum: Option<Version>,
    ) -> Result<Self, ConfigurationError> {
        if let (Some(min), Some(max)) = (&minimum, &maximum) {
            if compare(min, max) == Ordering::Greater {
                return Err(ConfigurationError::InvertedRange {
                    minimum: min.clone(),
                    maximum: max.clone(),
                });
            }
        }

        Ok(Self { minimum, maximum })
    }

    pub fn single(version: Version) -> Self {
        Self {
            minimum: Some(version.clone()),
            maximum: Some(version),
        }
    }

    /// Parses test-version notation: `7.4`, `5.6-8.0`, `7.0-` or `-5.6`.
    pub fn parse(notation: &str) -> Result<Self, ConfigurationError> {
        let notation = notation.trim();
        if notation.is_empty() {
            return Err(ConfigurationError::MalformedRange(notation.to_owned()));
        }

        let Some((low, high)) = notation.split_once('-') else {
            return Ok(Self::single(Version::parse(notation)?));
        };

        let (low, high) = (low.trim(), high.trim());
        if low.is_empty() && high.is_empty() {
            return Err(ConfigurationError::MalformedRange(notation.to_owned()));
        }

        let minimum = Version::parse(if low.is_empty() { LOWEST_KNOWN_VERSION } else { low })?;
        let maximum = Version::parse(if high.is_empty() { HIGHEST_KNOWN_VERSION } else { high })?;
        Self::new(Some(minimum), Some(maximum))
    }

    pub fn minimum(&self) -> Option<&Version> {
        self.minimum.as_ref()
    }

    pub fn maximum(&self) -> Option<&Version> {
        self.maximum.as_ref()
    }

    pub fn is_inert(&self) -> bool {
        self.minimum.is_none() && self.maximum.is_none()
    }

    fn lower(&self) -> Option<&Version> {
        self.minimum.as_ref().or(self.maximum.as_ref())
    }

    fn upper(&self) -> Option<&Version> {
        self.maximum.as_ref().or(self.minimum.as_ref())
    }

    /// `true` when the range reaches down to `threshold`, i.e. the code must still
    /// run on a version at or below it.
    ///
    /// Consults the minimum. A range configured with only a maximum uses the
    /// maximum here instead, so a single bound describes exactly that version.
    pub fn should_flag_if_below_or_at(&self, threshold: &Version) -> bool {
        self.lower()
            .is_some_and(|lower| is_at_or_below(lower, threshold))
    }

    /// `true` when the range reaches up to `threshold`, i.e. the code may run on a
    /// version at or above it.
    ///
    /// Consults the maximum, or the minimum when no maximum is configured.
    pub fn should_flag_if_at_or_above(&self, threshold: &Version) -> bool {
        self.upper()
            .is_some_and(|upper| is_at_or_above(upper, threshold))
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.minimum, &self.maximum) {
            (None, None) => write!(f, "unset"),
            (Some(min), Some(max)) if min == max => write!(f, "{min}"),
            (Some(min), Some(max)) => write!(f, "{min}-{max}"),
            (Some(min), None) => write!(f, "{min}"),
            (None, Some(max)) => write!(f, "{max}"),
        }
    }
}

impl FromStr for VersionRange {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    #[test]
    fn parses_one_to_three_components() {
        assert_eq!(v("7").parts(), &[7]);
        assert_eq!(v("7.4").parts(), &[7, 4]);
        assert_eq!(v(" 5.2.17 ").parts(), &[5, 2, 17]);
    }

    #[test]
    fn rejects_malformed_versions() {
        for text in ["", "7.x", "7.4.1.2", "v8", "8.", ".8", "name"] {
            assert!(
                matches!(Version::parse(text), Err(ConfigurationError::MalformedVersion(_))),
                "{text} should be rejected"
            );
        }
    }

    #[test]
    fn ordering_fills_missing_components_with_zero() {
        assert_eq!(compare(&v("5.2"), &v("5.2.0")), Ordering::Equal);
        assert_eq!(compare(&v("5.2"), &v("5.2.4")), Ordering::Less);
        assert_eq!(compare(&v("5.10"), &v("5.9")), Ordering::Greater);
        assert!(v("7.4") < v("8"));
    }

    #[test]
    fn boundary_comparison_treats_missing_components_as_wildcards() {
        assert_eq!(compare_boundary(&v("5.2"), &v("5.2.7")), Ordering::Equal);
        assert_eq!(compare_boundary(&v("5.2.7"), &v("5.2")), Ordering::Equal);
        assert_eq!(compare_boundary(&v("5.3"), &v("5.2.7")), Ordering::Greater);
        assert!(is_at_or_below(&v("5.2"), &v("5.2.4")));
        assert!(is_at_or_above(&v("8.0"), &v("8.0.5")));
        assert!(!is_at_or_above(&v("7.4"), &v("8.0")));
    }

    #[test]
    fn parses_range_notation() {
        let range = VersionRange::parse("5.6-8.0").unwrap();
        assert_eq!(range.minimum(), Some(&v("5.6")));
        assert_eq!(range.maximum(), Some(&v("8.0")));

        let single = VersionRange::parse("7.4").unwrap();
        assert_eq!(single.minimum(), single.maximum());

        let open_up = VersionRange::parse("7.0-").unwrap();
        assert_eq!(open_up.maximum(), Some(&v(HIGHEST_KNOWN_VERSION)));

        let open_down = VersionRange::parse("-5.6").unwrap();
        assert_eq!(open_down.minimum(), Some(&v(LOWEST_KNOWN_VERSION)));
    }

    #[test]
    fn rejects_bad_ranges_at_construction() {
        assert!(matches!(
            VersionRange::parse("8.0-7.0"),
            Err(ConfigurationError::InvertedRange { .. })
        ));
        assert!(matches!(
            VersionRange::parse("-"),
            Err(ConfigurationError::MalformedRange(_))
        ));
        assert!(matches!(
            VersionRange::parse("7.x-8.0"),
            Err(ConfigurationError::MalformedVersion(_))
        ));
    }

    #[test]
    fn inert_range_never_flags() {
        let range = VersionRange::default();
        assert!(range.is_inert());
        assert!(!range.should_flag_if_below_or_at(&v("99.9")));
        assert!(!range.should_flag_if_at_or_above(&v("4.0")));
    }

    #[test]
    fn predicates_consult_the_matching_bound() {
        let range = VersionRange::parse("7.0-7.4").unwrap();
        assert!(range.should_flag_if_below_or_at(&v("7.0")));
        assert!(!range.should_flag_if_below_or_at(&v("5.6")));
        assert!(range.should_flag_if_at_or_above(&v("7.4")));
        assert!(!range.should_flag_if_at_or_above(&v("8.0")));
    }

    #[test]
    fn single_bound_mirrors_onto_the_other_side() {
        let max_only = VersionRange::new(None, Some(v("7.3"))).unwrap();
        assert!(max_only.should_flag_if_at_or_above(&v("7.2")));
        assert!(max_only.should_flag_if_below_or_at(&v("7.3")));
        assert!(!max_only.should_flag_if_below_or_at(&v("7.2")));

        let min_only = VersionRange::new(Some(v("8.0")), None).unwrap();
        assert!(min_only.should_flag_if_at_or_above(&v("8.0")));
        assert!(!min_only.should_flag_if_at_or_above(&v("8.1")));
        assert!(min_only.should_flag_if_below_or_at(&v("8.0")));
        assert!(!min_only.should_flag_if_below_or_at(&v("7.4")));
    }

    #[test]
    fn predecessor_drops_to_the_closest_lower_boundary() {
        assert_eq!(v("5.4.26").predecessor(), Some(v("5.4.25")));
        assert_eq!(v("5.6.0").predecessor(), Some(v("5.5")));
        assert_eq!(v("8.0").predecessor(), Some(v("7")));
        assert_eq!(v("0.0").predecessor(), None);
    }

    #[test]
    fn patch_level_thresholds_match_minor_level_bounds() {
        let range = VersionRange::parse("5.2").unwrap();
        assert!(range.should_flag_if_below_or_at(&v("5.2.4")));
        assert!(range.should_flag_if_at_or_above(&v("5.2.4")));
    }
}
