//! Distro-style version algebra.
//!
//! A version string has the shape `PREFIX[_SUFFIXTAIL]`, where `PREFIX` and
//! the tail following a suffix keyword are both dot-separated sequences of
//! `NUMBER[LETTER]` segments (e.g. `12`, `12a`). The suffix keyword, if
//! present, is one of `alpha`, `beta`, `pre`, `rc`, `m`, `p` and carries a
//! fixed ordering weight relative to an unsuffixed version. Two versions
//! compare by `(prefix, suffix_weight, tail)` tuple order.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single `NUMBER[LETTER]` segment of a version component.
pub type Segment = (u64, Option<char>);

/// Suffix keywords recognized after the first `_`, longest-match first so
/// that `pre` is not shadowed by a hypothetical shorter prefix of itself.
const SUFFIXES: &[(&str, i8)] = &[
    ("alpha", -5),
    ("beta", -4),
    ("pre", -3),
    ("rc", -2),
    ("m", -1),
    ("p", 1),
];

/// Error returned when a version string does not conform to the grammar.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid version string: {0:?}")]
    InvalidVersion(String),
}

/// A parsed, totally-ordered version.
///
/// `Version` keeps the original input around so `Display`/`to_string`
/// round-trips exactly, while comparisons operate on the decomposed
/// `(prefix, suffix_weight, tail)` tuple.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Version {
    raw: String,
    prefix: Vec<Segment>,
    suffix_weight: i8,
    tail: Vec<Segment>,
}

impl Version {
    /// The normalized source string this version was parsed from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The prefix segments, i.e. everything before the first `_`.
    #[must_use]
    pub fn prefix(&self) -> &[Segment] {
        &self.prefix
    }

    /// The suffix ordering weight; `0` when the version has no suffix.
    #[must_use]
    pub fn suffix_weight(&self) -> i8 {
        self.suffix_weight
    }

    /// The tail segments following the suffix keyword, if any.
    #[must_use]
    pub fn tail(&self) -> &[Segment] {
        &self.tail
    }

    fn key(&self) -> (&[Segment], i8, &[Segment]) {
        (&self.prefix, self.suffix_weight, &self.tail)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        parse(&s)
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.raw
    }
}

/// Peel a single trailing ASCII alphabetic character off a segment and
/// parse the remainder as a number, e.g. `"12a"` -> `(12, Some('a'))`.
fn parse_segment(s: &str) -> Result<Segment, VersionError> {
    if s.is_empty() {
        return Err(VersionError::InvalidVersion(s.to_string()));
    }
    let mut chars = s.chars();
    let last = chars.clone().next_back().unwrap();
    let (digits, letter) = if last.is_ascii_alphabetic() {
        chars.next_back();
        (chars.as_str(), Some(last))
    } else {
        (s, None)
    };
    let number = digits
        .parse::<u64>()
        .map_err(|_| VersionError::InvalidVersion(s.to_string()))?;
    Ok((number, letter))
}

/// Parse a dot-separated sequence of `NUMBER[LETTER]` segments.
fn parse_segments(s: &str) -> Result<Vec<Segment>, VersionError> {
    if s.is_empty() {
        return Err(VersionError::InvalidVersion(s.to_string()));
    }
    s.split('.').map(parse_segment).collect()
}

/// Identify the longest suffix keyword at the start of `s`, returning the
/// keyword's weight and the remainder of the string after it.
fn split_suffix(s: &str) -> Option<(i8, &str)> {
    SUFFIXES
        .iter()
        .filter(|(kw, _)| s.starts_with(kw))
        .max_by_key(|(kw, _)| kw.len())
        .map(|(kw, weight)| (*weight, &s[kw.len()..]))
}

/// Parse a version string, returning the decomposed, orderable `Version`.
pub fn parse(s: &str) -> Result<Version, VersionError> {
    if s.is_empty() {
        return Err(VersionError::InvalidVersion(s.to_string()));
    }
    let (prefix_str, suffix_part) = match s.split_once('_') {
        Some((p, rest)) => (p, Some(rest)),
        None => (s, None),
    };
    let prefix = parse_segments(prefix_str)?;
    let (suffix_weight, tail) = match suffix_part {
        None => (0, vec![(0, None)]),
        Some(rest) => {
            let (weight, tail_str) =
                split_suffix(rest).ok_or_else(|| VersionError::InvalidVersion(s.to_string()))?;
            let tail = if tail_str.is_empty() {
                vec![(0, None)]
            } else {
                parse_segments(tail_str)?
            };
            (weight, tail)
        }
    };
    Ok(Version {
        raw: s.to_string(),
        prefix,
        suffix_weight,
        tail,
    })
}

/// Non-raising variant of [`parse`]; `true` iff `s` conforms to the grammar.
#[must_use]
pub fn valid(s: &str) -> bool {
    parse(s).is_ok()
}

/// A version paired with a distro release number, as stored in the
/// repository/install databases. Ordering compares `(version, release)`:
/// two builds of the same upstream version are ordered by release.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Revision {
    pub version: Version,
    pub release: u32,
}

impl Revision {
    #[must_use]
    pub fn new(version: Version, release: u32) -> Self {
        Self { version, release }
    }

    fn key(&self) -> (&Version, u32) {
        (&self.version, self.release)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.version, self.release)
    }
}

impl PartialOrd for Revision {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Revision {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_version_has_zero_suffix_weight() {
        let v = parse("1.2.3").unwrap();
        assert_eq!(v.suffix_weight(), 0);
        assert_eq!(v.prefix(), &[(1, None), (2, None), (3, None)]);
        assert_eq!(v.tail(), &[(0, None)]);
    }

    #[test]
    fn segment_letter_qualifier() {
        let v = parse("12a.3").unwrap();
        assert_eq!(v.prefix(), &[(12, Some('a')), (3, None)]);
    }

    #[test]
    fn suffix_ordering_matches_distro_weights() {
        let alpha = parse("1.0_alpha1").unwrap();
        let beta = parse("1.0_beta1").unwrap();
        let pre = parse("1.0_pre1").unwrap();
        let rc = parse("1.0_rc1").unwrap();
        let m = parse("1.0_m1").unwrap();
        let none = parse("1.0").unwrap();
        let p = parse("1.0_p1").unwrap();
        let mut ordered = vec![
            p.clone(),
            none.clone(),
            m.clone(),
            rc.clone(),
            pre.clone(),
            beta.clone(),
            alpha.clone(),
        ];
        ordered.sort();
        assert_eq!(ordered, vec![alpha, beta, pre, rc, m, none, p]);
    }

    #[test]
    fn pre_keyword_not_shadowed_by_p() {
        // "pre" must win over "p" as a prefix match on "pre1".
        let v = parse("1.0_pre1").unwrap();
        assert_eq!(v.suffix_weight(), -3);
        assert_eq!(v.tail(), &[(1, None)]);
    }

    #[test]
    fn display_round_trips_normalized_input() {
        for s in ["1.2.3", "2.6.32_p4", "1.0_alpha2.1", "10a.2b_rc3"] {
            let v = parse(s).unwrap();
            assert_eq!(v.to_string(), s);
        }
    }

    #[test]
    fn rejects_empty_and_non_numeric_segments() {
        assert!(!valid(""));
        assert!(!valid("abc"));
        assert!(!valid("1..2"));
        assert!(!valid("1.0_unknownsuffix"));
    }

    #[test]
    fn revision_orders_by_version_then_release() {
        let low = Revision::new(parse("1.0").unwrap(), 1);
        let high_release = Revision::new(parse("1.0").unwrap(), 2);
        let high_version = Revision::new(parse("1.1").unwrap(), 1);
        assert!(low < high_release);
        assert!(high_release < high_version);
    }

    proptest::proptest! {
        #[test]
        fn total_order_is_transitive(
            a in 0u64..50, b in 0u64..50, c in 0u64..50,
        ) {
            let va = parse(&format!("1.{a}")).unwrap();
            let vb = parse(&format!("1.{b}")).unwrap();
            let vc = parse(&format!("1.{c}")).unwrap();
            if va <= vb && vb <= vc {
                proptest::prop_assert!(va <= vc);
            }
        }

        #[test]
        fn parse_never_panics(s in "\\PC*") {
            let _ = parse(&s);
        }
    }
}
