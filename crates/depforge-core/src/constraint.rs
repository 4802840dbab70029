use std::cmp::Ordering;
use std::fmt;
use std::ops::Bound;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use semver::{BuildMetadata, Comparator, Op, Version, VersionReq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::version::parse_lenient_version;

/// A version constraint attached to a requirement.
///
/// Accepted spellings:
/// - `any`, `*` or an empty string for [`VersionConstraint::Any`]
/// - `==1.0` or a bare version such as `2.13.2` for an exact pin
/// - `[>=1.0 <2.0]` bracketed ranges, or any semver requirement (`^1.2`, `>=1, <3`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VersionConstraint {
    #[default]
    Any,
    Exact(Version),
    Range(VersionReq),
}

impl VersionConstraint {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "*" || trimmed.eq_ignore_ascii_case("any") {
            return Ok(Self::Any);
        }

        if let Some(exact) = trimmed.strip_prefix("==") {
            let version = parse_lenient_version(exact)
                .with_context(|| format!("invalid exact version constraint '{trimmed}'"))?;
            return Ok(Self::Exact(version));
        }

        if let Some(inner) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            return parse_bracketed_range(inner)
                .with_context(|| format!("invalid version range '{trimmed}'"));
        }

        if trimmed.starts_with(|ch: char| ch.is_ascii_digit()) {
            if let Ok(version) = parse_lenient_version(trimmed) {
                return Ok(Self::Exact(version));
            }
        }

        VersionReq::parse(trimmed)
            .map(Self::Range)
            .with_context(|| format!("invalid version constraint '{trimmed}'"))
    }

    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(exact) => {
                exact.major == version.major
                    && exact.minor == version.minor
                    && exact.patch == version.patch
                    && exact.pre == version.pre
            }
            Self::Range(req) => req.matches(version),
        }
    }

    /// Returns true when at least one version could satisfy both constraints.
    pub fn intersects(&self, other: &VersionConstraint) -> bool {
        !self.interval().intersect(other.interval()).is_empty()
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    fn interval(&self) -> Interval {
        match self {
            Self::Any => Interval::full(),
            Self::Exact(version) => {
                // Build metadata never affects matching.
                let mut version = version.clone();
                version.build = BuildMetadata::EMPTY;
                Interval {
                    lower: Bound::Included(version.clone()),
                    upper: Bound::Included(version),
                }
            }
            Self::Range(req) => req
                .comparators
                .iter()
                .map(comparator_interval)
                .fold(Interval::full(), Interval::intersect),
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Exact(version) => write!(f, "=={version}"),
            Self::Range(req) => write!(f, "{req}"),
        }
    }
}

impl FromStr for VersionConstraint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for VersionConstraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionConstraint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(|err| serde::de::Error::custom(format!("{err:#}")))
    }
}

fn parse_bracketed_range(inner: &str) -> Result<VersionConstraint> {
    let comparators: Vec<&str> = inner
        .split(|ch: char| ch == ',' || ch.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect();
    if comparators.is_empty() {
        return Err(anyhow!("version range must contain at least one comparator"));
    }
    let req = VersionReq::parse(&comparators.join(", "))?;
    Ok(VersionConstraint::Range(req))
}

/// The set of versions admitted by a constraint, as a single interval.
#[derive(Debug, Clone)]
struct Interval {
    lower: Bound<Version>,
    upper: Bound<Version>,
}

impl Interval {
    fn full() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    fn intersect(self, other: Interval) -> Interval {
        Interval {
            lower: tighter_bound(self.lower, other.lower, Ordering::Greater),
            upper: tighter_bound(self.upper, other.upper, Ordering::Less),
        }
    }

    fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
            (Bound::Included(low), Bound::Included(high)) => low > high,
            (
                Bound::Included(low) | Bound::Excluded(low),
                Bound::Included(high) | Bound::Excluded(high),
            ) => low >= high,
        }
    }
}

/// Picks the more restrictive of two bounds. `preferred` is the ordering
/// that makes a bound tighter: `Greater` for lower bounds, `Less` for upper.
fn tighter_bound(
    left: Bound<Version>,
    right: Bound<Version>,
    preferred: Ordering,
) -> Bound<Version> {
    let keep_left = match (&left, &right) {
        (Bound::Unbounded, _) => false,
        (_, Bound::Unbounded) => true,
        (
            Bound::Included(l) | Bound::Excluded(l),
            Bound::Included(r) | Bound::Excluded(r),
        ) => match l.cmp(r) {
            Ordering::Equal => matches!(left, Bound::Excluded(_)),
            ordering => ordering == preferred,
        },
    };
    if keep_left {
        left
    } else {
        right
    }
}

fn comparator_interval(comparator: &Comparator) -> Interval {
    let mut floor = Version::new(
        comparator.major,
        comparator.minor.unwrap_or(0),
        comparator.patch.unwrap_or(0),
    );
    floor.pre = comparator.pre.clone();
    let fully_specified = comparator.minor.is_some() && comparator.patch.is_some();
    let next_partial = next_partial_version(comparator);

    let (lower, upper) = match comparator.op {
        Op::Exact if fully_specified => (Bound::Included(floor.clone()), Bound::Included(floor)),
        Op::Exact | Op::Wildcard => (
            Bound::Included(floor),
            next_partial.map_or(Bound::Unbounded, Bound::Excluded),
        ),
        Op::Greater => match next_partial {
            Some(next) => (Bound::Included(next), Bound::Unbounded),
            None => (Bound::Excluded(floor), Bound::Unbounded),
        },
        Op::GreaterEq => (Bound::Included(floor), Bound::Unbounded),
        Op::Less => (Bound::Unbounded, Bound::Excluded(floor)),
        Op::LessEq => match next_partial {
            Some(next) => (Bound::Unbounded, Bound::Excluded(next)),
            None => (Bound::Unbounded, Bound::Included(floor)),
        },
        Op::Tilde => {
            let upper = match comparator.minor {
                Some(minor) => Version::new(comparator.major, minor.saturating_add(1), 0),
                None => Version::new(comparator.major.saturating_add(1), 0, 0),
            };
            (Bound::Included(floor), Bound::Excluded(upper))
        }
        Op::Caret => (
            Bound::Included(floor),
            Bound::Excluded(caret_upper(comparator)),
        ),
        _ => (Bound::Unbounded, Bound::Unbounded),
    };

    Interval { lower, upper }
}

/// First version past a partially specified comparator (`1` -> `2.0.0`,
/// `1.2` -> `1.3.0`). `None` when every component is given.
fn next_partial_version(comparator: &Comparator) -> Option<Version> {
    match (comparator.minor, comparator.patch) {
        (None, _) => Some(Version::new(comparator.major.saturating_add(1), 0, 0)),
        (Some(minor), None) => Some(Version::new(comparator.major, minor.saturating_add(1), 0)),
        (Some(_), Some(_)) => None,
    }
}

fn caret_upper(comparator: &Comparator) -> Version {
    if comparator.major > 0 {
        return Version::new(comparator.major.saturating_add(1), 0, 0);
    }
    match (comparator.minor, comparator.patch) {
        (None, _) => Version::new(1, 0, 0),
        (Some(0), None) => Version::new(0, 1, 0),
        (Some(0), Some(patch)) => Version::new(0, 0, patch.saturating_add(1)),
        (Some(minor), _) => Version::new(0, minor.saturating_add(1), 0),
    }
}
