use anyhow::{anyhow, Context, Result};
use semver::Version;
use serde::{Deserialize, Deserializer};

/// Parses a version, padding missing minor/patch components with zeros.
///
/// Package indexes routinely publish versions such as `0.22` or `1.0`; those
/// become `0.22.0` and `1.0.0`. A `-pre` or `+build` suffix is preserved.
pub fn parse_lenient_version(input: &str) -> Result<Version> {
    let trimmed = input.trim();
    if let Ok(version) = Version::parse(trimmed) {
        return Ok(version);
    }

    let (core, suffix) = match trimmed.find(|ch: char| ch == '-' || ch == '+') {
        Some(index) => trimmed.split_at(index),
        None => (trimmed, ""),
    };
    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3
        || parts
            .iter()
            .any(|part| part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err(anyhow!("invalid version '{trimmed}'"));
    }

    let mut padded = parts.join(".");
    for _ in parts.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(suffix);
    Version::parse(&padded).with_context(|| format!("invalid version '{trimmed}'"))
}

pub(crate) fn deserialize_lenient_version<'de, D>(deserializer: D) -> Result<Version, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_lenient_version(&raw).map_err(|err| serde::de::Error::custom(format!("{err:#}")))
}
