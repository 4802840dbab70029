use std::fmt;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::constraint::VersionConstraint;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    #[serde(default)]
    pub constraint: VersionConstraint,
    #[serde(default)]
    pub build_only: bool,
}

impl Requirement {
    pub fn new(name: impl Into<String>, constraint: VersionConstraint) -> Self {
        Self {
            name: name.into(),
            constraint,
            build_only: false,
        }
    }

    /// A requirement needed only while building, never linked into the consumer.
    pub fn tool(name: impl Into<String>, constraint: VersionConstraint) -> Self {
        Self {
            name: name.into(),
            constraint,
            build_only: true,
        }
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, VersionConstraint::Any)
    }

    /// Parses a `name/constraint` reference such as `freetype/2.13.2` or
    /// `zlib/[>=1.2 <2]`. A reference without a constraint accepts any version.
    pub fn parse_reference(reference: &str) -> Result<Self> {
        let trimmed = reference.trim();
        if trimmed.contains('@') {
            return Err(anyhow!(
                "reference '{trimmed}' uses user/channel qualifiers, which are not supported"
            ));
        }

        let (name, constraint) = match trimmed.split_once('/') {
            Some((name, constraint)) => (name.trim(), constraint),
            None => (trimmed, ""),
        };
        validate_package_name(name).with_context(|| format!("invalid reference '{trimmed}'"))?;
        let constraint = VersionConstraint::parse(constraint)
            .with_context(|| format!("invalid reference '{trimmed}'"))?;

        Ok(Self::new(name, constraint))
    }

    pub fn with_build_only(mut self, build_only: bool) -> Self {
        self.build_only = build_only;
        self
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.constraint)?;
        if self.build_only {
            f.write_str(" (build)")?;
        }
        Ok(())
    }
}

pub fn validate_package_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(anyhow!("package name must not be empty"));
    }
    if !name.starts_with(|ch: char| ch.is_ascii_alphanumeric()) {
        return Err(anyhow!(
            "package name must start with an ASCII letter or digit: {name}"
        ));
    }
    if name
        .chars()
        .any(|ch| !(ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '+')))
    {
        return Err(anyhow!("package name contains invalid character(s): {name}"));
    }
    Ok(())
}
