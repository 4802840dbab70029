use std::collections::BTreeMap;

use anyhow::Result;
use depforge_core::{Requirement, VersionConstraint};
use semver::Version;

/// What a package index reports for one name/constraint query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub version: Version,
    pub requirements: Vec<Requirement>,
    pub variables: BTreeMap<String, String>,
}

impl ResolvedPackage {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            requirements: Vec::new(),
            variables: BTreeMap::new(),
        }
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }
}

/// Resolves a single package name under a constraint.
///
/// Implementations may block (index queries, filesystem reads). The
/// resolver calls `lookup` at most once per package name per resolution
/// and never retries a failure.
pub trait PackageLookup {
    fn lookup(&mut self, name: &str, constraint: &VersionConstraint) -> Result<ResolvedPackage>;
}

impl<F> PackageLookup for F
where
    F: FnMut(&str, &VersionConstraint) -> Result<ResolvedPackage>,
{
    fn lookup(&mut self, name: &str, constraint: &VersionConstraint) -> Result<ResolvedPackage> {
        self(name, constraint)
    }
}
