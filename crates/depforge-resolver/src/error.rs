use depforge_core::VersionConstraint;
use semver::Version;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(
        "version conflict for '{package}': {existing} (required by {existing_by}) \
         is incompatible with {incoming} (required by {incoming_by}); selected {selected}"
    )]
    VersionConflict {
        package: String,
        existing: VersionConstraint,
        existing_by: String,
        incoming: VersionConstraint,
        incoming_by: String,
        selected: Version,
    },

    #[error("dependency cycle detected: {}", .path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    #[error("failed to look up '{package}' ({constraint}) required by {requested_by}")]
    LookupFailure {
        package: String,
        constraint: VersionConstraint,
        requested_by: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid requirement '{package}' required by {requested_by}")]
    InvalidRequirement {
        package: String,
        requested_by: String,
        #[source]
        source: anyhow::Error,
    },

    /// Raised by the scheduler when handed a graph that still contains a
    /// cycle. Graphs built by `resolve` never do.
    #[error(
        "internal error: dependency graph is not acyclic; unschedulable packages: {}",
        .remaining.join(", ")
    )]
    GraphNotAcyclic { remaining: Vec<String> },
}

impl ResolveError {
    /// The package the error is about, when there is a single one.
    pub fn package(&self) -> Option<&str> {
        match self {
            Self::VersionConflict { package, .. }
            | Self::LookupFailure { package, .. }
            | Self::InvalidRequirement { package, .. } => Some(package),
            Self::CyclicDependency { path } => path.first().map(String::as_str),
            Self::GraphNotAcyclic { .. } => None,
        }
    }
}
