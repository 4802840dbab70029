use depforge_core::{Requirement, VersionConstraint};
use semver::Version;

use crate::error::ResolveError;

#[derive(Debug, Clone)]
pub(crate) struct IncomingConstraint {
    pub(crate) constraint: VersionConstraint,
    pub(crate) requested_by: String,
}

/// Checks a further requirement on an already resolved package.
///
/// `origin` is the requirement the package was looked up for; `others` are
/// the ones accepted since. The incoming constraint must overlap every one
/// of them and admit the version already selected.
pub(crate) fn check_incoming(
    selected: &Version,
    origin: &IncomingConstraint,
    others: &[IncomingConstraint],
    incoming: &Requirement,
    requested_by: &str,
) -> Result<(), ResolveError> {
    let conflict = |existing: &IncomingConstraint| ResolveError::VersionConflict {
        package: incoming.name.clone(),
        existing: existing.constraint.clone(),
        existing_by: existing.requested_by.clone(),
        incoming: incoming.constraint.clone(),
        incoming_by: requested_by.to_string(),
        selected: selected.clone(),
    };

    if let Some(disjoint) = std::iter::once(origin)
        .chain(others)
        .find(|existing| !existing.constraint.intersects(&incoming.constraint))
    {
        return Err(conflict(disjoint));
    }

    if !incoming.constraint.matches(selected) {
        return Err(conflict(origin));
    }

    Ok(())
}
