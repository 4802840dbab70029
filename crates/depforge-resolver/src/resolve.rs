use std::collections::{BTreeMap, BTreeSet, VecDeque};

use anyhow::anyhow;
use depforge_core::{validate_package_name, validate_package_variable, Requirement};
use semver::Version;
use tracing::{debug, info, trace};

use crate::constraints::{check_incoming, IncomingConstraint};
use crate::cycles::find_cycle;
use crate::error::ResolveError;
use crate::lookup::PackageLookup;
use crate::types::{DependencyGraph, PackageNode};

/// Requester name reported for the caller's own requirements.
pub const ROOT_REQUESTER: &str = "<root>";

struct PendingRequirement {
    requirement: Requirement,
    requested_by: String,
}

struct ResolvingNode {
    requirement: Requirement,
    version: Version,
    variables: BTreeMap<String, String>,
    origin: IncomingConstraint,
    accepted: Vec<IncomingConstraint>,
    /// Dependency name to whether every edge to it is build-only.
    dependencies: BTreeMap<String, bool>,
}

/// Expands `requirements` breadth-first into a [`DependencyGraph`].
///
/// Each package name is looked up once, under the first constraint that
/// reaches it. Later requirements on the same name must overlap every
/// constraint seen so far and admit the selected version; there is no
/// backtracking.
pub fn resolve<L>(
    requirements: &[Requirement],
    lookup: &mut L,
) -> Result<DependencyGraph, ResolveError>
where
    L: PackageLookup + ?Sized,
{
    for requirement in requirements {
        check_name(requirement, ROOT_REQUESTER)?;
    }

    let mut queue: VecDeque<PendingRequirement> = requirements
        .iter()
        .map(|requirement| PendingRequirement {
            requirement: requirement.clone(),
            requested_by: ROOT_REQUESTER.to_string(),
        })
        .collect();

    let mut roots: Vec<String> = Vec::new();
    for requirement in requirements {
        if !roots.contains(&requirement.name) {
            roots.push(requirement.name.clone());
        }
    }

    let mut resolving: BTreeMap<String, ResolvingNode> = BTreeMap::new();

    while let Some(PendingRequirement {
        requirement,
        requested_by,
    }) = queue.pop_front()
    {
        if let Some(node) = resolving.get_mut(&requirement.name) {
            trace!(
                package = %requirement.name,
                constraint = %requirement.constraint,
                requested_by = %requested_by,
                "checking additional requirement"
            );
            check_incoming(
                &node.version,
                &node.origin,
                &node.accepted,
                &requirement,
                &requested_by,
            )?;
            node.accepted.push(IncomingConstraint {
                constraint: requirement.constraint,
                requested_by,
            });
            continue;
        }

        debug!(
            package = %requirement.name,
            constraint = %requirement.constraint,
            requested_by = %requested_by,
            "looking up package"
        );
        let lookup_failure = |source: anyhow::Error| ResolveError::LookupFailure {
            package: requirement.name.clone(),
            constraint: requirement.constraint.clone(),
            requested_by: requested_by.clone(),
            source,
        };
        let resolved = lookup
            .lookup(&requirement.name, &requirement.constraint)
            .map_err(lookup_failure)?;
        if !requirement.constraint.matches(&resolved.version) {
            return Err(lookup_failure(anyhow!(
                "lookup selected version {} which does not satisfy {}",
                resolved.version,
                requirement.constraint
            )));
        }

        for key in resolved.variables.keys() {
            validate_package_variable(key).map_err(lookup_failure)?;
        }

        let mut dependencies: BTreeMap<String, bool> = BTreeMap::new();
        for dependency in &resolved.requirements {
            check_name(dependency, &requirement.name)?;
            dependencies
                .entry(dependency.name.clone())
                .and_modify(|build_only| *build_only &= dependency.build_only)
                .or_insert(dependency.build_only);
            queue.push_back(PendingRequirement {
                requirement: dependency.clone(),
                requested_by: requirement.name.clone(),
            });
        }

        resolving.insert(
            requirement.name.clone(),
            ResolvingNode {
                origin: IncomingConstraint {
                    constraint: requirement.constraint.clone(),
                    requested_by,
                },
                requirement,
                version: resolved.version,
                variables: resolved.variables,
                accepted: Vec::new(),
                dependencies,
            },
        );
    }

    let edges: BTreeMap<String, BTreeSet<String>> = resolving
        .iter()
        .map(|(name, node)| (name.clone(), node.dependencies.keys().cloned().collect()))
        .collect();
    if let Some(path) = find_cycle(roots.iter().map(String::as_str), &edges) {
        return Err(ResolveError::CyclicDependency { path });
    }

    let runtime = runtime_packages(requirements, &resolving);
    let nodes: BTreeMap<String, PackageNode> = resolving
        .into_iter()
        .map(|(name, node)| {
            let build_only = !runtime.contains(&name);
            let package = PackageNode {
                requirement: node.requirement.with_build_only(build_only),
                version: node.version,
                dependencies: node.dependencies.into_keys().collect(),
                variables: node.variables,
            };
            (name, package)
        })
        .collect();

    info!(
        packages = nodes.len(),
        roots = roots.len(),
        "resolved dependency graph"
    );
    Ok(DependencyGraph::from_parts(nodes, roots))
}

fn check_name(requirement: &Requirement, requested_by: &str) -> Result<(), ResolveError> {
    validate_package_name(&requirement.name).map_err(|source| ResolveError::InvalidRequirement {
        package: requirement.name.clone(),
        requested_by: requested_by.to_string(),
        source,
    })
}

/// Names reachable from a runtime root through runtime edges only.
fn runtime_packages(
    requirements: &[Requirement],
    resolving: &BTreeMap<String, ResolvingNode>,
) -> BTreeSet<String> {
    let mut runtime: BTreeSet<String> = BTreeSet::new();
    let mut frontier: Vec<&str> = requirements
        .iter()
        .filter(|requirement| !requirement.build_only)
        .map(|requirement| requirement.name.as_str())
        .collect();

    while let Some(name) = frontier.pop() {
        if !runtime.insert(name.to_string()) {
            continue;
        }
        if let Some(node) = resolving.get(name) {
            frontier.extend(
                node.dependencies
                    .iter()
                    .filter(|(_, build_only)| !**build_only)
                    .map(|(dependency, _)| dependency.as_str()),
            );
        }
    }

    runtime
}
