use std::collections::{BTreeMap, BTreeSet};

use depforge_core::Requirement;
use semver::Version;

/// A resolved package inside a [`DependencyGraph`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNode {
    /// The requirement that first introduced the package. `build_only`
    /// reflects the whole graph: it is false as soon as any runtime path
    /// reaches the package.
    pub requirement: Requirement,
    pub version: Version,
    pub dependencies: BTreeSet<String>,
    pub variables: BTreeMap<String, String>,
}

impl PackageNode {
    pub fn name(&self) -> &str {
        &self.requirement.name
    }

    pub fn is_build_only(&self) -> bool {
        self.requirement.build_only
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, PackageNode>,
    roots: Vec<String>,
}

impl DependencyGraph {
    pub(crate) fn from_parts(nodes: BTreeMap<String, PackageNode>, roots: Vec<String>) -> Self {
        Self { nodes, roots }
    }

    pub fn get(&self, name: &str) -> Option<&PackageNode> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// All nodes in package-name order.
    pub fn nodes(&self) -> impl Iterator<Item = &PackageNode> {
        self.nodes.values()
    }

    /// Root package names in the order they were first requested.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.nodes
            .values()
            .filter(|node| node.dependencies.contains(name))
            .map(PackageNode::name)
            .collect()
    }
}

/// Build order for a [`DependencyGraph`]: every node's dependencies sit in
/// earlier batches, and nodes inside a batch are sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan<'g> {
    batches: Vec<Vec<&'g PackageNode>>,
}

impl<'g> BuildPlan<'g> {
    pub(crate) fn new(batches: Vec<Vec<&'g PackageNode>>) -> Self {
        Self { batches }
    }

    pub fn batches(&self) -> &[Vec<&'g PackageNode>] {
        &self.batches
    }

    /// Total number of scheduled packages.
    pub fn len(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn batch_of(&self, name: &str) -> Option<usize> {
        self.batches
            .iter()
            .position(|batch| batch.iter().any(|node| node.name() == name))
    }

    /// Nodes in build order: batch by batch, name order within a batch.
    pub fn iter(&self) -> impl Iterator<Item = &'g PackageNode> + '_ {
        self.batches.iter().flat_map(|batch| batch.iter().copied())
    }
}
