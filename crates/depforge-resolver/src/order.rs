use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::ResolveError;
use crate::types::{BuildPlan, DependencyGraph, PackageNode};

/// Layers `graph` into build batches with Kahn's algorithm.
///
/// Batch `k` holds every node whose dependencies were all placed in
/// batches `0..k`; nodes removed in the same pass share a batch and are
/// sorted by name, so the plan is identical across runs.
pub fn schedule(graph: &DependencyGraph) -> Result<BuildPlan<'_>, ResolveError> {
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut reverse: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

    for node in graph.nodes() {
        let present = node
            .dependencies
            .iter()
            .filter(|dependency| graph.contains(dependency))
            .map(String::as_str);
        let mut degree = 0;
        for dependency in present {
            degree += 1;
            reverse.entry(dependency).or_default().insert(node.name());
        }
        in_degree.insert(node.name(), degree);
    }

    let mut ready: Vec<&str> = in_degree
        .iter()
        .filter_map(|(name, degree)| (*degree == 0).then_some(*name))
        .collect();
    let mut batches: Vec<Vec<&PackageNode>> = Vec::new();
    let mut scheduled = 0;

    while !ready.is_empty() {
        ready.sort_unstable();
        let mut next = Vec::new();
        for name in &ready {
            in_degree.remove(name);
            let Some(dependents) = reverse.get(name) else {
                continue;
            };
            for dependent in dependents {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        next.push(*dependent);
                    }
                }
            }
        }

        scheduled += ready.len();
        let batch: Vec<&PackageNode> = ready.iter().filter_map(|name| graph.get(name)).collect();
        debug!(batch = batches.len(), packages = batch.len(), "scheduled build batch");
        batches.push(batch);
        ready = next;
    }

    if scheduled != graph.len() {
        let remaining = in_degree.keys().map(|name| (*name).to_string()).collect();
        return Err(ResolveError::GraphNotAcyclic { remaining });
    }

    Ok(BuildPlan::new(batches))
}
