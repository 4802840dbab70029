use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use depforge_core::{ProjectManifest, Requirement};
use depforge_resolver::{resolve, schedule, PackageLookup};
use tracing::info;

use crate::emit::{fingerprint, Emitter};
use crate::error::ToolchainError;
use crate::format::DescriptorFormat;

/// A rendered descriptor together with what it was rendered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub descriptor: String,
    pub fingerprint: String,
    pub format: DescriptorFormat,
    pub packages: usize,
    pub batches: usize,
}

impl Toolchain {
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create descriptor dir: {}", parent.display())
                })?;
            }
        }
        fs::write(path, self.descriptor.as_bytes())
            .with_context(|| format!("failed to write descriptor: {}", path.display()))
    }
}

/// Resolves `requirements`, schedules the graph and renders it with
/// `emitter`. Runs synchronously to completion; the first error aborts.
pub fn generate<L>(
    requirements: &[Requirement],
    lookup: &mut L,
    emitter: &Emitter,
) -> Result<Toolchain, ToolchainError>
where
    L: PackageLookup + ?Sized,
{
    let graph = resolve(requirements, lookup)?;
    let plan = schedule(&graph)?;
    let descriptor = emitter.render(&plan)?;
    let fingerprint = fingerprint(&descriptor);

    info!(
        packages = plan.len(),
        batches = plan.batches().len(),
        format = %emitter.format(),
        fingerprint = %fingerprint,
        "generated toolchain descriptor"
    );
    Ok(Toolchain {
        descriptor,
        fingerprint,
        format: emitter.format(),
        packages: plan.len(),
        batches: plan.batches().len(),
    })
}

/// [`generate`] for a project manifest: its references become the root
/// requirements and its `[toolchain]` table the global variables.
pub fn generate_for_project<L>(
    manifest: &ProjectManifest,
    lookup: &mut L,
    format: DescriptorFormat,
) -> Result<Toolchain>
where
    L: PackageLookup + ?Sized,
{
    let requirements = manifest.requirements()?;
    let emitter = Emitter::new(format).with_globals(manifest.toolchain_variables()?);
    generate(&requirements, lookup, &emitter)
        .with_context(|| format!("failed generating toolchain for '{}'", manifest.name))
}
