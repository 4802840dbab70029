use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Result};
use depforge_core::{PackageRecipe, VersionConstraint};
use depforge_resolver::{PackageLookup, ResolvedPackage};
use tracing::debug;

use crate::registry_index::{select_highest_compatible, RegistryIndex};
use crate::sources::ConfiguredRegistryIndex;

/// Build variables a consumer needs to compile and link against `recipe`
/// installed at `package_folder`.
///
/// Directory lists become `;`-joined absolute paths, `libs` and `defines`
/// are `;`-joined as-is, and the recipe's free-form `[variables]` are copied
/// last so they can override any derived entry.
pub fn package_variables(
    recipe: &PackageRecipe,
    package_folder: &Path,
) -> BTreeMap<String, String> {
    let mut variables = BTreeMap::new();
    variables.insert(
        "package_folder".to_string(),
        package_folder.display().to_string(),
    );

    let info = &recipe.package_info;
    let directories = [
        ("include_dirs", &info.include_dirs),
        ("lib_dirs", &info.lib_dirs),
        ("bin_dirs", &info.bin_dirs),
    ];
    for (key, entries) in directories {
        if entries.is_empty() {
            continue;
        }
        let joined = entries
            .iter()
            .map(|entry| package_folder.join(entry).display().to_string())
            .collect::<Vec<_>>()
            .join(";");
        variables.insert(key.to_string(), joined);
    }

    for (key, entries) in [("libs", &info.libs), ("defines", &info.defines)] {
        if !entries.is_empty() {
            variables.insert(key.to_string(), entries.join(";"));
        }
    }

    for (key, value) in &recipe.variables {
        variables.insert(key.clone(), value.clone());
    }
    variables
}

fn resolve_from_index(
    index: &RegistryIndex,
    recipes: &[PackageRecipe],
    name: &str,
    constraint: &VersionConstraint,
) -> Result<ResolvedPackage> {
    if recipes.is_empty() {
        return Err(anyhow!(
            "package '{name}' was not found in the registry index"
        ));
    }
    let recipe = select_highest_compatible(recipes, constraint).ok_or_else(|| {
        anyhow!("no matching version for '{name}' with constraint {constraint}")
    })?;

    let package_folder = index.package_folder(name, &recipe.version);
    debug!(
        package = name,
        version = %recipe.version,
        folder = %package_folder.display(),
        "selected recipe"
    );
    Ok(ResolvedPackage {
        version: recipe.version.clone(),
        requirements: recipe.requirements(),
        variables: package_variables(recipe, &package_folder),
    })
}

impl PackageLookup for RegistryIndex {
    fn lookup(&mut self, name: &str, constraint: &VersionConstraint) -> Result<ResolvedPackage> {
        let recipes = self.package_versions(name)?;
        resolve_from_index(self, &recipes, name, constraint)
    }
}

impl PackageLookup for ConfiguredRegistryIndex {
    fn lookup(&mut self, name: &str, constraint: &VersionConstraint) -> Result<ResolvedPackage> {
        match self.find_package(name)? {
            Some((source, recipes)) => {
                debug!(package = name, source = %source.name, "package served by source");
                resolve_from_index(&source.index, &recipes, name, constraint)
            }
            None => Err(anyhow!(
                "package '{name}' was not found in any configured registry source"
            )),
        }
    }
}
