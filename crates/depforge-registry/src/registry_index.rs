use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use depforge_core::{PackageRecipe, VersionConstraint};
use semver::Version;
use tracing::trace;

/// A package index on disk.
///
/// Recipes live at `index/<name>/<version>.toml`; built packages are
/// expected under `packages/<name>/<version>/`.
#[derive(Debug, Clone)]
pub struct RegistryIndex {
    root: PathBuf,
}

impl RegistryIndex {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn package_folder(&self, package: &str, version: &Version) -> PathBuf {
        self.root
            .join("packages")
            .join(package)
            .join(version.to_string())
    }

    /// Packages whose name contains `needle` (ASCII case-insensitive) and
    /// that have at least one recipe file.
    pub fn search_names(&self, needle: &str) -> Result<Vec<String>> {
        let index_root = self.root.join("index");
        let entries = match fs::read_dir(&index_root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read registry index: {}", index_root.display())
                })
            }
        };

        let needle = needle.to_ascii_lowercase();
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.to_ascii_lowercase().contains(&needle) || !entry.file_type()?.is_dir() {
                continue;
            }
            if recipe_files(&entry.path())?.next().is_some() {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    /// Every recipe published for `package`, highest version first.
    pub fn package_versions(&self, package: &str) -> Result<Vec<PackageRecipe>> {
        let package_dir = self.root.join("index").join(package);
        if !package_dir.exists() {
            return Ok(Vec::new());
        }

        let mut recipes = Vec::new();
        for path in recipe_files(&package_dir)
            .with_context(|| format!("failed to read package directory: {package}"))?
        {
            let path = path?;
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed reading recipe: {}", path.display()))?;
            let recipe = PackageRecipe::from_toml_str(&content)
                .with_context(|| format!("failed parsing recipe: {}", path.display()))?;
            if recipe.name != package {
                anyhow::bail!(
                    "recipe {} declares package '{}' but is stored under '{}'",
                    path.display(),
                    recipe.name,
                    package
                );
            }
            trace!(package, version = %recipe.version, "loaded recipe");
            recipes.push(recipe);
        }

        recipes.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(recipes)
    }
}

/// `*.toml` files directly inside `dir`.
fn recipe_files(dir: &Path) -> Result<impl Iterator<Item = Result<PathBuf>>> {
    let entries = fs::read_dir(dir)?;
    Ok(entries.filter_map(|entry| {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => return Some(Err(err.into())),
        };
        let path = entry.path();
        let is_recipe = path.is_file() && path.extension().is_some_and(|ext| ext == "toml");
        is_recipe.then_some(Ok(path))
    }))
}

pub fn select_highest_compatible<'a>(
    candidates: &'a [PackageRecipe],
    constraint: &VersionConstraint,
) -> Option<&'a PackageRecipe> {
    candidates
        .iter()
        .filter(|recipe| constraint.matches(&recipe.version))
        .max_by(|a, b| a.version.cmp(&b.version))
}
