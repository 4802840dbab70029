use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use depforge_core::{validate_package_name, PackageRecipe};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::registry_index::RegistryIndex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySourceRecord {
    pub name: String,
    /// Registry root; relative paths are taken from the sources file's directory.
    pub location: String,
    #[serde(default = "source_enabled_default")]
    pub enabled: bool,
    pub priority: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistrySourcesFile {
    #[serde(default = "sources_file_version")]
    version: u32,
    #[serde(default)]
    sources: Vec<RegistrySourceRecord>,
}

/// Several registries consulted in priority order (lowest number first,
/// then by name). The first source that publishes a package answers for it.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredRegistryIndex {
    sources: Vec<ConfiguredSource>,
}

#[derive(Debug, Clone)]
pub(crate) struct ConfiguredSource {
    pub(crate) name: String,
    pub(crate) index: RegistryIndex,
}

impl ConfiguredRegistryIndex {
    /// Loads `sources.toml`-style configuration. A missing file yields an
    /// index with no sources.
    pub fn open(sources_path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(sources_path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!(
                        "failed reading registry sources: {}",
                        sources_path.display()
                    )
                });
            }
        };
        let records = parse_sources_file(&content).with_context(|| {
            format!(
                "failed parsing registry sources: {}",
                sources_path.display()
            )
        })?;

        let base = sources_path.parent().unwrap_or_else(|| Path::new("."));
        let mut sources = Vec::new();
        for record in records.into_iter().filter(|record| record.enabled) {
            let root = base.join(&record.location);
            if !root.is_dir() {
                warn!(
                    source = %record.name,
                    location = %root.display(),
                    "skipping registry source without a directory"
                );
                continue;
            }
            sources.push(ConfiguredSource {
                name: record.name,
                index: RegistryIndex::open(root),
            });
        }

        Ok(Self { sources })
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources
            .iter()
            .map(|source| source.name.as_str())
            .collect()
    }

    /// Union of every source's matches, in name order.
    pub fn search_names(&self, needle: &str) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        for source in &self.sources {
            names.extend(source.index.search_names(needle)?);
        }
        Ok(names.into_iter().collect())
    }

    pub fn package_versions(&self, package: &str) -> Result<Vec<PackageRecipe>> {
        Ok(self
            .package_versions_with_source(package)?
            .map(|(_, recipes)| recipes)
            .unwrap_or_default())
    }

    pub fn package_versions_with_source(
        &self,
        package: &str,
    ) -> Result<Option<(String, Vec<PackageRecipe>)>> {
        Ok(self
            .find_package(package)?
            .map(|(source, recipes)| (source.name.clone(), recipes)))
    }

    pub(crate) fn find_package(
        &self,
        package: &str,
    ) -> Result<Option<(&ConfiguredSource, Vec<PackageRecipe>)>> {
        for source in &self.sources {
            let recipes = source.index.package_versions(package).with_context(|| {
                format!(
                    "failed loading package '{package}' from registry source '{}'",
                    source.name
                )
            })?;
            if !recipes.is_empty() {
                return Ok(Some((source, recipes)));
            }
        }
        Ok(None)
    }
}

/// Enabled and disabled records alike, ordered by `(priority, name)`.
fn parse_sources_file(content: &str) -> Result<Vec<RegistrySourceRecord>> {
    let file: RegistrySourcesFile = toml::from_str(content)?;
    if file.version != sources_file_version() {
        anyhow::bail!("unsupported registry sources version {}", file.version);
    }

    let mut names = BTreeSet::new();
    let mut ordered = BTreeMap::new();
    for source in file.sources {
        // Source names share the package name alphabet.
        validate_package_name(&source.name)
            .with_context(|| format!("invalid source name '{}'", source.name))?;
        if !names.insert(source.name.clone()) {
            anyhow::bail!("duplicate registry source '{}'", source.name);
        }
        ordered.insert((source.priority, source.name.clone()), source);
    }

    Ok(ordered.into_values().collect())
}

fn sources_file_version() -> u32 {
    1
}

fn source_enabled_default() -> bool {
    true
}
