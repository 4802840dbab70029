use std::collections::BTreeMap;

use anyhow::{anyhow, Context};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::constraint::VersionConstraint;
use crate::requirement::{validate_package_name, Requirement};
use crate::variable::validate_package_variable;
use crate::version::deserialize_lenient_version;

/// One published version of a package, as stored in a package index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageRecipe {
    pub name: String,
    #[serde(deserialize_with = "deserialize_lenient_version")]
    pub version: Version,
    pub description: Option<String>,
    pub license: Option<String>,
    #[serde(default)]
    pub requires: BTreeMap<String, VersionConstraint>,
    #[serde(default)]
    pub tool_requires: BTreeMap<String, VersionConstraint>,
    #[serde(default)]
    pub package_info: PackageInfo,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

/// Consumer-facing layout of a built package. Directory entries are
/// relative to the package folder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageInfo {
    #[serde(default = "default_include_dirs")]
    pub include_dirs: Vec<String>,
    #[serde(default = "default_lib_dirs")]
    pub lib_dirs: Vec<String>,
    #[serde(default = "default_bin_dirs")]
    pub bin_dirs: Vec<String>,
    #[serde(default)]
    pub libs: Vec<String>,
    #[serde(default)]
    pub defines: Vec<String>,
}

impl Default for PackageInfo {
    fn default() -> Self {
        Self {
            include_dirs: default_include_dirs(),
            lib_dirs: default_lib_dirs(),
            bin_dirs: default_bin_dirs(),
            libs: Vec::new(),
            defines: Vec::new(),
        }
    }
}

impl PackageRecipe {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let recipe: Self = toml::from_str(input).context("failed to parse package recipe")?;
        validate_package_name(&recipe.name)?;

        if recipe.requires.contains_key(&recipe.name)
            || recipe.tool_requires.contains_key(&recipe.name)
        {
            return Err(anyhow!("recipe '{}' requires itself", recipe.name));
        }
        for name in recipe.requires.keys().chain(recipe.tool_requires.keys()) {
            validate_package_name(name)
                .with_context(|| format!("invalid requirement in recipe '{}'", recipe.name))?;
        }
        if let Some(duplicate) = recipe
            .requires
            .keys()
            .find(|name| recipe.tool_requires.contains_key(*name))
        {
            return Err(anyhow!(
                "recipe '{}' lists '{}' in both requires and tool_requires",
                recipe.name,
                duplicate
            ));
        }

        for key in recipe.variables.keys() {
            validate_package_variable(key)
                .with_context(|| format!("invalid variable in recipe '{}'", recipe.name))?;
        }

        Ok(recipe)
    }

    /// Runtime requirements first, then build-only ones, each in name order.
    pub fn requirements(&self) -> Vec<Requirement> {
        let runtime = self
            .requires
            .iter()
            .map(|(name, constraint)| Requirement::new(name.clone(), constraint.clone()));
        let tools = self
            .tool_requires
            .iter()
            .map(|(name, constraint)| Requirement::tool(name.clone(), constraint.clone()));
        runtime.chain(tools).collect()
    }
}

fn default_include_dirs() -> Vec<String> {
    vec!["include".to_string()]
}

fn default_lib_dirs() -> Vec<String> {
    vec!["lib".to_string()]
}

fn default_bin_dirs() -> Vec<String> {
    vec!["bin".to_string()]
}
