use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::requirement::{validate_package_name, Requirement};
use crate::variable::validate_variable_name;
use crate::version::deserialize_lenient_version;

/// The consuming project's manifest: what it requires and which global
/// toolchain variables it wants emitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectManifest {
    pub name: String,
    #[serde(deserialize_with = "deserialize_lenient_version")]
    pub version: Version,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub tool_requires: Vec<String>,
    #[serde(default)]
    pub toolchain: BTreeMap<String, toml::Value>,
}

impl ProjectManifest {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(input).context("failed to parse project manifest")?;
        validate_package_name(&manifest.name)?;
        manifest.requirements()?;
        manifest.toolchain_variables()?;
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read project manifest: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed parsing project manifest: {}", path.display()))
    }

    /// Root requirements in declaration order, tool references last.
    pub fn requirements(&self) -> Result<Vec<Requirement>> {
        let mut seen = HashSet::new();
        let mut requirements = Vec::with_capacity(self.requires.len() + self.tool_requires.len());

        let runtime = self.requires.iter().map(|reference| (reference, false));
        let tools = self.tool_requires.iter().map(|reference| (reference, true));
        for (reference, build_only) in runtime.chain(tools) {
            let requirement = Requirement::parse_reference(reference)?.with_build_only(build_only);
            if !seen.insert(requirement.name.clone()) {
                return Err(anyhow!(
                    "project '{}' references package '{}' more than once",
                    self.name,
                    requirement.name
                ));
            }
            requirements.push(requirement);
        }

        Ok(requirements)
    }

    /// The `[toolchain]` table flattened to strings. Booleans render as
    /// `ON`/`OFF`, the spelling build tools expect for switches.
    pub fn toolchain_variables(&self) -> Result<BTreeMap<String, String>> {
        let mut variables = BTreeMap::new();
        for (key, value) in &self.toolchain {
            validate_variable_name(key)
                .with_context(|| format!("invalid toolchain variable in project '{}'", self.name))?;
            let rendered = match value {
                toml::Value::String(text) => text.clone(),
                toml::Value::Boolean(true) => "ON".to_string(),
                toml::Value::Boolean(false) => "OFF".to_string(),
                toml::Value::Integer(number) => number.to_string(),
                toml::Value::Float(number) => number.to_string(),
                other => {
                    return Err(anyhow!(
                        "toolchain variable '{key}' must be a string, boolean or number, got {}",
                        other.type_str()
                    ));
                }
            };
            variables.insert(key.clone(), rendered);
        }
        Ok(variables)
    }
}
