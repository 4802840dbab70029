use std::collections::BTreeMap;
use std::fmt::Write as _;

use depforge_core::validate_variable_name;
use depforge_resolver::{BuildPlan, PackageNode};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::error::EmitError;
use crate::format::DescriptorFormat;

const HEADER: &str = "# depforge toolchain descriptor";

/// Renders the default `package.key=value` descriptor for `plan`.
pub fn emit(plan: &BuildPlan<'_>) -> String {
    render_key_value(&BTreeMap::new(), &selected_batches(plan, true))
}

/// SHA-256 of a rendered descriptor, hex encoded. Stable for identical
/// input, so it can key build caches.
pub fn fingerprint(descriptor: &str) -> String {
    hex::encode(Sha256::digest(descriptor.as_bytes()))
}

#[derive(Debug, Clone)]
pub struct Emitter {
    format: DescriptorFormat,
    include_build_only: bool,
    globals: BTreeMap<String, String>,
}

impl Default for Emitter {
    fn default() -> Self {
        Self {
            format: DescriptorFormat::KeyValue,
            include_build_only: true,
            globals: BTreeMap::new(),
        }
    }
}

impl Emitter {
    pub fn new(format: DescriptorFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    pub fn format(&self) -> DescriptorFormat {
        self.format
    }

    pub fn include_build_only(mut self, include: bool) -> Self {
        self.include_build_only = include;
        self
    }

    /// Variables emitted once, ahead of every package section.
    pub fn with_globals(mut self, globals: BTreeMap<String, String>) -> Self {
        self.globals = globals;
        self
    }

    pub fn with_global(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.globals.insert(key.into(), value.into());
        self
    }

    /// Output depends only on the plan and the emitter settings: batch
    /// order, name order within a batch and key order within a package.
    pub fn render(&self, plan: &BuildPlan<'_>) -> Result<String, EmitError> {
        for key in self.globals.keys() {
            validate_variable_name(key).map_err(|source| EmitError::InvalidGlobal {
                key: key.clone(),
                source,
            })?;
        }

        let batches = selected_batches(plan, self.include_build_only);
        match self.format {
            DescriptorFormat::KeyValue => Ok(render_key_value(&self.globals, &batches)),
            DescriptorFormat::Cmake => render_cmake(&self.globals, &batches),
            DescriptorFormat::Json => Ok(render_json(&self.globals, &batches)),
        }
    }
}

fn selected_batches<'g>(
    plan: &BuildPlan<'g>,
    include_build_only: bool,
) -> Vec<Vec<&'g PackageNode>> {
    plan.batches()
        .iter()
        .map(|batch| {
            batch
                .iter()
                .copied()
                .filter(|node| include_build_only || !node.is_build_only())
                .collect()
        })
        .collect()
}

// Package names never hold line breaks and variable keys never hold `.`,
// so `<package>.<key>` lines cannot be forged or shadowed by a variable.
fn render_key_value(
    globals: &BTreeMap<String, String>,
    batches: &[Vec<&PackageNode>],
) -> String {
    let mut out = String::new();
    write_header(&mut out, batches);

    if !globals.is_empty() {
        out.push_str("# --- globals ---\n");
        for (key, value) in globals {
            let _ = writeln!(out, "{key}={}", escape_value(value));
        }
    }

    for (index, batch) in batches.iter().enumerate() {
        let _ = writeln!(out, "# --- batch {index} ---");
        for node in batch {
            let name = node.name();
            let _ = writeln!(out, "{name}.version={}", node.version);
            if node.is_build_only() {
                let _ = writeln!(out, "{name}.build_only=true");
            }
            for (key, value) in &node.variables {
                let _ = writeln!(out, "{name}.{key}={}", escape_value(value));
            }
        }
    }
    out
}

/// CMake `set()` lines, refusing to set one variable twice.
struct CmakeWriter {
    out: String,
    claimed: BTreeMap<String, String>,
}

impl CmakeWriter {
    fn set(&mut self, identifier: String, origin: String, value: &str) -> Result<(), EmitError> {
        if let Some(first) = self.claimed.get(&identifier) {
            return Err(EmitError::IdentifierCollision {
                identifier,
                first: first.clone(),
                second: origin,
            });
        }
        let _ = writeln!(self.out, "set({identifier} {value})");
        self.claimed.insert(identifier, origin);
        Ok(())
    }
}

fn render_cmake(
    globals: &BTreeMap<String, String>,
    batches: &[Vec<&PackageNode>],
) -> Result<String, EmitError> {
    let mut writer = CmakeWriter {
        out: String::new(),
        claimed: BTreeMap::new(),
    };
    write_header(&mut writer.out, batches);

    if !globals.is_empty() {
        writer.out.push_str("# --- globals ---\n");
        for (key, value) in globals {
            writer.set(
                cmake_identifier(key),
                format!("global '{key}'"),
                &quote_cmake(value),
            )?;
        }
    }

    for (index, batch) in batches.iter().enumerate() {
        let _ = writeln!(writer.out, "# --- batch {index} ---");
        for node in batch {
            let name = node.name();
            let prefix = cmake_identifier(name);
            writer.set(
                format!("{prefix}_VERSION"),
                format!("'{name}.version'"),
                &quote_cmake(&node.version.to_string()),
            )?;
            if node.is_build_only() {
                writer.set(
                    format!("{prefix}_BUILD_ONLY"),
                    format!("'{name}.build_only'"),
                    "ON",
                )?;
            }
            for (key, value) in &node.variables {
                writer.set(
                    format!("{prefix}_{}", cmake_identifier(key)),
                    format!("'{name}.{key}'"),
                    &quote_cmake(value),
                )?;
            }
        }
    }
    Ok(writer.out)
}

fn render_json(globals: &BTreeMap<String, String>, batches: &[Vec<&PackageNode>]) -> String {
    let batches: Vec<Vec<serde_json::Value>> = batches
        .iter()
        .map(|batch| {
            batch
                .iter()
                .map(|node| {
                    json!({
                        "name": node.name(),
                        "version": node.version.to_string(),
                        "build_only": node.is_build_only(),
                        "dependencies": &node.dependencies,
                        "variables": &node.variables,
                    })
                })
                .collect()
        })
        .collect();

    let document = json!({
        "globals": globals,
        "batches": batches,
    });
    format!("{document:#}\n")
}

fn write_header(out: &mut String, batches: &[Vec<&PackageNode>]) {
    let packages: usize = batches.iter().map(Vec::len).sum();
    out.push_str(HEADER);
    out.push('\n');
    let _ = writeln!(out, "# packages: {packages}, batches: {}", batches.len());
}

fn escape_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}

fn quote_cmake(value: &str) -> String {
    format!("\"{}\"", escape_value(value).replace('"', "\\\""))
}

/// Upper-cases and replaces anything outside `[A-Za-z0-9_]` with `_`.
fn cmake_identifier(raw: &str) -> String {
    raw.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
