use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Output syntax of a toolchain descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorFormat {
    /// `package.key=value` lines.
    #[default]
    KeyValue,
    /// `set(PACKAGE_KEY "value")` lines, includable from a CMake toolchain file.
    Cmake,
    /// A single JSON document describing globals and batches.
    Json,
}

impl DescriptorFormat {
    pub fn file_extension(self) -> &'static str {
        match self {
            Self::KeyValue => "env",
            Self::Cmake => "cmake",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for DescriptorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::KeyValue => "keyvalue",
            Self::Cmake => "cmake",
            Self::Json => "json",
        })
    }
}

impl FromStr for DescriptorFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyvalue" | "kv" | "env" => Ok(Self::KeyValue),
            "cmake" => Ok(Self::Cmake),
            "json" => Ok(Self::Json),
            other => Err(anyhow!("unknown descriptor format '{other}'")),
        }
    }
}
