use anyhow::{anyhow, Result};

/// Keys the descriptor writes for every package on its own.
pub const RESERVED_PACKAGE_VARIABLES: [&str; 2] = ["version", "build_only"];

/// Build variable keys are ASCII letters, digits and `_`, and do not start
/// with a digit. They never contain `.`, so `<package>.<key>` splits
/// unambiguously at its last dot.
pub fn validate_variable_name(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(anyhow!("variable name must not be empty"));
    }
    if key.starts_with(|ch: char| ch.is_ascii_digit()) {
        return Err(anyhow!("variable name must not start with a digit: {key:?}"));
    }
    if key
        .chars()
        .any(|ch| !(ch.is_ascii_alphanumeric() || ch == '_'))
    {
        return Err(anyhow!("variable name contains invalid character(s): {key:?}"));
    }
    Ok(())
}

/// [`validate_variable_name`], additionally rejecting the per-package keys
/// the descriptor writes itself (compared case-insensitively).
pub fn validate_package_variable(key: &str) -> Result<()> {
    validate_variable_name(key)?;
    if RESERVED_PACKAGE_VARIABLES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(key))
    {
        return Err(anyhow!(
            "variable '{key}' is reserved for package metadata"
        ));
    }
    Ok(())
}
