// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsing of `.conf`/`.override` TOML files into [`JobClassDefinition`]s.
//!
//! Mirrors the runbook parser's "serde does the heavy lifting, then a name
//! fixup pass" shape: deserialize, inject the file-stem-derived name, then
//! run the handful of semantic checks the external grammar can't express
//! as a serde constraint.

use crate::error::ConfigError;
use std::path::Path;
use sv_core::JobClassDefinition;

/// Parse a primary `.conf` file's contents into a class definition, with
/// the name fixed up from the file stem (the map-key-injection idiom used
/// for every other declarative record in this codebase).
pub fn parse_primary(path: &Path, content: &str) -> Result<JobClassDefinition, ConfigError> {
    let mut class: JobClassDefinition =
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
        class.name = stem.to_string();
    }
    validate(path, &class)?;
    Ok(class)
}

/// Parse an `.override` file's contents as a partial overlay and apply it
/// on top of an already-parsed primary definition. The overlay TOML only
/// needs to set the fields it wants to change; anything absent is left
/// untouched on `base`.
pub fn apply_overlay(
    path: &Path,
    content: &str,
    base: JobClassDefinition,
) -> Result<JobClassDefinition, ConfigError> {
    let overlay: toml::Value = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let mut base_value = toml::Value::try_from(&base).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    merge_tables(&mut base_value, overlay);
    let mut merged: JobClassDefinition =
        base_value
            .try_into()
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
    merged.name = base.name;
    validate(path, &merged)?;
    Ok(merged)
}

fn merge_tables(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_tables(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Checks the external stanza grammar would normally enforce at parse time:
/// every process slot carries a non-empty command, and `kill_timeout`/
/// `respawn.interval` are not zero.
fn validate(path: &Path, class: &JobClassDefinition) -> Result<(), ConfigError> {
    for slot in &class.process {
        if slot.command.trim().is_empty() {
            return Err(ConfigError::MissingCommand {
                path: path.to_path_buf(),
            });
        }
    }
    if class.process.is_empty() {
        return Err(ConfigError::Semantic {
            path: path.to_path_buf(),
            message: "job class has no process slots".to_string(),
        });
    }
    if class.respawn.enabled && class.respawn.interval_secs == 0 {
        return Err(ConfigError::Semantic {
            path: path.to_path_buf(),
            message: "respawn interval must be nonzero".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
