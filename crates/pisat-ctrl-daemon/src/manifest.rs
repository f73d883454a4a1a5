//! Startup manifest parsing.
//!
//! The manifest lists one component per line as comma-separated fields. The
//! first field is a status marker; a `!` anywhere in it ends the list, and that
//! record is not included. The component name is the fourth field.

use std::path::Path;

use crate::error::DaemonError;

/// Marker in the status field that ends the significant part of the manifest.
pub const END_MARKER: char = '!';

const NAME_FIELD: usize = 3;

/// Component names listed before the end marker, in file order.
pub fn parse_components(content: &str) -> Vec<String> {
    let mut names = Vec::new();
    for line in content.lines() {
        let fields: Vec<&str> = line.split(',').collect();
        if fields[0].contains(END_MARKER) {
            break;
        }
        if let Some(name) = fields.get(NAME_FIELD) {
            names.push(name.trim().to_string());
        }
    }
    names
}

/// The comma-joined component list reported in telemetry.
pub fn component_summary(content: &str) -> String {
    parse_components(content).join(", ")
}

/// Read the manifest at `path` and summarise its components.
pub fn read_component_summary(path: &Path) -> Result<String, DaemonError> {
    let content = std::fs::read_to_string(path).map_err(|source| DaemonError::Manifest {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(component_summary(&content))
}
