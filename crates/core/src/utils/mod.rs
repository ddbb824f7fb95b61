//! Small helpers shared across modules

pub mod serde_helpers;

use std::path::Path;

/// Render a path with forward slashes, as used for archive entries and PHP strings
pub fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Quote a string as a single-quoted PHP literal
pub fn php_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
