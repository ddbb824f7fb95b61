//! Test file discovery below the test source root

use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Error, Result};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Test files matching `test_glob`, sorted by path.
///
/// A non-empty `test_order` is authoritative: exactly those files, in that
/// order, relative to `test_root` unless absolute.
pub fn discover(test_root: &Path, test_glob: &str, test_order: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if !test_order.is_empty() {
        return ordered(test_root, test_order);
    }

    let pattern = Pattern::new(test_glob)
        .map_err(|e| Error::Config(format!("Invalid test glob '{test_glob}': {e}")))?;

    if !test_root.is_dir() {
        info!("Test source directory {} does not exist", test_root.display());
        return Ok(Vec::new());
    }

    let files: Vec<PathBuf> = WalkDir::new(test_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .strip_prefix(test_root)
                .map(|rel| matches(&pattern, rel))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();

    debug!(
        "Discovered {} test files under {} matching {}",
        files.len(),
        test_root.display(),
        test_glob
    );
    Ok(files)
}

/// `**/` also matches zero directories, so `**/*Test.php` covers the root itself
fn matches(pattern: &Pattern, relative: &Path) -> bool {
    if pattern.matches_path_with(relative, MATCH_OPTIONS) {
        return true;
    }
    match pattern.as_str().strip_prefix("**/") {
        Some(rest) => Pattern::new(rest)
            .map(|p| p.matches_path_with(relative, MATCH_OPTIONS))
            .unwrap_or(false),
        None => false,
    }
}

fn ordered(test_root: &Path, test_order: &[PathBuf]) -> Result<Vec<PathBuf>> {
    test_order
        .iter()
        .map(|listed| {
            let file = if listed.is_absolute() {
                listed.clone()
            } else {
                test_root.join(listed)
            };
            if file.is_file() {
                Ok(file)
            } else {
                Err(Error::Config(format!(
                    "Test file {} listed in test_order does not exist",
                    file.display()
                )))
            }
        })
        .collect()
}
