//! Read-only view of an external package manager's installation

use std::path::{Path, PathBuf};

use crate::types::Coordinate;

/// Answers "is artifact X installed at path P" for the external package manager.
///
/// The resolver never installs anything; fetching is the collaborator's job
/// and happens before the build step starts.
pub trait PackageRegistry: Send + Sync {
    /// Shared root all managed packages are installed below
    fn install_root(&self, local_cache: &Path) -> PathBuf;

    fn is_installed(&self, coordinate: &Coordinate, root: &Path) -> bool;

    /// Path reported to the user when a package is missing
    fn expected_location(&self, coordinate: &Coordinate, root: &Path) -> PathBuf;

    fn name(&self) -> &'static str;
}

/// PEAR layout: packages share `php_dir`, each one leaves a `.registry/<name>.reg` record
#[derive(Debug, Clone, Default)]
pub struct PearRegistry {
    php_dir: Option<PathBuf>,
}

impl PearRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing `php_dir` instead of the one below the local cache
    pub fn with_php_dir(php_dir: impl Into<PathBuf>) -> Self {
        Self {
            php_dir: Some(php_dir.into()),
        }
    }

    fn record(coordinate: &Coordinate, root: &Path) -> PathBuf {
        root.join(".registry")
            .join(format!("{}.reg", coordinate.artifact.to_lowercase()))
    }
}

impl PackageRegistry for PearRegistry {
    fn install_root(&self, local_cache: &Path) -> PathBuf {
        self.php_dir
            .clone()
            .unwrap_or_else(|| local_cache.join("pear").join("php"))
    }

    fn is_installed(&self, coordinate: &Coordinate, root: &Path) -> bool {
        Self::record(coordinate, root).is_file() || root.join(&coordinate.artifact).is_dir()
    }

    fn expected_location(&self, coordinate: &Coordinate, root: &Path) -> PathBuf {
        Self::record(coordinate, root)
    }

    fn name(&self) -> &'static str {
        "pear"
    }
}
