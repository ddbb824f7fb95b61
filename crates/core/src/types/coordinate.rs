use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::impl_case_insensitive_deserialize;

/// A `group:artifact:version` dependency identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
    pub version: String,
}

impl Coordinate {
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
        }
    }

    /// `group:artifact`, the version-less key used by namespace mappings
    pub fn key(&self) -> String {
        format!("{}:{}", self.group, self.artifact)
    }

    /// Maven-style location below a local artifact cache
    pub fn cache_path(&self, cache: &Path) -> PathBuf {
        let mut path = cache.to_path_buf();
        for segment in self.group.split('.') {
            path.push(segment);
        }
        path.join(&self.artifact).join(&self.version)
    }
}

impl FromStr for Coordinate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        match parts.as_slice() {
            [group, artifact, version]
                if !group.is_empty() && !artifact.is_empty() && !version.is_empty() =>
            {
                Ok(Self::new(*group, *artifact, *version))
            }
            _ => Err(Error::InvalidCoordinate(s.to_string())),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}

impl Serialize for Coordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Coordinate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// How a dependency contributes to the include path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    /// A directory tree of PHP sources
    #[default]
    LibraryRoot,
    /// Installed by the external package manager below its shared root
    PearManaged,
    /// One PHP file; its directory joins the include path
    SingleFile,
}

impl_case_insensitive_deserialize!(
    DependencyKind,
    LibraryRoot => "library-root",
    PearManaged => "pear-managed",
    SingleFile => "single-file"
);

/// A declared dependency after its filesystem root has been located
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub coordinate: Coordinate,
    pub root: PathBuf,
    pub kind: DependencyKind,
}
