use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use super::coordinate::Coordinate;

/// Separator PHP expects between include path roots
#[cfg(windows)]
pub const PATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
pub const PATH_SEPARATOR: char = ':';

/// Where an include path root came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "coordinate")]
pub enum EntryOrigin {
    Dependency(Coordinate),
    /// Shared install root of the external package manager
    PackageManager,
    /// The project's own sources
    Project,
}

impl fmt::Display for EntryOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryOrigin::Dependency(coordinate) => write!(f, "{coordinate}"),
            EntryOrigin::PackageManager => f.write_str("package manager"),
            EntryOrigin::Project => f.write_str("project"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeEntry {
    pub root: PathBuf,
    pub origin: EntryOrigin,
    /// Set for single-file dependencies: only this file below `root` belongs to the entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl IncludeEntry {
    pub fn new(root: impl Into<PathBuf>, origin: EntryOrigin) -> Self {
        Self {
            root: root.into(),
            origin,
            file: None,
        }
    }

    pub fn single_file(file: impl Into<PathBuf>, origin: EntryOrigin) -> Self {
        let file = file.into();
        let root = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            root,
            origin,
            file: Some(file),
        }
    }

    /// Whether `relative` resolves to a file owned by this entry
    pub fn defines(&self, relative: &Path) -> bool {
        let candidate = self.root.join(relative);
        match &self.file {
            Some(file) => &candidate == file,
            None => candidate.is_file(),
        }
    }
}

/// A relative source path defined under more than one root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shadowing {
    pub relative: PathBuf,
    /// Root that wins lookups
    pub winner: PathBuf,
    pub shadowed: PathBuf,
}

/// Ordered include path; the first root defining a file wins.
///
/// Built once by the resolver and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct IncludePath {
    entries: Vec<IncludeEntry>,
    shadowing: Vec<Shadowing>,
}

impl IncludePath {
    pub fn entries(&self) -> &[IncludeEntry] {
        &self.entries
    }

    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|e| e.root.as_path())
    }

    pub fn shadowing(&self) -> &[Shadowing] {
        &self.shadowing
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Root of the first entry that defines `relative`
    pub fn lookup(&self, relative: impl AsRef<Path>) -> Option<&Path> {
        let relative = relative.as_ref();
        self.entries
            .iter()
            .find(|entry| entry.defines(relative))
            .map(|entry| entry.root.as_path())
    }

    /// Roots joined for PHP's `include_path` setting
    pub fn to_search_path(&self) -> String {
        let mut joined = String::new();
        let mut seen: Vec<&Path> = Vec::new();
        for root in self.roots() {
            if seen.contains(&root) {
                continue;
            }
            seen.push(root);
            if !joined.is_empty() {
                joined.push(PATH_SEPARATOR);
            }
            joined.push_str(&root.to_string_lossy());
        }
        joined
    }
}

/// Accumulates entries in precedence order, then freezes them into an [`IncludePath`]
#[derive(Debug, Default)]
pub struct IncludePathBuilder {
    entries: Vec<IncludeEntry>,
}

impl IncludePathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append with lowest precedence; a root already present keeps its position
    pub fn append(&mut self, entry: IncludeEntry) -> &mut Self {
        if !self.contains(&entry) {
            self.entries.push(entry);
        }
        self
    }

    /// Insert with highest precedence; a root already present is moved to the front
    pub fn prepend(&mut self, entry: IncludeEntry) -> &mut Self {
        self.entries.retain(|e| !(e.root == entry.root && e.file == entry.file));
        self.entries.insert(0, entry);
        self
    }

    pub fn entries(&self) -> &[IncludeEntry] {
        &self.entries
    }

    pub fn build(self, shadowing: Vec<Shadowing>) -> IncludePath {
        IncludePath {
            entries: self.entries,
            shadowing,
        }
    }

    fn contains(&self, entry: &IncludeEntry) -> bool {
        self.entries
            .iter()
            .any(|e| e.root == entry.root && (e.file.is_none() || e.file == entry.file))
    }
}
