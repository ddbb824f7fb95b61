//! Planning phase: which file goes where inside the archive

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::{
    error::{Error, Result},
    resolver::entry_files,
    types::{EntryOrigin, IncludePath},
    utils::slash_path,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutEntry {
    /// Slash-separated path inside the archive
    pub destination: String,
    pub source: PathBuf,
}

/// Collision-free mapping of archive paths to source files, sorted by destination
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveLayout {
    entries: Vec<LayoutEntry>,
}

impl ArchiveLayout {
    /// Plan the archive for every dependency root plus the project sources.
    ///
    /// `namespace_map` maps `group:artifact` to a namespace whose path form
    /// prefixes that dependency's files. Project entries of the include path
    /// are skipped; pass project trees through `project_sources`.
    pub fn plan(
        include_path: &IncludePath,
        project_sources: &[PathBuf],
        namespace_map: &BTreeMap<String, String>,
    ) -> Result<Self> {
        let mut planner = Planner::default();

        for entry in include_path.entries() {
            let prefix = match &entry.origin {
                EntryOrigin::Project => continue,
                EntryOrigin::Dependency(coordinate) => namespace_map
                    .get(&coordinate.key())
                    .map(|ns| namespace_prefix(ns)),
                EntryOrigin::PackageManager => None,
            };
            for relative in entry_files(entry) {
                planner.add(prefix.as_deref(), &relative, entry.root.join(&relative))?;
            }
        }

        for source in project_sources {
            if source.is_file() {
                let name = source.file_name().map(PathBuf::from).unwrap_or_default();
                planner.add(None, &name, source.clone())?;
                continue;
            }
            for relative in tree_files(source) {
                planner.add(None, &relative, source.join(&relative))?;
            }
        }

        let mut entries = planner.entries;
        entries.sort_by(|a, b| a.destination.cmp(&b.destination));
        debug!("Planned archive with {} entries", entries.len());
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn destinations(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.destination.as_str())
    }
}

#[derive(Default)]
struct Planner {
    entries: Vec<LayoutEntry>,
    owners: HashMap<String, PathBuf>,
}

impl Planner {
    fn add(&mut self, prefix: Option<&str>, relative: &Path, source: PathBuf) -> Result<()> {
        let relative = slash_path(relative);
        let destination = match prefix {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}/{relative}"),
            _ => relative,
        };
        if let Some(first) = self.owners.get(&destination) {
            return Err(Error::LayoutCollision {
                destination,
                first: first.clone(),
                second: source,
            });
        }
        self.owners.insert(destination.clone(), source.clone());
        self.entries.push(LayoutEntry { destination, source });
        Ok(())
    }
}

/// `Acme\Util` becomes `Acme/Util`
fn namespace_prefix(namespace: &str) -> String {
    namespace
        .split(['\\', '/'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn tree_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect()
}
