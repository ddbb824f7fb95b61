//! Dependency resolution: declared coordinates to an ordered include path

pub mod registry;
pub mod search_path;

pub use registry::{PackageRegistry, PearRegistry};

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{
    config::{Config, DependencySpec},
    error::{Error, Result},
    impl_case_insensitive_deserialize,
    types::{
        Dependency, DependencyKind, EntryOrigin, IncludeEntry, IncludePath, IncludePathBuilder,
        Shadowing,
    },
};

/// Who owns dependency installation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManagementMode {
    /// Installed by an external package manager; its shared root is prepended
    ExternalPackageManager,
    /// Pre-resolved artifact directories, appended in declaration order
    #[default]
    ArtifactDirectory,
}

impl_case_insensitive_deserialize!(
    ManagementMode,
    ExternalPackageManager => "external-package-manager",
    ArtifactDirectory => "artifact-directory"
);

/// Turns declared dependencies into an [`IncludePath`]
pub struct DependencyResolver {
    registry: Box<dyn PackageRegistry>,
    classloader_base: Option<PathBuf>,
    project_roots: Vec<PathBuf>,
    reject_conflicts: bool,
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self {
            registry: Box::new(PearRegistry::new()),
            classloader_base: None,
            project_roots: Vec::new(),
            reject_conflicts: false,
        }
    }

    /// Resolver set up from configuration; `project_roots` are appended after dependencies
    pub fn from_config(config: &Config, project_roots: Vec<PathBuf>) -> Self {
        Self {
            registry: Box::new(PearRegistry::new()),
            classloader_base: config.classloader_base.as_deref().map(|p| config.resolve(p)),
            project_roots,
            reject_conflicts: config.reject_conflicts,
        }
    }

    pub fn with_registry(mut self, registry: Box<dyn PackageRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_classloader_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.classloader_base = Some(base.into());
        self
    }

    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_roots.push(root.into());
        self
    }

    pub fn with_reject_conflicts(mut self, reject: bool) -> Self {
        self.reject_conflicts = reject;
        self
    }

    /// Resolve `declared` in declaration order.
    ///
    /// Missing roots fail with [`Error::MissingDependencyRoot`]; nothing is
    /// skipped silently. Relative explicit paths are taken as they are, so
    /// callers pass them already resolved.
    pub fn resolve(
        &self,
        declared: &[DependencySpec],
        local_cache: &Path,
        mode: ManagementMode,
    ) -> Result<IncludePath> {
        if let Some(base) = &self.classloader_base {
            if !base.is_dir() {
                return Err(Error::MissingClassloaderBase { path: base.clone() });
            }
        }

        info!(
            "Resolving {} dependencies ({:?}) against {}",
            declared.len(),
            mode,
            local_cache.display()
        );

        let mut builder = IncludePathBuilder::new();
        let mut managed_root: Option<PathBuf> = None;

        for spec in declared {
            let managed = mode == ManagementMode::ExternalPackageManager && spec.path.is_none();
            let dependency = if managed {
                let root = managed_root
                    .get_or_insert_with(|| self.registry.install_root(local_cache))
                    .clone();
                self.locate_managed(spec, &root)?
            } else {
                self.locate_artifact(spec, local_cache)?
            };
            debug!(
                "Dependency {} -> {} ({:?})",
                dependency.coordinate,
                dependency.root.display(),
                dependency.kind
            );

            if dependency.kind == DependencyKind::PearManaged {
                // Lives below the shared root prepended after the loop
                continue;
            }
            let origin = EntryOrigin::Dependency(dependency.coordinate.clone());
            match dependency.kind {
                DependencyKind::SingleFile => {
                    builder.append(IncludeEntry::single_file(dependency.root, origin));
                }
                _ => {
                    builder.append(IncludeEntry::new(dependency.root, origin));
                }
            }
        }

        if let Some(root) = managed_root {
            debug!("Prepending {} root {}", self.registry.name(), root.display());
            builder.prepend(IncludeEntry::new(root, EntryOrigin::PackageManager));
        }

        for root in &self.project_roots {
            if root.is_dir() {
                builder.append(IncludeEntry::new(root.clone(), EntryOrigin::Project));
            } else {
                debug!("Skipping absent project root {}", root.display());
            }
        }

        let shadowing = find_shadowing(builder.entries());
        for shadow in &shadowing {
            warn!(
                "{} is defined under {} and {}; {} wins",
                shadow.relative.display(),
                shadow.winner.display(),
                shadow.shadowed.display(),
                shadow.winner.display()
            );
        }
        if self.reject_conflicts {
            if let Some(shadow) = shadowing.first() {
                return Err(Error::ConflictingDefinition {
                    relative: shadow.relative.to_string_lossy().into_owned(),
                    first: shadow.winner.clone(),
                    second: shadow.shadowed.clone(),
                });
            }
        }

        let include_path = builder.build(shadowing);
        info!("Include path: {}", include_path.to_search_path());
        Ok(include_path)
    }

    fn locate_managed(&self, spec: &DependencySpec, root: &Path) -> Result<Dependency> {
        if !root.is_dir() || !self.registry.is_installed(&spec.coordinate, root) {
            return Err(Error::MissingDependencyRoot {
                coordinate: spec.coordinate.to_string(),
                expected: self.registry.expected_location(&spec.coordinate, root),
            });
        }
        Ok(Dependency {
            coordinate: spec.coordinate.clone(),
            root: root.to_path_buf(),
            kind: DependencyKind::PearManaged,
        })
    }

    fn locate_artifact(&self, spec: &DependencySpec, local_cache: &Path) -> Result<Dependency> {
        let root = spec
            .path
            .clone()
            .unwrap_or_else(|| spec.coordinate.cache_path(local_cache));
        let present = match spec.kind {
            DependencyKind::SingleFile => root.is_file(),
            DependencyKind::LibraryRoot | DependencyKind::PearManaged => root.is_dir(),
        };
        if !present {
            return Err(Error::MissingDependencyRoot {
                coordinate: spec.coordinate.to_string(),
                expected: root,
            });
        }
        // An explicitly located PEAR package is just another library root
        let kind = match spec.kind {
            DependencyKind::PearManaged => DependencyKind::LibraryRoot,
            other => other,
        };
        Ok(Dependency {
            coordinate: spec.coordinate.clone(),
            root,
            kind,
        })
    }
}

/// Resolve with the default PEAR registry and no project roots
pub fn resolve(
    declared: &[DependencySpec],
    local_cache: &Path,
    mode: ManagementMode,
) -> Result<IncludePath> {
    DependencyResolver::new().resolve(declared, local_cache, mode)
}

/// Relative paths defined by more than one entry, in include path order
fn find_shadowing(entries: &[IncludeEntry]) -> Vec<Shadowing> {
    let mut owners: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut shadowing = Vec::new();

    for entry in entries {
        for relative in entry_files(entry) {
            match owners.get(&relative) {
                Some(winner) if winner != &entry.root => shadowing.push(Shadowing {
                    relative,
                    winner: winner.clone(),
                    shadowed: entry.root.clone(),
                }),
                Some(_) => {}
                None => {
                    owners.insert(relative, entry.root.clone());
                }
            }
        }
    }

    shadowing
}

/// Files contributed by an entry, relative to its root, sorted
pub(crate) fn entry_files(entry: &IncludeEntry) -> Vec<PathBuf> {
    if let Some(file) = &entry.file {
        return file
            .strip_prefix(&entry.root)
            .map(|rel| vec![rel.to_path_buf()])
            .unwrap_or_default();
    }

    WalkDir::new(&entry.root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden_dir(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.path().strip_prefix(&entry.root).ok().map(Path::to_path_buf))
        .collect()
}

/// VCS metadata and registries (`.git`, `.svn`, `.registry`) never count as sources
fn is_hidden_dir(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coordinate;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn spec(artifact: &str) -> DependencySpec {
        DependencySpec::new(Coordinate::new("org.example", artifact, "1.0"))
    }

    #[test]
    fn test_include_path_follows_declaration_order() {
        let cache = TempDir::new().unwrap();
        let names = ["zeta", "alpha", "mid"];
        for name in names {
            fs::create_dir_all(
                Coordinate::new("org.example", name, "1.0").cache_path(cache.path()),
            )
            .unwrap();
        }

        for order in [[0, 1, 2], [2, 0, 1], [1, 2, 0]] {
            let declared: Vec<_> = order.iter().map(|&i| spec(names[i])).collect();
            let path = resolve(&declared, cache.path(), ManagementMode::ArtifactDirectory).unwrap();
            let expected: Vec<PathBuf> = declared
                .iter()
                .map(|d| d.coordinate.cache_path(cache.path()))
                .collect();
            let actual: Vec<PathBuf> = path.roots().map(Path::to_path_buf).collect();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_missing_root_names_dependency_and_path() {
        let cache = TempDir::new().unwrap();
        let err = resolve(&[spec("ghost")], cache.path(), ManagementMode::ArtifactDirectory)
            .unwrap_err();
        match err {
            Error::MissingDependencyRoot {
                coordinate,
                expected,
            } => {
                assert_eq!(coordinate, "org.example:ghost:1.0");
                assert_eq!(expected, cache.path().join("org/example/ghost/1.0"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_classloader_base_fails_before_dependencies() {
        let cache = TempDir::new().unwrap();
        let resolver =
            DependencyResolver::new().with_classloader_base(cache.path().join("no-such-base"));
        let err = resolver
            .resolve(&[spec("ghost")], cache.path(), ManagementMode::ArtifactDirectory)
            .unwrap_err();
        assert!(matches!(err, Error::MissingClassloaderBase { .. }));
    }

    #[test]
    fn test_external_mode_prepends_shared_root_once() {
        let cache = TempDir::new().unwrap();
        let pear = cache.path().join("pear/php");
        write(&pear.join(".registry/phpunit.reg"), "");
        write(&pear.join(".registry/php_timer.reg"), "");
        let local = cache.path().join("local-lib");
        fs::create_dir_all(&local).unwrap();

        let declared = vec![
            DependencySpec::new(Coordinate::new("de.phpunit", "PHPUnit", "3.6.10")),
            spec("local").with_path(&local),
            DependencySpec::new(Coordinate::new("de.phpunit", "PHP_Timer", "1.0.0")),
        ];
        let path = resolve(&declared, cache.path(), ManagementMode::ExternalPackageManager)
            .unwrap();
        let roots: Vec<_> = path.roots().collect();
        assert_eq!(roots, vec![pear.as_path(), local.as_path()]);
        assert_eq!(path.entries()[0].origin, EntryOrigin::PackageManager);
    }

    #[test]
    fn test_external_mode_reports_uninstalled_package() {
        let cache = TempDir::new().unwrap();
        fs::create_dir_all(cache.path().join("pear/php")).unwrap();
        let declared =
            vec![DependencySpec::new(Coordinate::new("de.phpunit", "PHPUnit", "3.6.10"))];
        let err = resolve(&declared, cache.path(), ManagementMode::ExternalPackageManager)
            .unwrap_err();
        assert!(err.to_string().contains("de.phpunit:PHPUnit:3.6.10"));
        assert!(err.to_string().contains("phpunit.reg"));
    }

    #[test]
    fn test_single_file_dependency_contributes_its_directory() {
        let cache = TempDir::new().unwrap();
        let file = cache.path().join("vendor/helper.php");
        write(&file, "<?php");
        let declared = vec![spec("helper")
            .with_kind(DependencyKind::SingleFile)
            .with_path(&file)];
        let path = resolve(&declared, cache.path(), ManagementMode::ArtifactDirectory).unwrap();
        assert_eq!(path.entries()[0].root, cache.path().join("vendor"));
        assert_eq!(path.entries()[0].file.as_deref(), Some(file.as_path()));
    }

    #[test]
    fn test_shadowed_definitions_first_root_wins_or_reject() {
        let cache = TempDir::new().unwrap();
        let first = cache.path().join("first");
        let second = cache.path().join("second");
        write(&first.join("Acme/Util.php"), "<?php class Acme_Util {}");
        write(&second.join("Acme/Util.php"), "<?php class Acme_Util { /* v2 */ }");
        let declared = vec![
            spec("first").with_path(&first),
            spec("second").with_path(&second),
        ];

        let path = resolve(&declared, cache.path(), ManagementMode::ArtifactDirectory).unwrap();
        assert_eq!(path.shadowing().len(), 1);
        assert_eq!(path.shadowing()[0].winner, first);
        assert_eq!(path.lookup("Acme/Util.php"), Some(first.as_path()));

        let err = DependencyResolver::new()
            .with_reject_conflicts(true)
            .resolve(&declared, cache.path(), ManagementMode::ArtifactDirectory)
            .unwrap_err();
        assert!(matches!(err, Error::ConflictingDefinition { .. }));
    }

    #[test]
    fn test_project_roots_follow_dependencies() {
        let cache = TempDir::new().unwrap();
        let lib = cache.path().join("lib");
        let src = cache.path().join("src/main/php");
        fs::create_dir_all(&lib).unwrap();
        fs::create_dir_all(&src).unwrap();

        let path = DependencyResolver::new()
            .with_project_root(&src)
            .with_project_root(cache.path().join("src/test/php"))
            .resolve(
                &[spec("lib").with_path(&lib)],
                cache.path(),
                ManagementMode::ArtifactDirectory,
            )
            .unwrap();
        let roots: Vec<_> = path.roots().collect();
        assert_eq!(roots, vec![lib.as_path(), src.as_path()]);
    }
}
