use crate::{
    archive::ArchiveFormat,
    error::{Error, Result},
    impl_case_insensitive_deserialize,
    resolver::ManagementMode,
    runner::RunnerProfile,
    synth::ProbeKind,
    types::{Coordinate, DependencyKind},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file names, searched in this order in every directory
pub const CONFIG_FILE_NAMES: [&str; 2] = [".phpbridge.json", "phpbridge.json"];

/// One declared dependency; in JSON either a bare coordinate string or an object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDependency")]
pub struct DependencySpec {
    pub coordinate: Coordinate,
    pub kind: DependencyKind,
    /// Explicit root (or file, for single-file dependencies); overrides the cache layout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl DependencySpec {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            kind: DependencyKind::default(),
            path: None,
        }
    }

    pub fn with_kind(mut self, kind: DependencyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDependency {
    Short(Coordinate),
    Full {
        coordinate: Coordinate,
        #[serde(default)]
        kind: DependencyKind,
        #[serde(default)]
        path: Option<PathBuf>,
    },
}

impl From<RawDependency> for DependencySpec {
    fn from(raw: RawDependency) -> Self {
        match raw {
            RawDependency::Short(coordinate) => DependencySpec::new(coordinate),
            RawDependency::Full {
                coordinate,
                kind,
                path,
            } => DependencySpec {
                coordinate,
                kind,
                path,
            },
        }
    }
}

/// Suite aggregation requested by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationKind {
    #[default]
    Flat,
    CoverageWrapped,
}

impl_case_insensitive_deserialize!(
    AggregationKind,
    Flat => "flat",
    CoverageWrapped => "coverage-wrapped"
);

/// PHP interpreter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct PhpSettings {
    pub executable: PathBuf,
    /// Passed as `-d key=value`
    pub defines: BTreeMap<String, String>,
    pub env: BTreeMap<String, String>,
}

impl Default for PhpSettings {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("php"),
            defines: BTreeMap::new(),
            env: BTreeMap::new(),
        }
    }
}

/// PHPUnit invocation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct PhpunitSettings {
    pub arguments: Vec<String>,
    /// phpunit.xml passed with `--configuration` (modern runners only)
    pub configuration: Option<PathBuf>,
    /// One invocation for the whole suite; `false` forks one per test file
    pub single_invocation: bool,
    pub timeout_secs: u64,
    pub report_dir: PathBuf,
    pub coverage_html: Option<PathBuf>,
    pub coverage_clover: Option<PathBuf>,
    pub aggregation: AggregationKind,
}

impl Default for PhpunitSettings {
    fn default() -> Self {
        Self {
            arguments: Vec::new(),
            configuration: None,
            single_invocation: true,
            timeout_secs: 600,
            report_dir: PathBuf::from("target/phpunit"),
            coverage_html: None,
            coverage_clover: None,
            aggregation: AggregationKind::Flat,
        }
    }
}

/// Settings specific to phar archives
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct PharSettings {
    /// PHP code placed before `__HALT_COMPILER();`
    pub stub: Option<String>,
    /// Defaults to the archive file name
    pub alias: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

/// The invocation record handed over by the host build tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,
    #[serde(default)]
    pub management_mode: ManagementMode,
    #[serde(default = "default_local_cache")]
    pub local_cache: PathBuf,
    /// Base directory of the namespace-to-path mapping; must exist when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classloader_base: Option<PathBuf>,
    #[serde(default = "default_sources")]
    pub sources: PathBuf,
    #[serde(default = "default_test_sources")]
    pub test_sources: PathBuf,
    #[serde(default = "default_test_glob")]
    pub test_glob: String,
    /// Authoritative suite order, relative to `test_sources`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_order: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner_version_hint: Option<RunnerProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_destination: Option<PathBuf>,
    #[serde(default)]
    pub archive_format: ArchiveFormat,
    /// `group:artifact` -> namespace, e.g. `"de.zend:zend-db": "Zend\\Db"`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub namespace_map: BTreeMap<String, String>,
    #[serde(default)]
    pub phar: PharSettings,
    #[serde(default)]
    pub php: PhpSettings,
    #[serde(default)]
    pub phpunit: PhpunitSettings,
    #[serde(default)]
    pub class_probe: ProbeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_cache_dir: Option<PathBuf>,
    /// Run `php -l` over sources and tests before anything else
    #[serde(default)]
    pub lint: bool,
    #[serde(default)]
    pub skip_tests: bool,
    #[serde(default)]
    pub fail_if_no_tests: bool,
    #[serde(default)]
    pub reject_conflicts: bool,

    // Directory relative paths are resolved against (internal, not exposed in JSON)
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_local_cache() -> PathBuf {
    PathBuf::from("target/php-deps")
}

fn default_sources() -> PathBuf {
    PathBuf::from("src/main/php")
}

fn default_test_sources() -> PathBuf {
    PathBuf::from("src/test/php")
}

fn default_test_glob() -> String {
    "**/*Test.php".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dependencies: Vec::new(),
            management_mode: ManagementMode::default(),
            local_cache: default_local_cache(),
            classloader_base: None,
            sources: default_sources(),
            test_sources: default_test_sources(),
            test_glob: default_test_glob(),
            test_order: Vec::new(),
            runner_version_hint: None,
            archive_destination: None,
            archive_format: ArchiveFormat::default(),
            namespace_map: BTreeMap::new(),
            phar: PharSettings::default(),
            php: PhpSettings::default(),
            phpunit: PhpunitSettings::default(),
            class_probe: ProbeKind::default(),
            probe_cache_dir: None,
            lint: false,
            skip_tests: false,
            fail_if_no_tests: false,
            reject_conflicts: false,
            base_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn find_config_file(start_path: &Path) -> Option<PathBuf> {
        let mut current = start_path;

        loop {
            for name in CONFIG_FILE_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    return Some(config_path);
                }
            }

            current = current.parent()?;
        }
    }

    /// Load the nearest config file above `start_dir`, or defaults rooted at `start_dir`
    pub fn discover(start_dir: &Path) -> Result<Self> {
        match Self::find_config_file(start_dir) {
            Some(path) => Self::load_from_file(&path),
            None => {
                debug!("No config file found above {}, using defaults", start_dir.display());
                Ok(Self {
                    base_dir: start_dir.to_path_buf(),
                    ..Self::default()
                })
            }
        }
    }

    /// Resolve a configured path against the config file's directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.resolve(&self.sources)
    }

    pub fn test_sources_dir(&self) -> PathBuf {
        self.resolve(&self.test_sources)
    }

    pub fn local_cache_dir(&self) -> PathBuf {
        self.resolve(&self.local_cache)
    }

    pub fn report_dir(&self) -> PathBuf {
        self.resolve(&self.phpunit.report_dir)
    }
}
