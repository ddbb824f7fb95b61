//! Suite synthesis: discovered test files to a [`SuiteDescriptor`]

pub mod discovery;
pub mod probe;

pub use discovery::discover;
pub use probe::{ClassProbe, DeclarationScanProbe, InterpreterProbe};

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{
    cache::ProbeCache,
    config::{AggregationKind, Config},
    error::{Error, Result},
    impl_case_insensitive_deserialize,
    types::{AggregationMode, IncludePath, SuiteDescriptor, TestSource},
};

/// Which [`ClassProbe`] to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeKind {
    #[default]
    Interpreter,
    Scan,
}

impl_case_insensitive_deserialize!(
    ProbeKind,
    Interpreter => "interpreter",
    Scan => "scan"
);

impl ProbeKind {
    pub fn build(self, executable: &Path) -> Box<dyn ClassProbe> {
        match self {
            ProbeKind::Interpreter => Box::new(InterpreterProbe::new(executable)),
            ProbeKind::Scan => Box::new(DeclarationScanProbe::new()),
        }
    }
}

/// Builds the suite a runner invocation executes
pub struct SuiteSynthesizer {
    test_root: PathBuf,
    test_order: Vec<PathBuf>,
    aggregation: AggregationMode,
    probe: Box<dyn ClassProbe>,
    cache: ProbeCache,
}

impl SuiteSynthesizer {
    pub fn new(test_root: impl Into<PathBuf>, probe: Box<dyn ClassProbe>) -> Self {
        Self {
            test_root: test_root.into(),
            test_order: Vec::new(),
            aggregation: AggregationMode::Flat,
            probe,
            cache: ProbeCache::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut cache =
            ProbeCache::new(config.probe_cache_dir.as_deref().map(|p| config.resolve(p)));
        cache.load_from_disk()?;

        let aggregation = match config.phpunit.aggregation {
            AggregationKind::Flat => AggregationMode::Flat,
            AggregationKind::CoverageWrapped => AggregationMode::CoverageWrapped {
                whitelist: vec![config.sources_dir()],
            },
        };

        Ok(Self {
            test_root: config.test_sources_dir(),
            test_order: config.test_order.clone(),
            aggregation,
            probe: config.class_probe.build(&config.php.executable),
            cache,
        })
    }

    pub fn with_test_order(mut self, order: Vec<PathBuf>) -> Self {
        self.test_order = order;
        self
    }

    pub fn with_aggregation(mut self, aggregation: AggregationMode) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_cache(mut self, cache: ProbeCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn test_root(&self) -> &Path {
        &self.test_root
    }

    /// Discover test files, probe each for its single test class and build the suite
    pub fn synthesize(
        &mut self,
        test_glob: &str,
        include_path: &IncludePath,
    ) -> Result<SuiteDescriptor> {
        let files = discover(&self.test_root, test_glob, &self.test_order)?;
        info!(
            "Synthesizing suite from {} test files using the {} probe",
            files.len(),
            self.probe.name()
        );

        let mut sources = Vec::with_capacity(files.len());
        for file in files {
            let class = self.probe_single_class(&file, include_path)?;
            let suite = suite_name(&self.test_root, &file);
            debug!("{} -> {}", file.display(), class);
            sources.push(TestSource::new(file, suite).with_class(class));
        }

        Ok(SuiteDescriptor::new(
            crate::types::SUITE_CLASS,
            sources,
            self.aggregation.clone(),
        ))
    }

    /// The one class `file` declares; zero or several is an error
    pub fn probe_single_class(
        &mut self,
        file: &Path,
        include_path: &IncludePath,
    ) -> Result<String> {
        let search_path = include_path.to_search_path();
        let classes = match self.cache.get(file, &search_path) {
            Some(cached) => cached.to_vec(),
            None => {
                let classes = self.probe.declared_classes(file, include_path)?;
                self.cache.insert(file, &search_path, classes.clone())?;
                classes
            }
        };
        single_class(file, classes)
    }

    /// Probe results remembered so far
    pub fn cache(&self) -> &ProbeCache {
        &self.cache
    }
}

pub(crate) fn single_class(file: &Path, mut classes: Vec<String>) -> Result<String> {
    if classes.len() == 1 {
        if let Some(class) = classes.pop() {
            return Ok(class);
        }
    }
    Err(Error::AmbiguousTestClass {
        file: file.to_path_buf(),
        found: classes,
    })
}

/// Directory of the file below the test root, or the root's name for top-level tests
fn suite_name(test_root: &Path, file: &Path) -> String {
    let parent = file
        .parent()
        .and_then(|p| p.strip_prefix(test_root).ok())
        .filter(|p| !p.as_os_str().is_empty());
    match parent {
        Some(dir) => crate::utils::slash_path(dir),
        None => test_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tests".to_string()),
    }
}

/// Synthesize with the declaration scanner and no cache
pub fn synthesize(
    test_root: &Path,
    test_glob: &str,
    include_path: &IncludePath,
) -> Result<SuiteDescriptor> {
    SuiteSynthesizer::new(test_root, Box::new(DeclarationScanProbe::new()))
        .synthesize(test_glob, include_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, contents: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    /// Scans the source and counts how often it was asked
    struct CountingProbe {
        calls: Arc<AtomicUsize>,
    }

    impl ClassProbe for CountingProbe {
        fn declared_classes(&self, file: &Path, include_path: &IncludePath) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            DeclarationScanProbe.declared_classes(file, include_path)
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[test]
    fn test_synthesize_one_class_per_file_in_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Acme/OrderTest.php", "<?php class Acme_OrderTest {}");
        write(dir.path(), "CartTest.php", "<?php class CartTest {}");
        write(dir.path(), "Acme/Fixture.php", "<?php class Fixture {}");

        let suite = synthesize(dir.path(), "**/*Test.php", &IncludePath::default()).unwrap();
        assert_eq!(suite.name(), crate::types::SUITE_CLASS);
        assert_eq!(suite.class_names(), vec!["Acme_OrderTest", "CartTest"]);
        assert_eq!(suite.sources()[0].suite, "Acme");
    }

    #[test]
    fn test_file_with_two_classes_is_ambiguous() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "PairTest.php", "<?php class PairTest {} class PairHelper {}");

        let err = synthesize(dir.path(), "**/*Test.php", &IncludePath::default()).unwrap_err();
        match err {
            Error::AmbiguousTestClass { file, found } => {
                assert!(file.ends_with("PairTest.php"));
                assert_eq!(found, vec!["PairTest", "PairHelper"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_file_without_class_is_ambiguous() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "EmptyTest.php", "<?php // nothing here");
        let err = synthesize(dir.path(), "**/*Test.php", &IncludePath::default()).unwrap_err();
        assert!(matches!(err, Error::AmbiguousTestClass { ref found, .. } if found.is_empty()));
    }

    #[test]
    fn test_probe_results_are_cached_until_file_changes() {
        let dir = TempDir::new().unwrap();
        let file = write(dir.path(), "CachedTest.php", "<?php class CachedTest {}");
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = CountingProbe {
            calls: Arc::clone(&calls),
        };
        let mut synth = SuiteSynthesizer::new(dir.path(), Box::new(probe));
        let include_path = IncludePath::default();

        synth.synthesize("**/*Test.php", &include_path).unwrap();
        synth.synthesize("**/*Test.php", &include_path).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        fs::write(&file, "<?php class RenamedTest {}").unwrap();
        let suite = synth.synthesize("**/*Test.php", &include_path).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(suite.class_names(), vec!["RenamedTest"]);
    }

    #[test]
    fn test_coverage_wrapping_keeps_selection() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "ATest.php", "<?php class ATest {}");
        let whitelist = vec![dir.path().join("src")];
        let suite = SuiteSynthesizer::new(dir.path(), Box::new(DeclarationScanProbe::new()))
            .with_aggregation(AggregationMode::CoverageWrapped {
                whitelist: whitelist.clone(),
            })
            .synthesize("**/*Test.php", &IncludePath::default())
            .unwrap();
        assert_eq!(suite.class_names(), vec!["ATest"]);
        assert_eq!(suite.aggregation(), &AggregationMode::CoverageWrapped { whitelist });
    }

    #[test]
    fn test_probe_kind_spellings() {
        let kind: ProbeKind = serde_json::from_str("\"SCAN\"").unwrap();
        assert_eq!(kind, ProbeKind::Scan);
        assert!(serde_json::from_str::<ProbeKind>("\"reflection\"").is_err());
    }
}
