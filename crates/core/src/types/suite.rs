use serde::Serialize;
use std::path::{Path, PathBuf};

/// Class name of the generated suite wrapper
pub const SUITE_CLASS: &str = "PhpbridgeTestSuite";

/// A discovered test file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestSource {
    pub file: PathBuf,
    /// Unknown until the file has been probed
    pub class_name: Option<String>,
    pub suite: String,
}

impl TestSource {
    pub fn new(file: impl Into<PathBuf>, suite: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            class_name: None,
            suite: suite.into(),
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case", tag = "mode")]
pub enum AggregationMode {
    #[default]
    Flat,
    /// Same selection as `Flat`; the whitelisted trees are instrumented for coverage
    CoverageWrapped { whitelist: Vec<PathBuf> },
}

impl AggregationMode {
    pub fn is_coverage(&self) -> bool {
        matches!(self, AggregationMode::CoverageWrapped { .. })
    }
}

/// The tests one runner invocation executes.
///
/// Deliberately not `Clone`: the runner adapter takes it by value and it is
/// gone after that invocation.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct SuiteDescriptor {
    name: String,
    sources: Vec<TestSource>,
    aggregation: AggregationMode,
}

impl SuiteDescriptor {
    pub fn new(
        name: impl Into<String>,
        sources: Vec<TestSource>,
        aggregation: AggregationMode,
    ) -> Self {
        Self {
            name: name.into(),
            sources,
            aggregation,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &[TestSource] {
        &self.sources
    }

    pub fn aggregation(&self) -> &AggregationMode {
        &self.aggregation
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Probed class names in suite order
    pub fn class_names(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter_map(|s| s.class_name.as_deref())
            .collect()
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.sources.iter().map(|s| s.file.as_path())
    }

    /// PHP source of the suite class for `profile`
    pub fn render_php(&self, profile: crate::runner::RunnerProfile) -> String {
        crate::runner::normalize::render_suite(self, profile)
    }

    /// Split into single-entry descriptors, one per test file, for forked execution
    pub fn into_single_entries(self) -> Vec<SuiteDescriptor> {
        let aggregation = self.aggregation;
        self.sources
            .into_iter()
            .map(|source| {
                let name = source
                    .class_name
                    .clone()
                    .unwrap_or_else(|| source.suite.clone());
                SuiteDescriptor::new(name, vec![source], aggregation.clone())
            })
            .collect()
    }
}
