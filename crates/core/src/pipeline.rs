//! Config-driven build steps: resolve, test, package

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{
    archive::{ArchiveLayout, Packager},
    config::{Config, DependencySpec},
    error::{Error, Result},
    lint::{LintReport, Linter},
    resolver::{DependencyResolver, search_path},
    runner::{InvocationTarget, RunnerAdapter, RunnerOptions},
    synth::SuiteSynthesizer,
    types::{BuildResult, IncludePath, RunnerInvocation},
};

/// Archive written by the package step
#[derive(Debug, Clone, Serialize)]
pub struct PackageOutput {
    pub destination: PathBuf,
    pub layout: ArchiveLayout,
}

/// Everything a full build produced
#[derive(Debug, Serialize)]
pub struct BuildReport {
    pub include_path: IncludePath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lint: Option<LintReport>,
    pub package: Option<PackageOutput>,
    pub tests: BuildResult,
}

impl BuildReport {
    pub fn exit_code(&self) -> i32 {
        self.tests.status.exit_code()
    }
}

/// Runs the build steps for one project configuration
pub struct BuildPipeline {
    config: Config,
    install_search_path: bool,
}

impl BuildPipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            install_search_path: false,
        }
    }

    /// Also install the resolved path as this process's global search path
    pub fn with_global_search_path(mut self, install: bool) -> Self {
        self.install_search_path = install;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve declared dependencies, then the project's own trees
    pub fn resolve(&self) -> Result<IncludePath> {
        let declared: Vec<DependencySpec> = self
            .config
            .dependencies
            .iter()
            .map(|spec| DependencySpec {
                path: spec.path.as_deref().map(|p| self.config.resolve(p)),
                ..spec.clone()
            })
            .collect();

        let resolver = DependencyResolver::from_config(
            &self.config,
            vec![self.config.sources_dir(), self.config.test_sources_dir()],
        );
        let include_path = resolver.resolve(
            &declared,
            &self.config.local_cache_dir(),
            self.config.management_mode,
        )?;

        if self.install_search_path {
            search_path::install(&include_path)?;
        }
        Ok(include_path)
    }

    /// Syntax-check the project's sources and tests
    pub fn lint(&self) -> Result<LintReport> {
        Linter::new(&self.config.php.executable)
            .lint(&[self.config.sources_dir(), self.config.test_sources_dir()])
    }

    /// Synthesize the suite (or probe `file`) and run it
    pub fn test(&self, include_path: &IncludePath, file: Option<&Path>) -> Result<BuildResult> {
        if self.config.skip_tests {
            info!("Tests skipped by configuration");
            return Ok(BuildResult::empty());
        }
        let target = self.target(include_path, file)?;
        self.run(target, include_path)
    }

    /// The invocations `test` would run, without running them
    pub fn plan_tests(
        &self,
        include_path: &IncludePath,
        file: Option<&Path>,
    ) -> Result<Vec<RunnerInvocation>> {
        let Some(target) = self.target(include_path, file)? else {
            return Ok(Vec::new());
        };
        let planned = self
            .adapter()
            .plan(target, include_path, self.config.runner_version_hint)?;
        Ok(planned.into_iter().map(|n| n.invocation).collect())
    }

    /// Write the archive of dependencies and project sources
    pub fn package(&self, include_path: &IncludePath) -> Result<PackageOutput> {
        let destination = self.archive_destination();
        let layout = Packager::from_config(&self.config).pack(
            include_path,
            &[self.config.sources_dir()],
            &destination,
        )?;
        Ok(PackageOutput { destination, layout })
    }

    /// Resolve, lint (when enabled), synthesize, package, then run the tests.
    ///
    /// Syntax errors and test class errors surface before the archive is
    /// written, so they leave nothing on disk. A failed run still yields a
    /// report; the caller decides what a test failure means for the build.
    pub fn build(&self) -> Result<BuildReport> {
        let include_path = self.resolve()?;
        let lint = if self.config.lint {
            Some(self.lint()?.into_result()?)
        } else {
            None
        };
        let target = if self.config.skip_tests {
            info!("Tests skipped by configuration");
            None
        } else {
            self.target(&include_path, None)?
        };
        let package = match &self.config.archive_destination {
            Some(_) => Some(self.package(&include_path)?),
            None => {
                debug!("No archive destination configured, skipping package step");
                None
            }
        };
        let tests = self.run(target, &include_path)?;
        Ok(BuildReport {
            include_path,
            lint,
            package,
            tests,
        })
    }

    pub fn archive_destination(&self) -> PathBuf {
        match &self.config.archive_destination {
            Some(path) => self.config.resolve(path),
            None => {
                let name = self
                    .config
                    .base_dir
                    .canonicalize()
                    .ok()
                    .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                    .unwrap_or_else(|| "archive".to_string());
                self.config.resolve(Path::new("target")).join(format!(
                    "{name}.{}",
                    self.config.archive_format.extension()
                ))
            }
        }
    }

    fn run(
        &self,
        target: Option<InvocationTarget>,
        include_path: &IncludePath,
    ) -> Result<BuildResult> {
        let Some(target) = target else {
            return Ok(BuildResult::empty());
        };
        self.adapter()
            .invoke(target, include_path, self.config.runner_version_hint)
    }

    fn target(
        &self,
        include_path: &IncludePath,
        file: Option<&Path>,
    ) -> Result<Option<InvocationTarget>> {
        if let Some(file) = file {
            return Ok(Some(InvocationTarget::File(file.to_path_buf())));
        }

        let mut synthesizer = SuiteSynthesizer::from_config(&self.config)?;
        let suite = synthesizer.synthesize(&self.config.test_glob, include_path)?;
        if suite.is_empty() {
            if self.config.fail_if_no_tests {
                return Err(Error::NoTestsFound {
                    root: synthesizer.test_root().to_path_buf(),
                });
            }
            info!("No tests found under {}", synthesizer.test_root().display());
            return Ok(None);
        }
        Ok(Some(InvocationTarget::Suite(suite)))
    }

    fn adapter(&self) -> RunnerAdapter {
        RunnerAdapter::new(RunnerOptions::from_config(&self.config))
            .with_probe(self.config.class_probe.build(&self.config.php.executable))
    }
}
