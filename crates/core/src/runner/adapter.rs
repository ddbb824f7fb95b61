use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::{
    RunnerProfile, collect,
    normalize::{self, Normalized, RunTarget},
    process,
};
use crate::{
    config::Config,
    error::Result,
    synth::{ClassProbe, DeclarationScanProbe, single_class},
    types::{BuildResult, IncludePath, SuiteDescriptor},
};

/// What to run
#[derive(Debug)]
pub enum InvocationTarget {
    Suite(SuiteDescriptor),
    /// One test file; its class is probed inline
    File(PathBuf),
}

/// Runner settings independent of the suite being run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOptions {
    pub executable: PathBuf,
    pub defines: BTreeMap<String, String>,
    pub env: BTreeMap<String, String>,
    pub arguments: Vec<String>,
    pub configuration: Option<PathBuf>,
    pub coverage_html: Option<PathBuf>,
    pub coverage_clover: Option<PathBuf>,
    pub timeout: Duration,
    /// One invocation for the whole suite instead of one per file
    pub single_invocation: bool,
    /// Bootstrap, suite file and reports go here
    pub work_dir: PathBuf,
    /// Current directory of the runner process
    pub working_dir: PathBuf,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("php"),
            defines: BTreeMap::new(),
            env: BTreeMap::new(),
            arguments: Vec::new(),
            configuration: None,
            coverage_html: None,
            coverage_clover: None,
            timeout: Duration::from_secs(600),
            single_invocation: true,
            work_dir: PathBuf::from("target/phpunit"),
            working_dir: PathBuf::from("."),
        }
    }
}

impl RunnerOptions {
    pub fn from_config(config: &Config) -> Self {
        let phpunit = &config.phpunit;
        Self {
            executable: config.php.executable.clone(),
            defines: config.php.defines.clone(),
            env: config.php.env.clone(),
            arguments: phpunit.arguments.clone(),
            configuration: phpunit.configuration.as_deref().map(|p| config.resolve(p)),
            coverage_html: phpunit.coverage_html.as_deref().map(|p| config.resolve(p)),
            coverage_clover: phpunit.coverage_clover.as_deref().map(|p| config.resolve(p)),
            timeout: Duration::from_secs(phpunit.timeout_secs),
            single_invocation: phpunit.single_invocation,
            work_dir: config.report_dir(),
            working_dir: config.base_dir.clone(),
        }
    }
}

/// Drives PHPUnit for a suite or a single file
pub struct RunnerAdapter {
    options: RunnerOptions,
    probe: Box<dyn ClassProbe>,
}

impl RunnerAdapter {
    pub fn new(options: RunnerOptions) -> Self {
        Self {
            options,
            probe: Box::new(DeclarationScanProbe::new()),
        }
    }

    /// Probe used to find the class of a single-file target
    pub fn with_probe(mut self, probe: Box<dyn ClassProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Normalize, execute and classify.
    ///
    /// Test failures come back as [`BuildStatus::TestFailure`](crate::types::BuildStatus)
    /// in the result; only problems preparing or starting the runner are errors.
    pub fn invoke(
        &self,
        target: InvocationTarget,
        include_path: &IncludePath,
        hint: Option<RunnerProfile>,
    ) -> Result<BuildResult> {
        let planned = self.plan(target, include_path, hint)?;
        if planned.is_empty() {
            info!("No tests to run");
            return Ok(BuildResult::empty());
        }

        let total = planned.len();
        let mut results = Vec::with_capacity(total);
        for (index, Normalized { invocation, report }) in planned.into_iter().enumerate() {
            if total > 1 {
                info!("Running invocation {}/{}", index + 1, total);
            }
            let output = process::execute(&invocation, self.options.timeout)?;
            results.push(collect::collect(output, invocation, &report)?);
        }
        Ok(BuildResult::aggregate(results))
    }

    /// Everything `invoke` would run, without running it
    pub fn plan(
        &self,
        target: InvocationTarget,
        include_path: &IncludePath,
        hint: Option<RunnerProfile>,
    ) -> Result<Vec<Normalized>> {
        let profile = RunnerProfile::detect(hint, include_path);
        info!("Using {} runner profile", profile);

        match target {
            InvocationTarget::File(file) => {
                let classes = self.probe.declared_classes(&file, include_path)?;
                let class_name = single_class(&file, classes)?;
                let report = self.options.work_dir.join(format!("{}.xml", stem(&file)));
                let target = RunTarget {
                    class_name,
                    file,
                    coverage: false,
                };
                Ok(vec![normalize::normalize(
                    &self.options,
                    profile,
                    &target,
                    include_path,
                    &report,
                )?])
            }
            InvocationTarget::Suite(suite) if suite.is_empty() => Ok(Vec::new()),
            InvocationTarget::Suite(suite) if self.options.single_invocation => {
                Ok(vec![self.plan_suite(suite, profile, include_path)?])
            }
            InvocationTarget::Suite(suite) => self.plan_forked(suite, profile, include_path),
        }
    }

    fn plan_suite(
        &self,
        suite: SuiteDescriptor,
        profile: RunnerProfile,
        include_path: &IncludePath,
    ) -> Result<Normalized> {
        fs::create_dir_all(&self.options.work_dir)?;
        // Modern runners derive the class to run from the file name
        let suite_file = self.options.work_dir.join(format!("{}.php", suite.name()));
        fs::write(&suite_file, suite.render_php(profile))?;

        let report = self.options.work_dir.join(format!("{}.xml", suite.name()));
        let target = RunTarget {
            class_name: suite.name().to_string(),
            file: suite_file,
            coverage: suite.aggregation().is_coverage(),
        };
        normalize::normalize(&self.options, profile, &target, include_path, &report)
    }

    fn plan_forked(
        &self,
        suite: SuiteDescriptor,
        profile: RunnerProfile,
        include_path: &IncludePath,
    ) -> Result<Vec<Normalized>> {
        if suite.aggregation().is_coverage() {
            warn!("Coverage is only collected when the suite runs in a single invocation");
        }
        let entries = suite.into_single_entries();
        let stems: Vec<String> = entries
            .iter()
            .flat_map(|entry| entry.files().map(stem).collect::<Vec<_>>())
            .collect();
        let names = unique_report_names(&stems);

        let mut planned = Vec::with_capacity(entries.len());
        for (entry, name) in entries.iter().zip(names) {
            let Some(source) = entry.sources().first() else {
                continue;
            };
            let class_name = source
                .class_name
                .clone()
                .unwrap_or_else(|| entry.name().to_string());
            let target = RunTarget {
                class_name,
                file: source.file.clone(),
                coverage: false,
            };
            let report = self.options.work_dir.join(format!("{name}.xml"));
            planned.push(normalize::normalize(
                &self.options,
                profile,
                &target,
                include_path,
                &report,
            )?);
        }
        Ok(planned)
    }
}

fn stem(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "test".to_string())
}

/// `FooTest`, `FooTest.1`, `FooTest.2`, ... for repeated stems
fn unique_report_names(stems: &[String]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    stems
        .iter()
        .map(|stem| {
            let count = seen.entry(stem.as_str()).or_insert(0);
            let name = if *count == 0 {
                stem.clone()
            } else {
                format!("{stem}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}
