//! Version shims: every difference between runner generations is decided here

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{RunnerOptions, RunnerProfile};
use crate::{
    error::Result,
    types::{AggregationMode, IncludePath, PATH_SEPARATOR, RunnerInvocation, SuiteDescriptor},
    utils::php_string,
};

/// Environment variable carrying the include path into the runner
pub const INCLUDE_PATH_ENV: &str = "PHPBRIDGE_INCLUDE_PATH";

pub const BOOTSTRAP_FILE: &str = "phpbridge-bootstrap.php";

/// Utility modules 3.4 runners do not load on their own
const LEGACY_UTIL_MODULES: [&str; 9] = [
    "PHPUnit/TextUI/TestRunner.php",
    "PHPUnit/Util/Log/PMD.php",
    "PHPUnit/Util/Log/TAP.php",
    "PHPUnit/Util/Configuration.php",
    "PHPUnit/Util/Fileloader.php",
    "PHPUnit/Util/Filter.php",
    "PHPUnit/Util/Getopt.php",
    "PHPUnit/Util/Skeleton.php",
    "PHPUnit/Util/TestDox/ResultPrinter/Text.php",
];

const LOG_FLAGS: [&str; 2] = ["--log-xml", "--log-junit"];

/// What one invocation runs: a class and the file declaring it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTarget {
    pub class_name: String,
    pub file: PathBuf,
    /// Instrument the whitelisted trees
    pub coverage: bool,
}

/// A normalized invocation plus the junit report it will write
#[derive(Debug, Clone)]
pub struct Normalized {
    pub invocation: RunnerInvocation,
    pub report: PathBuf,
}

/// Script that loads the runner and hands over to its CLI entry point
pub fn render_bootstrap(profile: RunnerProfile) -> String {
    let mut script = String::from("<?php\n");
    match profile {
        RunnerProfile::Legacy => {
            for module in LEGACY_UTIL_MODULES {
                script.push_str(&format!("require_once {};\n", php_string(module)));
            }
            script.push('\n');
            script.push_str("require_once 'PHPUnit/TextUI/Command.php';\n");
        }
        RunnerProfile::Modern => {
            script.push_str("require_once 'PHPUnit/Autoload.php';\n");
        }
    }
    script.push_str("PHPUnit_TextUI_Command::main();\n");
    script
}

/// PHP source of the suite class wrapping every probed test class
pub fn render_suite(suite: &SuiteDescriptor, profile: RunnerProfile) -> String {
    let mut php = String::from("<?php\n");
    if profile == RunnerProfile::Legacy {
        php.push_str("require_once 'PHPUnit/Framework/TestSuite.php';\n");
    }
    for file in suite.files() {
        php.push_str(&format!("require_once {};\n", php_string(&file.to_string_lossy())));
    }
    php.push('\n');
    php.push_str(&format!(
        "class {} extends PHPUnit_Framework_TestSuite\n{{\n",
        suite.name()
    ));
    php.push_str("    public static function suite()\n    {\n");
    if let AggregationMode::CoverageWrapped { whitelist } = suite.aggregation() {
        for dir in whitelist {
            let dir = php_string(&dir.to_string_lossy());
            match profile {
                RunnerProfile::Legacy => {
                    php.push_str(&format!(
                        "        PHPUnit_Util_Filter::addDirectoryToWhitelist({dir});\n"
                    ));
                }
                RunnerProfile::Modern => {
                    let filter = "PHP_CodeCoverage_Filter::getInstance()";
                    php.push_str(&format!("        {filter}->addDirectoryToWhitelist({dir});\n"));
                }
            }
        }
    }
    php.push_str(&format!("        $suite = new self({});\n", php_string(suite.name())));
    for class in suite.class_names() {
        php.push_str(&format!("        $suite->addTestSuite({});\n", php_string(class)));
    }
    php.push_str("        return $suite;\n    }\n}\n");
    php
}

/// Rewrite any junit log flag to the profile's spelling, wherever it appears.
///
/// Returns the rewritten arguments and the report path the user asked for, if any.
pub fn rewrite_log_flags(args: &[String], profile: RunnerProfile) -> (Vec<String>, Option<String>) {
    let flag = profile.log_flag();
    let mut rewritten = Vec::with_capacity(args.len());
    let mut report = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if LOG_FLAGS.contains(&arg.as_str()) {
            match iter.next() {
                Some(value) => {
                    report = Some(value.clone());
                    rewritten.push(flag.to_string());
                    rewritten.push(value.clone());
                }
                // Dangling at the end: the default report flag takes its place
                None => warn!("Dropping {arg} without a report path"),
            }
            continue;
        }
        let inline = LOG_FLAGS
            .iter()
            .find_map(|f| arg.strip_prefix(f).and_then(|rest| rest.strip_prefix('=')));
        match inline {
            Some(value) => {
                report = Some(value.to_string());
                rewritten.push(format!("{flag}={value}"));
            }
            None => rewritten.push(arg.clone()),
        }
    }

    (rewritten, report)
}

/// Write the bootstrap into `work_dir` and assemble the command line
pub fn normalize(
    options: &RunnerOptions,
    profile: RunnerProfile,
    target: &RunTarget,
    include_path: &IncludePath,
    report: &Path,
) -> Result<Normalized> {
    fs::create_dir_all(&options.work_dir)?;
    let bootstrap = options.work_dir.join(BOOTSTRAP_FILE);
    fs::write(&bootstrap, render_bootstrap(profile))?;

    let search_path = include_path.to_search_path();
    let mut args = vec!["-d".to_string(), format!("include_path={search_path}")];
    for (key, value) in &options.defines {
        args.push("-d".to_string());
        args.push(format!("{key}={value}"));
    }
    args.push(bootstrap.to_string_lossy().into_owned());

    if profile.supports_configuration() {
        if let Some(configuration) = &options.configuration {
            args.push("--configuration".to_string());
            args.push(configuration.to_string_lossy().into_owned());
        }
    }
    if target.coverage {
        if let Some(html) = &options.coverage_html {
            args.push("--coverage-html".to_string());
            args.push(html.to_string_lossy().into_owned());
        }
        if let Some(clover) = &options.coverage_clover {
            args.push("--coverage-clover".to_string());
            args.push(clover.to_string_lossy().into_owned());
        }
    }

    let (user_args, user_report) = rewrite_log_flags(&options.arguments, profile);
    args.extend(user_args);
    let report = match user_report {
        Some(path) => options.working_dir.join(path),
        None => {
            args.push(profile.log_flag().to_string());
            args.push(report.to_string_lossy().into_owned());
            report.to_path_buf()
        }
    };

    if profile == RunnerProfile::Legacy {
        args.push(target.class_name.clone());
    }
    args.push(target.file.to_string_lossy().into_owned());

    let mut invocation = RunnerInvocation::new(profile, &options.executable, args)
        .with_working_dir(&options.working_dir);
    for (key, value) in &options.env {
        invocation = invocation.with_env(key, value);
    }
    invocation = invocation.with_env(INCLUDE_PATH_ENV, extend_inherited(&search_path));

    debug!("Normalized {} invocation: {}", profile, invocation.to_shell_command());
    Ok(Normalized { invocation, report })
}

/// Put our roots in front of whatever the environment already carries
fn extend_inherited(search_path: &str) -> String {
    match std::env::var(INCLUDE_PATH_ENV) {
        Ok(existing) if !existing.is_empty() && !search_path.is_empty() => {
            format!("{search_path}{PATH_SEPARATOR}{existing}")
        }
        Ok(existing) if search_path.is_empty() => existing,
        _ => search_path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TestSource, SUITE_CLASS};
    use tempfile::TempDir;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn options(dir: &Path) -> RunnerOptions {
        RunnerOptions {
            work_dir: dir.join("reports"),
            working_dir: dir.to_path_buf(),
            ..RunnerOptions::default()
        }
    }

    fn suite() -> SuiteDescriptor {
        SuiteDescriptor::new(
            SUITE_CLASS,
            vec![
                TestSource::new("/project/test/FooTest.php", "test").with_class("FooTest"),
                TestSource::new("/project/test/Acme/BarTest.php", "Acme")
                    .with_class("Acme_BarTest"),
            ],
            AggregationMode::Flat,
        )
    }

    #[test]
    fn test_rewrites_log_flag_in_any_position() {
        let args = strings(&["--colors", "--log-xml", "out.xml", "--verbose"]);
        let (rewritten, report) = rewrite_log_flags(&args, RunnerProfile::Modern);
        assert_eq!(rewritten, strings(&["--colors", "--log-junit", "out.xml", "--verbose"]));
        assert_eq!(report.as_deref(), Some("out.xml"));

        let args = strings(&["--log-junit=junit.xml", "--stop-on-failure"]);
        let (rewritten, report) = rewrite_log_flags(&args, RunnerProfile::Legacy);
        assert_eq!(rewritten, strings(&["--log-xml=junit.xml", "--stop-on-failure"]));
        assert_eq!(report.as_deref(), Some("junit.xml"));

        let args = strings(&["--filter", "testFoo"]);
        let (rewritten, report) = rewrite_log_flags(&args, RunnerProfile::Modern);
        assert_eq!(rewritten, args);
        assert_eq!(report, None);
    }

    #[test]
    fn test_legacy_bootstrap_requires_util_modules_first() {
        let script = render_bootstrap(RunnerProfile::Legacy);
        let command = script.find("PHPUnit/TextUI/Command.php").unwrap();
        for module in LEGACY_UTIL_MODULES {
            assert!(script.find(module).unwrap() < command, "{module} after Command.php");
        }
        assert!(script.trim_end().ends_with("PHPUnit_TextUI_Command::main();"));
    }

    #[test]
    fn test_modern_bootstrap_uses_autoloader() {
        insta::assert_snapshot!(render_bootstrap(RunnerProfile::Modern), @r"
        <?php
        require_once 'PHPUnit/Autoload.php';
        PHPUnit_TextUI_Command::main();
        ");
    }

    #[test]
    fn test_legacy_suite_rendering() {
        insta::assert_snapshot!(render_suite(&suite(), RunnerProfile::Legacy), @r"
        <?php
        require_once 'PHPUnit/Framework/TestSuite.php';
        require_once '/project/test/FooTest.php';
        require_once '/project/test/Acme/BarTest.php';

        class PhpbridgeTestSuite extends PHPUnit_Framework_TestSuite
        {
            public static function suite()
            {
                $suite = new self('PhpbridgeTestSuite');
                $suite->addTestSuite('FooTest');
                $suite->addTestSuite('Acme_BarTest');
                return $suite;
            }
        }
        ");
    }

    #[test]
    fn test_coverage_whitelist_is_version_specific() {
        let wrapped = SuiteDescriptor::new(
            SUITE_CLASS,
            vec![TestSource::new("/p/t/FooTest.php", "t").with_class("FooTest")],
            AggregationMode::CoverageWrapped {
                whitelist: vec![PathBuf::from("/p/src")],
            },
        );
        let legacy = render_suite(&wrapped, RunnerProfile::Legacy);
        assert!(legacy.contains("PHPUnit_Util_Filter::addDirectoryToWhitelist('/p/src');"));
        let modern = render_suite(&wrapped, RunnerProfile::Modern);
        assert!(modern.contains(
            "PHP_CodeCoverage_Filter::getInstance()->addDirectoryToWhitelist('/p/src');"
        ));
        assert!(!modern.contains("PHPUnit/Framework/TestSuite.php"));
    }

    #[test]
    fn test_legacy_target_is_class_then_file() {
        let dir = TempDir::new().unwrap();
        let target = RunTarget {
            class_name: "FooTest".to_string(),
            file: PathBuf::from("/project/test/FooTest.php"),
            coverage: false,
        };
        let report = dir.path().join("reports/FooTest.xml");
        let normalized = normalize(
            &options(dir.path()),
            RunnerProfile::Legacy,
            &target,
            &IncludePath::default(),
            &report,
        )
        .unwrap();

        let args = normalized.invocation.args();
        let tail = args[args.len() - 4..].to_vec();
        let expected = vec![
            "--log-xml".to_string(),
            report.to_string_lossy().into_owned(),
            "FooTest".to_string(),
            "/project/test/FooTest.php".to_string(),
        ];
        assert_eq!(tail, expected);
        assert_eq!(normalized.report, report);
        assert!(dir.path().join("reports").join(BOOTSTRAP_FILE).is_file());
    }

    #[test]
    fn test_modern_target_is_file_only_and_user_report_wins() {
        let dir = TempDir::new().unwrap();
        let mut opts = options(dir.path());
        opts.arguments = strings(&["--log-xml", "custom.xml"]);
        opts.configuration = Some(PathBuf::from("phpunit.xml"));
        let target = RunTarget {
            class_name: SUITE_CLASS.to_string(),
            file: dir.path().join("reports").join("PhpbridgeTestSuite.php"),
            coverage: false,
        };
        let normalized = normalize(
            &opts,
            RunnerProfile::Modern,
            &target,
            &IncludePath::default(),
            &dir.path().join("reports/ignored.xml"),
        )
        .unwrap();

        let args = normalized.invocation.args();
        assert!(!args.iter().any(|a| a == SUITE_CLASS));
        assert_eq!(args.last().cloned(), Some(target.file.to_string_lossy().into_owned()));
        assert_eq!(args.iter().filter(|a| a.starts_with("--log")).count(), 1);
        assert!(args.windows(2).any(|w| w[0] == "--configuration" && w[1] == "phpunit.xml"));
        assert_eq!(normalized.report, dir.path().join("custom.xml"));
        assert!(normalized
            .invocation
            .env_vars()
            .iter()
            .any(|(k, _)| k == INCLUDE_PATH_ENV));
    }

    #[test]
    fn test_dangling_log_flag_leaves_one_default_flag() {
        let dir = TempDir::new().unwrap();
        let mut opts = options(dir.path());
        opts.arguments = strings(&["--colors", "--log-xml"]);
        let (rewritten, report) = rewrite_log_flags(&opts.arguments, RunnerProfile::Legacy);
        assert_eq!(rewritten, strings(&["--colors"]));
        assert_eq!(report, None);

        let target = RunTarget {
            class_name: "FooTest".to_string(),
            file: PathBuf::from("/project/test/FooTest.php"),
            coverage: false,
        };
        let report = dir.path().join("reports/FooTest.xml");
        let normalized = normalize(
            &opts,
            RunnerProfile::Legacy,
            &target,
            &IncludePath::default(),
            &report,
        )
        .unwrap();

        let args = normalized.invocation.args();
        assert_eq!(args.iter().filter(|a| a.starts_with("--log")).count(), 1);
        assert!(args.windows(2).any(|w| w[0] == "--log-xml" && w[1] == report.to_string_lossy()));
        assert_eq!(normalized.report, report);
    }
}
