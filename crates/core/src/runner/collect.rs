//! Exit classification and report collection

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use super::process::ProcessOutput;
use crate::{
    error::{Result, RunnerErrorKind},
    types::{BuildResult, BuildStatus, RunnerInvocation},
};

const FAILURE_MARKERS: [&str; 2] = ["FAILURES!", "ERRORS!"];
const CRASH_MARKERS: [&str; 3] = ["Fatal error", "Parse error", "Segmentation fault"];

static SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^Tests: \d+, Assertions: \d+(, (Failures|Errors|Incomplete|Skipped): \d+)*")
        .expect("summary pattern is valid")
});

/// Map an observed run to a status
pub fn classify(output: &ProcessOutput) -> BuildStatus {
    if output.timed_out {
        return BuildStatus::RunnerError(RunnerErrorKind::Timeout);
    }
    if output.exit_code == Some(0) {
        return BuildStatus::Success;
    }

    let combined = output.combined();
    if output.signal.is_some() || combined.trim().is_empty() {
        return BuildStatus::RunnerError(RunnerErrorKind::Crash);
    }
    if FAILURE_MARKERS.iter().any(|m| combined.contains(m)) || SUMMARY.is_match(&combined) {
        return BuildStatus::TestFailure;
    }
    if CRASH_MARKERS.iter().any(|m| combined.contains(m)) {
        return BuildStatus::RunnerError(RunnerErrorKind::Crash);
    }
    BuildStatus::RunnerError(RunnerErrorKind::UnrecognizedOutput)
}

/// Text capture written next to the junit report
pub fn capture_path(report: &Path) -> PathBuf {
    report.with_extension("txt")
}

/// Classify, persist the combined output and package the result
pub fn collect(
    output: ProcessOutput,
    invocation: RunnerInvocation,
    report: &Path,
) -> Result<BuildResult> {
    let status = classify(&output);
    let capture = capture_path(report);
    if let Some(parent) = capture.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&capture, output.combined())?;

    let report = report.is_file().then(|| report.to_path_buf());
    match status {
        BuildStatus::Success => info!("Tests passed in {:.2}s", output.elapsed.as_secs_f64()),
        BuildStatus::TestFailure => info!("Tests reported failures, see {}", capture.display()),
        BuildStatus::RunnerError(reason) => warn!(
            "Runner error ({}), exit code {:?}, output in {}",
            reason,
            output.exit_code,
            capture.display()
        ),
    }
    debug!("Junit report: {:?}", report);

    Ok(BuildResult {
        status,
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
        output_file: Some(capture),
        report,
        invocations: vec![invocation],
        elapsed: output.elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn output(code: Option<i32>, stdout: &str) -> ProcessOutput {
        ProcessOutput {
            exit_code: code,
            signal: None,
            timed_out: false,
            stdout: stdout.to_string(),
            stderr: String::new(),
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_exit_zero_is_success() {
        assert_eq!(classify(&output(Some(0), "OK (3 tests, 5 assertions)")), BuildStatus::Success);
    }

    #[test]
    fn test_failure_markers() {
        let out = "There was 1 failure:\n\n1) FooTest::testBar\n\n\
                   FAILURES!\nTests: 3, Assertions: 5, Failures: 1.\n";
        assert_eq!(classify(&output(Some(1), out)), BuildStatus::TestFailure);
        assert_eq!(
            classify(&output(Some(2), "Tests: 4, Assertions: 4, Errors: 1.")),
            BuildStatus::TestFailure
        );
    }

    #[test]
    fn test_crash_markers_and_empty_output() {
        let crash = BuildStatus::RunnerError(RunnerErrorKind::Crash);
        assert_eq!(
            classify(&output(
                Some(255),
                "PHP Fatal error:  Class 'Foo' not found in /x.php on line 3"
            )),
            crash
        );
        assert_eq!(classify(&output(Some(1), "")), crash);

        let mut signalled = output(None, "partial");
        signalled.signal = Some(9);
        assert_eq!(classify(&signalled), crash);
    }

    #[test]
    fn test_unrecognized_and_timeout() {
        assert_eq!(
            classify(&output(Some(1), "something odd happened")),
            BuildStatus::RunnerError(RunnerErrorKind::UnrecognizedOutput)
        );
        let mut timed_out = output(None, "");
        timed_out.timed_out = true;
        assert_eq!(classify(&timed_out), BuildStatus::RunnerError(RunnerErrorKind::Timeout));
    }

    #[test]
    fn test_collect_writes_capture_and_reports_existing_junit() {
        let dir = tempfile::TempDir::new().unwrap();
        let report = dir.path().join("reports/Suite.xml");
        fs::create_dir_all(report.parent().unwrap()).unwrap();
        fs::write(&report, "<testsuites/>").unwrap();

        let invocation =
            RunnerInvocation::new(crate::runner::RunnerProfile::Modern, "php", Vec::new());
        let result =
            collect(output(Some(0), "OK (1 test, 1 assertion)\n"), invocation, &report).unwrap();
        assert_eq!(result.status, BuildStatus::Success);
        assert_eq!(result.report.as_deref(), Some(report.as_path()));
        let capture = result.output_file.unwrap();
        assert_eq!(capture, dir.path().join("reports/Suite.txt"));
        assert_eq!(fs::read_to_string(capture).unwrap(), "OK (1 test, 1 assertion)\n");
    }
}
