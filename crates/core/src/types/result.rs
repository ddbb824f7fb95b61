use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use super::invocation::RunnerInvocation;
use crate::error::{Error, RunnerErrorKind};

/// Outcome classification of a test step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "status", content = "reason")]
pub enum BuildStatus {
    Success,
    /// Tests ran and reported failures; the host decides what that means for the build
    TestFailure,
    RunnerError(RunnerErrorKind),
}

impl BuildStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success)
    }

    /// Exit code surfaced to the host
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildStatus::Success => 0,
            BuildStatus::TestFailure => 1,
            BuildStatus::RunnerError(_) => 2,
        }
    }

    fn severity(&self) -> u8 {
        match self {
            BuildStatus::Success => 0,
            BuildStatus::TestFailure => 1,
            BuildStatus::RunnerError(_) => 2,
        }
    }

    /// The more severe of two statuses; the first one wins ties
    pub fn worst(self, other: BuildStatus) -> BuildStatus {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

/// Result of one runner invocation, or the aggregate of several forked ones
#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
    pub status: BuildStatus,
    /// `None` when no process ran or it was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Text capture of the combined output, if written
    pub output_file: Option<PathBuf>,
    /// Structured (junit) report written by the runner, passed through untouched
    pub report: Option<PathBuf>,
    pub invocations: Vec<RunnerInvocation>,
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

impl BuildResult {
    /// Result of a step that had nothing to run
    pub fn empty() -> Self {
        Self {
            status: BuildStatus::Success,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            output_file: None,
            report: None,
            invocations: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Fold forked results into one; statuses keep the worst, outputs are concatenated
    pub fn aggregate(results: Vec<BuildResult>) -> Self {
        let mut iter = results.into_iter();
        let Some(mut total) = iter.next() else {
            return Self::empty();
        };
        for next in iter {
            let worse = next.status.severity() > total.status.severity();
            total.status = total.status.worst(next.status);
            if worse || total.exit_code == Some(0) {
                total.exit_code = next.exit_code;
            }
            total.stdout.push_str(&next.stdout);
            total.stderr.push_str(&next.stderr);
            total.output_file = next.output_file.or(total.output_file);
            total.report = next.report.or(total.report);
            total.invocations.extend(next.invocations);
            total.elapsed += next.elapsed;
        }
        total
    }
}

impl BuildResult {
    /// The runner failure as an [`Error`], for callers that treat it as fatal
    pub fn runner_error(&self) -> Option<Error> {
        let BuildStatus::RunnerError(reason) = self.status else {
            return None;
        };
        let detail = match (&self.output_file, self.exit_code) {
            (Some(capture), Some(code)) => {
                format!("exit code {code}, output in {}", capture.display())
            }
            (Some(capture), None) => format!("terminated, output in {}", capture.display()),
            (None, Some(code)) => format!("exit code {code}"),
            (None, None) => "terminated".to_string(),
        };
        Some(Error::Runner { reason, detail })
    }
}

fn serialize_duration<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_status(status: BuildStatus, code: i32) -> BuildResult {
        BuildResult {
            status,
            exit_code: Some(code),
            stdout: format!("{code}\n"),
            ..BuildResult::empty()
        }
    }

    #[test]
    fn test_worst_status_wins() {
        let crash = BuildStatus::RunnerError(RunnerErrorKind::Crash);
        assert_eq!(BuildStatus::Success.worst(BuildStatus::TestFailure), BuildStatus::TestFailure);
        assert_eq!(BuildStatus::TestFailure.worst(crash), crash);
        assert_eq!(crash.worst(BuildStatus::Success), crash);
    }

    #[test]
    fn test_aggregate_keeps_worst_exit_code_and_output() {
        let total = BuildResult::aggregate(vec![
            with_status(BuildStatus::Success, 0),
            with_status(BuildStatus::TestFailure, 1),
            with_status(BuildStatus::Success, 0),
        ]);
        assert_eq!(total.status, BuildStatus::TestFailure);
        assert_eq!(total.exit_code, Some(1));
        assert_eq!(total.stdout, "0\n1\n0\n");
    }

    #[test]
    fn test_aggregate_of_nothing_is_success() {
        let total = BuildResult::aggregate(Vec::new());
        assert!(total.status.is_success());
        assert!(total.invocations.is_empty());
    }

    #[test]
    fn test_runner_error_only_for_runner_failures() {
        assert!(with_status(BuildStatus::TestFailure, 1).runner_error().is_none());
        let timeout = BuildResult {
            status: BuildStatus::RunnerError(RunnerErrorKind::Timeout),
            ..BuildResult::empty()
        };
        let err = timeout.runner_error().unwrap();
        assert_eq!(err.to_string(), "Runner error (timeout): terminated");
    }
}
