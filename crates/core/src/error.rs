use std::fmt;
use std::io;
use std::path::PathBuf;

/// Why a runner invocation could not produce a usable test outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunnerErrorKind {
    /// The subprocess did not exit within the configured timeout and was killed
    Timeout,
    /// The runner died before reporting (interpreter fatal error, signal, no output)
    Crash,
    /// Nonzero exit with output that carries no recognizable test markers
    UnrecognizedOutput,
}

impl fmt::Display for RunnerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunnerErrorKind::Timeout => "timeout",
            RunnerErrorKind::Crash => "crash",
            RunnerErrorKind::UnrecognizedOutput => "unrecognized output",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during a phpbridge build step
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Dependency {coordinate} is not available at {}", expected.display())]
    MissingDependencyRoot {
        coordinate: String,
        expected: PathBuf,
    },

    #[error("Classloader base directory {} does not exist", path.display())]
    MissingClassloaderBase { path: PathBuf },

    #[error(
        "Unable to detect the test class of {}: expected exactly one new class, found [{}]",
        file.display(),
        found.join(", ")
    )]
    AmbiguousTestClass { file: PathBuf, found: Vec<String> },

    #[error("Runner error ({reason}): {detail}")]
    Runner {
        reason: RunnerErrorKind,
        detail: String,
    },

    #[error(
        "Archive destination {destination} is written by both {} and {}",
        first.display(),
        second.display()
    )]
    LayoutCollision {
        destination: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error(
        "{relative} is defined under both {} and {}",
        first.display(),
        second.display()
    )]
    ConflictingDefinition {
        relative: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("No test case found under {}", root.display())]
    NoTestsFound { root: PathBuf },

    #[error("Class probe failed for {}: {message}", file.display())]
    Probe { file: PathBuf, message: String },

    #[error(
        "{count} file(s) failed the syntax check, first {}: {message}",
        file.display()
    )]
    Syntax {
        count: usize,
        file: PathBuf,
        message: String,
    },

    #[error("Invalid dependency coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Process exit code surfaced to the host for a fatal error
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Result type alias for phpbridge operations
pub type Result<T> = std::result::Result<T, Error>;
