//! Syntax check of PHP sources with `php -l`

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// One file the interpreter rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintFailure {
    pub file: PathBuf,
    pub message: String,
}

/// Outcome of linting every PHP file below a set of roots
#[derive(Debug, Clone, Default, Serialize)]
pub struct LintReport {
    pub checked: usize,
    pub failures: Vec<LintFailure>,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turn failures into [`Error::Syntax`], naming the first offending file
    pub fn into_result(self) -> Result<Self> {
        match self.failures.first() {
            None => Ok(self),
            Some(first) => Err(Error::Syntax {
                count: self.failures.len(),
                file: first.file.clone(),
                message: first.message.clone(),
            }),
        }
    }
}

/// Runs the interpreter's syntax check once per file
#[derive(Debug, Clone)]
pub struct Linter {
    executable: PathBuf,
}

impl Linter {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Lint every `.php` file below `roots`; absent roots are skipped
    pub fn lint(&self, roots: &[PathBuf]) -> Result<LintReport> {
        let mut report = LintReport::default();
        for root in roots {
            if !root.exists() {
                debug!("Skipping absent lint root {}", root.display());
                continue;
            }
            for file in php_files(root) {
                report.checked += 1;
                if let Some(message) = self.check(&file)? {
                    report.failures.push(LintFailure { file, message });
                }
            }
        }
        info!(
            "Linted {} files, {} with syntax errors",
            report.checked,
            report.failures.len()
        );
        Ok(report)
    }

    /// `None` when the file parses, else the interpreter's complaint
    fn check(&self, file: &Path) -> Result<Option<String>> {
        debug!("Validating {}", file.display());
        let output = Command::new(&self.executable)
            .arg("-l")
            .arg(file)
            .output()
            .map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!("failed to start {}: {e}", self.executable.display()),
                )
            })?;
        if output.status.success() {
            return Ok(None);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = stdout
            .lines()
            .chain(stderr.lines())
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with("Errors parsing"))
            .map(str::to_string)
            .unwrap_or_else(|| format!("interpreter exited with {}", output.status));
        Ok(Some(message))
    }
}

fn php_files(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "php"))
        .map(|e| e.into_path())
        .collect()
}
