use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::runner::RunnerProfile;

/// A fully normalized runner command line.
///
/// Built once by the normalizer through the consuming `with_*` methods and
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunnerInvocation {
    profile: RunnerProfile,
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl RunnerInvocation {
    pub fn new(profile: RunnerProfile, program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            profile,
            program: program.into(),
            args,
            working_dir: None,
            env: Vec::new(),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn profile(&self) -> RunnerProfile {
        self.profile
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn env_vars(&self) -> &[(String, String)] {
        &self.env
    }

    /// Human-readable command line, for logs and `--dry-run`
    pub fn to_shell_command(&self) -> String {
        let mut cmd = quote(&self.program.to_string_lossy());
        for arg in &self.args {
            cmd.push(' ');
            cmd.push_str(&quote(arg));
        }
        cmd
    }
}

fn quote(arg: &str) -> String {
    if arg.is_empty() || arg.contains([' ', '"', '\'', '$']) {
        format!("'{}'", arg.replace('\'', r"'\''"))
    } else {
        arg.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_command_quotes_spaces() {
        let invocation = RunnerInvocation::new(
            RunnerProfile::Modern,
            "php",
            vec![
                "-d".to_string(),
                "include_path=/a b:/c".to_string(),
                "boot.php".to_string(),
            ],
        )
        .with_env("PHPBRIDGE_INCLUDE_PATH", "/a b:/c");

        assert_eq!(
            invocation.to_shell_command(),
            "php -d 'include_path=/a b:/c' boot.php"
        );
        assert_eq!(invocation.env_vars().len(), 1);
    }
}
