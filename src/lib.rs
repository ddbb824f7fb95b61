//! Fixture trees and stub runners shared by the end-to-end tests

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Echoes its arguments, then the suite file it was given
pub const ECHO_STUB: &str = r#"echo "ARGS: $*"
for last in "$@"; do :; done
cat "$last"
echo
echo "OK (2 tests, 2 assertions)""#;

/// Never finishes on its own; also leaves a child behind in the same group
pub const HANGING_STUB: &str = "sleep 60 &\nsleep 60\nwait";

/// Reports one failed test the way PHPUnit does
pub const FAILING_STUB: &str = r#"echo "F"
echo
echo "There was 1 failure:"
echo
echo "FAILURES!"
echo "Tests: 1, Assertions: 1, Failures: 1."
exit 1"#;

/// Answers `-l <file>` like the interpreter's lint mode; prefix it to another stub
pub const LINT_STUB: &str = r#"if [ "$1" = "-l" ]; then
  if grep -q BROKEN "$2"; then
    echo "PHP Parse error:  syntax error, unexpected end of file in $2 on line 1"
    exit 255
  fi
  echo "No syntax errors detected in $2"
  exit 0
fi"#;

/// A scratch project directory
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `relative`, creating parent directories
    pub fn write(&self, relative: impl AsRef<Path>, contents: &str) -> io::Result<PathBuf> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// A dependency root holding one test file that declares `class`
    pub fn root_with_test(&self, root: &str, class: &str) -> io::Result<PathBuf> {
        self.write(
            Path::new(root).join(format!("{class}.php")),
            &format!(
                "<?php
class {class} extends PHPUnit_Framework_TestCase
{{
    public function testTruth()
    {{
        $this->assertTrue(true);
    }}
}}
"
            ),
        )?;
        Ok(self.dir.path().join(root))
    }

    /// Mark `root` as carrying a 3.5+ PHPUnit tree
    pub fn modern_runner_in(&self, root: &str) -> io::Result<PathBuf> {
        self.write(Path::new(root).join("PHPUnit/Autoload.php"), "<?php\n")
    }

    /// Executable shell script standing in for the PHP interpreter
    #[cfg(unix)]
    pub fn stub_runner(&self, name: &str, body: &str) -> io::Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let path = self.write(Path::new("bin").join(name), &format!("#!/bin/sh\n{body}\n"))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }
}
