//! Class probes: which classes does loading a test file declare?

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use tracing::debug;

use crate::{
    error::{Error, Result},
    types::IncludePath,
};

/// Loads a test file and enumerates the classes it newly declares
pub trait ClassProbe: Send + Sync {
    fn declared_classes(&self, file: &Path, include_path: &IncludePath) -> Result<Vec<String>>;

    fn name(&self) -> &'static str;
}

/// Diffs `get_declared_classes()` around a `require_once` in a fresh interpreter
#[derive(Debug, Clone)]
pub struct InterpreterProbe {
    executable: PathBuf,
}

const PROBE_SCRIPT: &str = "$before = get_declared_classes(); \
require_once $argv[1]; \
echo PHP_EOL, json_encode(array_values(array_diff(get_declared_classes(), $before))), PHP_EOL;";

impl Default for InterpreterProbe {
    fn default() -> Self {
        Self::new("php")
    }
}

impl InterpreterProbe {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl ClassProbe for InterpreterProbe {
    fn declared_classes(&self, file: &Path, include_path: &IncludePath) -> Result<Vec<String>> {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-d")
            .arg(format!("include_path={}", include_path.to_search_path()))
            .arg("-r")
            .arg(PROBE_SCRIPT)
            .arg("--")
            .arg(file);
        if let Some(dir) = file.parent() {
            cmd.current_dir(dir);
        }
        debug!("Probing {} with {}", file.display(), self.executable.display());

        let output = cmd.output().map_err(|e| Error::Probe {
            file: file.to_path_buf(),
            message: format!("failed to start {}: {e}", self.executable.display()),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Probe {
                file: file.to_path_buf(),
                message: format!(
                    "interpreter exited with {}: {}{}",
                    output.status,
                    stdout.trim(),
                    stderr.trim()
                ),
            });
        }

        // The file may print on load; the diff is always the last line
        let last = stdout.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
        serde_json::from_str(last.trim()).map_err(|e| Error::Probe {
            file: file.to_path_buf(),
            message: format!("unparsable probe output {last:?}: {e}"),
        })
    }

    fn name(&self) -> &'static str {
        "interpreter"
    }
}

static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\bnamespace\s+([A-Za-z_][A-Za-z0-9_\\]*)\s*[;{]",
        r"|\b(?:(?:abstract|final|readonly)\s+)*class\s+([A-Za-z_][A-Za-z0-9_]*)",
    ))
    .expect("declaration pattern is valid")
});

/// Reads class declarations from the source without running it
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarationScanProbe;

impl DeclarationScanProbe {
    pub fn new() -> Self {
        Self
    }

    /// Namespace-qualified class names declared in `source`, in order
    pub fn scan(source: &str) -> Vec<String> {
        let code = strip_comments_and_strings(source);
        let mut namespace = String::new();
        let mut classes = Vec::new();

        for caps in DECLARATION.captures_iter(&code) {
            if let Some(ns) = caps.get(1) {
                namespace = ns.as_str().trim_matches('\\').to_string();
                continue;
            }
            let Some(name) = caps.get(2) else {
                continue;
            };
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let before = code[..whole.start()].trim_end();
            // `Foo::class` and `new class ...` are not declarations
            if before.ends_with("::") || before.ends_with("->") || ends_with_word(before, "new") {
                continue;
            }
            let name = name.as_str();
            if matches!(name.to_ascii_lowercase().as_str(), "extends" | "implements") {
                continue;
            }
            if namespace.is_empty() {
                classes.push(name.to_string());
            } else {
                classes.push(format!("{namespace}\\{name}"));
            }
        }

        classes
    }
}

impl ClassProbe for DeclarationScanProbe {
    fn declared_classes(&self, file: &Path, _include_path: &IncludePath) -> Result<Vec<String>> {
        let source = std::fs::read_to_string(file).map_err(|e| Error::Probe {
            file: file.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self::scan(&source))
    }

    fn name(&self) -> &'static str {
        "scan"
    }
}

fn ends_with_word(text: &str, word: &str) -> bool {
    let Some(rest) = text.strip_suffix(word) else {
        return false;
    };
    !rest.ends_with(|c: char| c.is_alphanumeric() || c == '_')
}

/// Blank out comments and string literal contents, keeping the code around them
fn strip_comments_and_strings(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => skip_line(&mut chars, &mut out),
            '#' if chars.peek() != Some(&'[') => skip_line(&mut chars, &mut out),
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            '\'' | '"' => {
                let quote = c;
                let mut escaped = false;
                for c in chars.by_ref() {
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == quote {
                        break;
                    }
                }
                out.push(quote);
                out.push(quote);
            }
            _ => out.push(c),
        }
    }

    out
}

fn skip_line(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, out: &mut String) {
    for c in chars.by_ref() {
        if c == '\n' {
            out.push('\n');
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_finds_plain_class() {
        let source = "<?php\nrequire_once 'PHPUnit/Framework.php';\n\n\
                      class FooTest extends PHPUnit_Framework_TestCase\n{\n}\n";
        assert_eq!(DeclarationScanProbe::scan(source), vec!["FooTest"]);
    }

    #[test]
    fn test_scan_qualifies_with_namespace() {
        let source = r#"<?php
namespace Acme\Tests;

use PHPUnit\Framework\TestCase;

final class BarTest extends TestCase
{
    public function testName()
    {
        $this->assertSame(BarTest::class, get_class($this));
    }
}
"#;
        assert_eq!(DeclarationScanProbe::scan(source), vec!["Acme\\Tests\\BarTest"]);
    }

    #[test]
    fn test_scan_ignores_comments_strings_and_anonymous_classes() {
        let source = r#"<?php
// class NotThis {}
/* class NorThis {} */
# class AlsoNot {}
$s = 'class InString {}';
$t = "class InDouble {}";
$anon = new class extends Base {};
abstract class RealTest {}
"#;
        assert_eq!(DeclarationScanProbe::scan(source), vec!["RealTest"]);
    }

    #[test]
    fn test_scan_reports_every_declaration() {
        let source = "<?php class OneTest {} class TwoTest {}";
        assert_eq!(DeclarationScanProbe::scan(source), vec!["OneTest", "TwoTest"]);
    }

    #[test]
    fn test_scan_probe_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("QuxTest.php");
        std::fs::write(&file, "<?php class QuxTest {}").unwrap();
        let classes = DeclarationScanProbe::new()
            .declared_classes(&file, &IncludePath::default())
            .unwrap();
        assert_eq!(classes, vec!["QuxTest"]);
    }

    #[test]
    fn test_interpreter_probe_missing_executable_is_probe_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("QuxTest.php");
        std::fs::write(&file, "<?php class QuxTest {}").unwrap();
        let err = InterpreterProbe::new(dir.path().join("no-php"))
            .declared_classes(&file, &IncludePath::default())
            .unwrap_err();
        assert!(matches!(err, Error::Probe { .. }));
    }
}
