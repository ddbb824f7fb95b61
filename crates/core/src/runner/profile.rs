use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

use crate::{impl_case_insensitive_deserialize, types::IncludePath};

/// PHPUnit CLI generation; every version-conditional detail hangs off this
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunnerProfile {
    /// PHPUnit 3.4 and older: explicit util requires, `--log-xml`, class and file targets
    Legacy,
    /// PHPUnit 3.5 and newer: autoloader, `--log-junit`, file targets
    Modern,
}

impl_case_insensitive_deserialize!(
    RunnerProfile,
    Legacy => "legacy",
    Modern => "modern"
);

impl fmt::Display for RunnerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerProfile::Legacy => f.write_str("legacy"),
            RunnerProfile::Modern => f.write_str("modern"),
        }
    }
}

/// Present only in the 3.5+ tree
pub const MODERN_MARKER: &str = "PHPUnit/Autoload.php";
pub const LEGACY_MARKER: &str = "PHPUnit/TextUI/Command.php";

impl RunnerProfile {
    /// Pick the profile once: a configured hint wins, then the include path decides
    pub fn detect(hint: Option<RunnerProfile>, include_path: &IncludePath) -> Self {
        if let Some(profile) = hint {
            debug!("Using configured runner profile {}", profile);
            return profile;
        }
        if let Some(root) = include_path.lookup(MODERN_MARKER) {
            debug!("Found {} under {}", MODERN_MARKER, root.display());
            return RunnerProfile::Modern;
        }
        if let Some(root) = include_path.lookup(LEGACY_MARKER) {
            debug!("Found {} under {}", LEGACY_MARKER, root.display());
            return RunnerProfile::Legacy;
        }
        warn!("PHPUnit not on the include path; assuming a modern runner on the default path");
        RunnerProfile::Modern
    }

    /// Flag that makes the runner write a junit report
    pub fn log_flag(self) -> &'static str {
        match self {
            RunnerProfile::Legacy => "--log-xml",
            RunnerProfile::Modern => "--log-junit",
        }
    }

    pub fn supports_configuration(self) -> bool {
        matches!(self, RunnerProfile::Modern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryOrigin, IncludeEntry, IncludePathBuilder};
    use std::fs;
    use tempfile::TempDir;

    fn include_path_with(files: &[&str]) -> (TempDir, IncludePath) {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "<?php").unwrap();
        }
        let mut builder = IncludePathBuilder::new();
        builder.append(IncludeEntry::new(dir.path(), EntryOrigin::PackageManager));
        (dir, builder.build(Vec::new()))
    }

    #[test]
    fn test_detect_from_include_path() {
        let (_modern_dir, modern) = include_path_with(&[MODERN_MARKER, LEGACY_MARKER]);
        assert_eq!(RunnerProfile::detect(None, &modern), RunnerProfile::Modern);

        let (_legacy_dir, legacy) = include_path_with(&[LEGACY_MARKER]);
        assert_eq!(RunnerProfile::detect(None, &legacy), RunnerProfile::Legacy);

        let (_empty_dir, empty) = include_path_with(&[]);
        assert_eq!(RunnerProfile::detect(None, &empty), RunnerProfile::Modern);
    }

    #[test]
    fn test_hint_wins() {
        let (_dir, modern) = include_path_with(&[MODERN_MARKER]);
        assert_eq!(
            RunnerProfile::detect(Some(RunnerProfile::Legacy), &modern),
            RunnerProfile::Legacy
        );
    }

    #[test]
    fn test_log_flags() {
        assert_eq!(RunnerProfile::Legacy.log_flag(), "--log-xml");
        assert_eq!(RunnerProfile::Modern.log_flag(), "--log-junit");
    }
}
