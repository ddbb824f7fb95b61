use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Remembers which classes a test file declared, so unchanged files are not
/// loaded into a fresh interpreter on every build.
///
/// Entries are keyed by file path and validated against an md5 fingerprint of
/// the file content and the include path the probe ran with.
#[derive(Debug, Default)]
pub struct ProbeCache {
    entries: HashMap<PathBuf, CacheEntry>,
    cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    file: PathBuf,
    classes: Vec<String>,
    fingerprint: String,
}

impl ProbeCache {
    pub fn new(cache_dir: Option<PathBuf>) -> Self {
        Self {
            entries: HashMap::new(),
            cache_dir,
        }
    }

    pub fn get(&self, file_path: &Path, search_path: &str) -> Option<&[String]> {
        let entry = self.entries.get(file_path)?;
        let current = Self::fingerprint(file_path, search_path).ok()?;
        if current != entry.fingerprint {
            return None;
        }
        Some(&entry.classes)
    }

    pub fn insert(
        &mut self,
        file_path: &Path,
        search_path: &str,
        classes: Vec<String>,
    ) -> Result<()> {
        let entry = CacheEntry {
            file: file_path.to_path_buf(),
            classes,
            fingerprint: Self::fingerprint(file_path, search_path)?,
        };

        if self.cache_dir.is_some() {
            self.save_entry_to_disk(&entry)?;
        }
        self.entries.insert(file_path.to_path_buf(), entry);

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();

        if let Some(ref cache_dir) = self.cache_dir {
            let _ = std::fs::remove_dir_all(cache_dir);
        }
    }

    /// Load persisted entries; unreadable entries are skipped
    pub fn load_from_disk(&mut self) -> Result<()> {
        let Some(ref cache_dir) = self.cache_dir else {
            return Ok(());
        };
        if !cache_dir.exists() {
            return Ok(());
        }

        for entry in std::fs::read_dir(cache_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Ok(contents) = std::fs::read_to_string(&path) else {
                continue;
            };
            match serde_json::from_str::<CacheEntry>(&contents) {
                Ok(cache_entry) => {
                    self.entries.insert(cache_entry.file.clone(), cache_entry);
                }
                Err(e) => tracing::debug!("Ignoring probe cache entry {}: {}", path.display(), e),
            }
        }

        Ok(())
    }

    fn save_entry_to_disk(&self, entry: &CacheEntry) -> Result<()> {
        if let Some(ref cache_dir) = self.cache_dir {
            std::fs::create_dir_all(cache_dir)?;

            // One file per source path; the name only has to be stable
            let name = format!("{:x}", md5::compute(entry.file.to_string_lossy().as_bytes()));
            let cache_path = cache_dir.join(format!("{name}.json"));

            let contents = serde_json::to_string_pretty(entry).map_err(|e| {
                Error::Config(format!("Failed to serialize probe cache entry: {e}"))
            })?;

            std::fs::write(cache_path, contents)?;
        }

        Ok(())
    }

    fn fingerprint(file_path: &Path, search_path: &str) -> Result<String> {
        let mut contents = std::fs::read(file_path)?;
        contents.push(0);
        contents.extend_from_slice(search_path.as_bytes());
        Ok(format!("{:x}", md5::compute(&contents)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_hit_until_file_changes() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("FooTest.php");
        std::fs::write(&file, "<?php class FooTest {}")?;

        let mut cache = ProbeCache::new(None);
        cache.insert(&file, "/lib", vec!["FooTest".to_string()])?;
        assert_eq!(cache.get(&file, "/lib"), Some(&["FooTest".to_string()][..]));

        // Different include path, different answer
        assert!(cache.get(&file, "/other").is_none());

        std::fs::write(&file, "<?php class BarTest {}")?;
        assert!(cache.get(&file, "/lib").is_none());

        cache.clear();
        assert!(cache.is_empty());
        Ok(())
    }

    #[test]
    fn test_cache_with_disk_persistence() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let cache_dir = temp_dir.path().join("cache");
        let file = temp_dir.path().join("FooTest.php");
        std::fs::write(&file, "<?php class FooTest {}")?;

        let mut cache = ProbeCache::new(Some(cache_dir.clone()));
        cache.insert(&file, "", vec!["FooTest".to_string()])?;

        let mut reloaded = ProbeCache::new(Some(cache_dir));
        reloaded.load_from_disk()?;
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get(&file, ""), Some(&["FooTest".to_string()][..]));
        Ok(())
    }
}
