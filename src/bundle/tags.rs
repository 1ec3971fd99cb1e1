//! Cache of the downloaded release tag of each bundle
//!
//! Stored as a flat JSON object, `{"adafruit/Adafruit_CircuitPython_Bundle": "20240917"}`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CircupError, Result};
use crate::paths;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TagCache {
    tags: BTreeMap<String, String>,
}

impl TagCache {
    /// Load the cache from the data directory
    ///
    /// A missing file is an empty cache. So is a corrupt one, which is logged.
    pub fn load(data_dir: &Path) -> Self {
        let path = paths::tags_file(data_dir);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };

        match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(serde_json::Value::Object(map)) => {
                let tags = map
                    .into_iter()
                    .filter_map(|(key, value)| match value {
                        serde_json::Value::String(tag) => Some((key, tag)),
                        _ => None,
                    })
                    .collect();
                Self { tags }
            }
            Ok(_) => {
                tracing::error!("Unexpected contents in {}", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::error!("Could not parse {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, tag: &str) {
        self.tags.insert(key.to_string(), tag.to_string());
    }

    pub fn save(&self, data_dir: &Path) -> Result<PathBuf> {
        let path = paths::tags_file(data_dir);
        std::fs::create_dir_all(data_dir).map_err(|e| CircupError::FileWriteFailed {
            path: data_dir.display().to_string(),
            reason: e.to_string(),
        })?;
        let content = serde_json::to_string(&self.tags)?;
        std::fs::write(&path, content).map_err(|e| CircupError::FileWriteFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(path)
    }
}

/// Record a new tag for one bundle, keeping the others
pub fn save_tag(data_dir: &Path, key: &str, tag: &str) -> Result<()> {
    let mut cache = TagCache::load(data_dir);
    cache.set(key, tag);
    cache.save(data_dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip() {
        let temp = TempDir::new().unwrap();
        save_tag(temp.path(), "adafruit/Adafruit_CircuitPython_Bundle", "20240917").unwrap();
        save_tag(temp.path(), "circuitpython/CircuitPython_Org_Bundle", "20240915").unwrap();

        let cache = TagCache::load(temp.path());
        assert_eq!(
            cache.get("adafruit/Adafruit_CircuitPython_Bundle"),
            Some("20240917")
        );
        assert_eq!(
            cache.get("circuitpython/CircuitPython_Org_Bundle"),
            Some("20240915")
        );
        assert_eq!(cache.get("someone/else"), None);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        assert_eq!(TagCache::load(temp.path()), TagCache::default());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("circup.json"), "{not json").unwrap();
        assert_eq!(TagCache::load(temp.path()), TagCache::default());

        std::fs::write(temp.path().join("circup.json"), "[1, 2]").unwrap();
        assert_eq!(TagCache::load(temp.path()), TagCache::default());
    }

    #[test]
    fn test_corrupt_file_is_replaced_on_save() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("circup.json"), "{not json").unwrap();
        save_tag(temp.path(), "a/b", "1").unwrap();
        assert_eq!(TagCache::load(temp.path()).get("a/b"), Some("1"));
    }
}
