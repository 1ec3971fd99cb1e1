//! The list of bundles to use
//!
//! The built-in list can be replaced as a whole by `bundle_config.json` in the
//! data directory. Bundles added with `bundle-add` are kept separately in
//! `bundle_config_local.json` and take priority over the others. Both files
//! map a display name to a `"owner/repository"` string.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::Bundle;
use crate::error::{CircupError, Result};
use crate::paths;

/// Bundles used when no overwrite file exists
pub const BUILTIN_BUNDLES: &[(&str, &str)] = &[
    ("adafruit", "adafruit/Adafruit_CircuitPython_Bundle"),
    ("circuitpython_community", "adafruit/CircuitPython_Community_Bundle"),
    ("circuitpython_org", "circuitpython/CircuitPython_Org_Bundle"),
];

#[allow(clippy::expect_used)]
static GITHUB_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://github\.com/([^/]+/[^/]+)(/.*)?$").expect("github url pattern is valid")
});

/// Turn a pasted GitHub URL into an `owner/repository` string
pub fn normalize_repo(input: &str) -> String {
    let input = input.trim();
    match GITHUB_URL.captures(input) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

fn read_map(path: &Path) -> Option<BTreeMap<String, String>> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<BTreeMap<String, String>>(&content) {
        Ok(map) => Some(map),
        Err(e) => {
            tracing::error!("Could not parse {}: {}", path.display(), e);
            None
        }
    }
}

/// Bundles added locally, empty when the file is missing or invalid
pub fn load_local(data_dir: &Path) -> BTreeMap<String, String> {
    let path = paths::bundle_config_local(data_dir);
    match read_map(&path) {
        Some(map) if !map.is_empty() => map,
        Some(_) => {
            tracing::error!("Local bundle list invalid. Skipped.");
            BTreeMap::new()
        }
        None => BTreeMap::new(),
    }
}

/// Save the local bundles, removing the file when there are none left
pub fn save_local(data_dir: &Path, bundles: &BTreeMap<String, String>) -> Result<()> {
    let path = paths::bundle_config_local(data_dir);
    if bundles.is_empty() {
        if path.is_file() {
            std::fs::remove_file(&path).map_err(|e| CircupError::FileWriteFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        return Ok(());
    }

    std::fs::create_dir_all(data_dir)?;
    let content = serde_json::to_string_pretty(bundles)?;
    std::fs::write(&path, content).map_err(|e| CircupError::FileWriteFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Repositories of the non-local bundles
pub fn load_configured(data_dir: &Path) -> Vec<(String, String)> {
    match read_map(&paths::bundle_config_overwrite(data_dir)) {
        Some(map) => map.into_iter().collect(),
        None => BUILTIN_BUNDLES
            .iter()
            .map(|(name, repo)| ((*name).to_string(), (*repo).to_string()))
            .collect(),
    }
}

/// All configured bundles as `(name, repository)`, local ones first
pub fn load_all(data_dir: &Path) -> Vec<(String, String)> {
    let mut all: Vec<(String, String)> = load_local(data_dir).into_iter().collect();
    for (name, repo) in load_configured(data_dir) {
        if !all.iter().any(|(_, existing)| *existing == repo) {
            all.push((name, repo));
        }
    }
    all
}

/// Bundle objects for every configured bundle
pub fn bundles(data_dir: &Path) -> Result<Vec<Bundle>> {
    let bundles = load_all(data_dir)
        .into_iter()
        .map(|(_, repo)| Bundle::new(&repo, data_dir))
        .collect::<Result<Vec<_>>>()?;
    tracing::info!(
        "Using bundles: {}",
        bundles.iter().map(Bundle::key).collect::<Vec<_>>().join(", ")
    );
    Ok(bundles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_bundles() {
        let temp = TempDir::new().unwrap();
        let all = load_all(temp.path());
        let repos: Vec<&str> = all.iter().map(|(_, repo)| repo.as_str()).collect();
        assert_eq!(
            repos,
            vec![
                "adafruit/Adafruit_CircuitPython_Bundle",
                "adafruit/CircuitPython_Community_Bundle",
                "circuitpython/CircuitPython_Org_Bundle",
            ]
        );
    }

    #[test]
    fn test_local_bundles_come_first() {
        let temp = TempDir::new().unwrap();
        let mut local = BTreeMap::new();
        local.insert("someone/Their_Bundle".to_string(), "someone/Their_Bundle".to_string());
        save_local(temp.path(), &local).unwrap();

        let all = load_all(temp.path());
        assert_eq!(all[0].1, "someone/Their_Bundle");
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_duplicate_repo_is_listed_once() {
        let temp = TempDir::new().unwrap();
        let mut local = BTreeMap::new();
        local.insert(
            "mine".to_string(),
            "adafruit/Adafruit_CircuitPython_Bundle".to_string(),
        );
        save_local(temp.path(), &local).unwrap();

        let all = load_all(temp.path());
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].0, "mine");
    }

    #[test]
    fn test_overwrite_replaces_builtin() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("bundle_config.json"),
            r#"{"only": "me/My_Bundle"}"#,
        )
        .unwrap();
        let all = load_all(temp.path());
        assert_eq!(all, vec![("only".to_string(), "me/My_Bundle".to_string())]);
    }

    #[test]
    fn test_invalid_overwrite_falls_back_to_builtin() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("bundle_config.json"), "oops").unwrap();
        assert_eq!(load_all(temp.path()).len(), BUILTIN_BUNDLES.len());
    }

    #[test]
    fn test_save_empty_removes_file() {
        let temp = TempDir::new().unwrap();
        let mut local = BTreeMap::new();
        local.insert("a/b".to_string(), "a/b".to_string());
        save_local(temp.path(), &local).unwrap();
        assert!(paths::bundle_config_local(temp.path()).exists());

        save_local(temp.path(), &BTreeMap::new()).unwrap();
        assert!(!paths::bundle_config_local(temp.path()).exists());
        assert!(load_local(temp.path()).is_empty());
    }

    #[test]
    fn test_normalize_repo() {
        assert_eq!(
            normalize_repo("https://github.com/adafruit/CircuitPython_Community_Bundle/releases"),
            "adafruit/CircuitPython_Community_Bundle"
        );
        assert_eq!(normalize_repo("http://github.com/a/b"), "a/b");
        assert_eq!(normalize_repo(" a/b "), "a/b");
    }
}
