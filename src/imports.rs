//! Finding the libraries a script imports
//!
//! Used by `install --auto`. Only top-level package names are kept, so
//! `import adafruit_hid.keyboard` yields `adafruit_hid`.

use std::sync::LazyLock;

use regex::Regex;

use crate::catalog::ModuleCatalog;

#[allow(clippy::expect_used)]
static IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+(.+)$").expect("import pattern is valid"));

#[allow(clippy::expect_used)]
static FROM_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*from\s+([\w.]+)\s+import\b").expect("from-import pattern is valid")
});

/// Top-level names of every module imported by a script, in order of appearance
pub fn imported_names(source: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut add = |module: &str| {
        let top = module.split('.').next().unwrap_or_default().trim();
        if !top.is_empty() && !names.iter().any(|n| n == top) {
            names.push(top.to_string());
        }
    };

    for line in source.lines() {
        let line = line.split('#').next().unwrap_or_default();
        if let Some(caps) = FROM_IMPORT.captures(line) {
            // relative imports refer to the project, not a library
            if !caps[1].starts_with('.') {
                add(&caps[1]);
            }
        } else if let Some(caps) = IMPORT.captures(line) {
            for part in caps[1].split(',') {
                let module = part.split(" as ").next().unwrap_or_default();
                add(module.trim());
            }
        }
    }
    names
}

/// Imported names that are modules in the catalog
pub fn libraries_from_code(source: &str, catalog: &ModuleCatalog<'_>) -> Vec<String> {
    imported_names(source)
        .into_iter()
        .filter_map(|name| catalog.find(&name).map(|entry| entry.name.clone()))
        .collect()
}
