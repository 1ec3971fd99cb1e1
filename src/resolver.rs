//! Dependency resolution
//!
//! Expands a set of requested module names into everything they need, by
//! following the `requirements.txt` and `pyproject.toml` manifests shipped
//! in the bundles. Only names are followed; version constraints in the
//! manifests are dropped.

use std::collections::{BTreeSet, VecDeque};
use std::path::Path;

use crate::catalog::ModuleCatalog;

/// Libraries that exist for host Python only and never go on a device
pub const NOT_MCU_LIBRARIES: &[&str] = &[
    "",
    "adafruit-blinka",
    "adafruit-blinka-bleio",
    "adafruit-blinka-displayio",
    "adafruit-circuitpython-typing",
    "circuitpython_typing",
    "pyserial",
];

/// Unknown names that are not worth a warning
pub const WARNING_IGNORE_MODULES: &[&str] = &["typing-extensions", "pyasn1", "circuitpython-typing"];

/// Library names that do not follow the repository naming pattern
const NOT_STANDARD_NAMES: &[(&str, &str)] = &[
    ("adafruit_adafruitio", "adafruit_io"),
    ("adafruit_asyncio", "asyncio"),
    ("adafruit_busdevice", "adafruit_bus_device"),
    ("adafruit_connectionmanager", "adafruit_connection_manager"),
    ("adafruit_display_button", "adafruit_button"),
    ("adafruit_neopixel", "neopixel"),
    ("adafruit_sd", "adafruit_sdcard"),
    ("adafruit_simpleio", "simpleio"),
    ("pimoroni_ltr559", "pimoroni_circuitpython_ltr559"),
];

pub const REQUIREMENTS_FILE: &str = "requirements.txt";
pub const PYPROJECT_FILE: &str = "pyproject.toml";

/// Where the dependency manifests of a library are read from
pub trait ManifestSource {
    /// Contents of one manifest file of a library, `None` if it has none
    fn manifest(&self, library: &str, file_name: &str) -> Option<String>;
}

/// Turn a repository or PyPI name into the library name used in bundles
///
/// `adafruit-circuitpython-display-text` and
/// `Adafruit_CircuitPython_Display_Text` (lowercased) both become
/// `adafruit_display_text`.
pub fn clean_library_name(name: &str) -> String {
    let mut name = name.to_string();
    if name.contains("circuitpython") {
        name = name
            .replace("-circuitpython-", "_")
            .replace("_circuitpython_", "_")
            .replace('-', "_");
    }
    NOT_STANDARD_NAMES
        .iter()
        .find(|(assumed, _)| *assumed == name)
        .map_or(name, |(_, actual)| (*actual).to_string())
}

/// Library names listed in a `requirements.txt`
pub fn libraries_from_requirements(requirements: &str) -> Vec<String> {
    requirements
        .lines()
        .map(|line| line.to_lowercase())
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let end = line.find(['<', '>', '=', '~', '[', ';']).unwrap_or(line.len());
            line[..end].trim().to_string()
        })
        .collect()
}

/// Names from `[circup] circup_dependencies` in a `pyproject.toml`
///
/// The value may be a single string or a list of strings.
pub fn circup_dependencies(pyproject: &str) -> Vec<String> {
    let document: toml::Table = match pyproject.parse() {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!("Unable to parse pyproject.toml: {}", e);
            return Vec::new();
        }
    };

    match document
        .get("circup")
        .and_then(|circup| circup.get("circup_dependencies"))
    {
        Some(toml::Value::String(name)) => vec![name.clone()],
        Some(toml::Value::Array(names)) => names
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Outcome of resolving a set of requested names
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Every module to install, including dependencies
    pub modules: BTreeSet<String>,
    /// Requested or required names found nowhere
    pub unknown: Vec<String>,
}

pub struct DependencyResolver<'c, 'a> {
    catalog: &'c ModuleCatalog<'a>,
    manifests: Option<&'c dyn ManifestSource>,
}

impl<'c, 'a> DependencyResolver<'c, 'a> {
    /// Resolve against a bundle catalog, reading manifests from each module's bundle
    pub fn new(catalog: &'c ModuleCatalog<'a>) -> Self {
        Self {
            catalog,
            manifests: None,
        }
    }

    /// Read every manifest from one source instead
    pub fn with_manifests(mut self, manifests: &'c dyn ManifestSource) -> Self {
        self.manifests = Some(manifests);
        self
    }

    pub fn resolve<S: AsRef<str>>(&self, requested: &[S]) -> Resolution {
        let mut resolution = Resolution::default();
        let mut queue: VecDeque<String> =
            requested.iter().map(|s| s.as_ref().to_string()).collect();

        while let Some(raw) = queue.pop_front() {
            let lower = raw.trim().to_lowercase();
            if NOT_MCU_LIBRARIES.contains(&lower.as_str()) {
                tracing::info!("Skipping {}. It is not for microcontroller installs.", raw);
                continue;
            }

            let canonical = clean_library_name(&lower);
            let Some(entry) = self.catalog.find(&canonical) else {
                if Path::new(&raw).exists() {
                    // local override, no manifests to follow
                    resolution.modules.insert(raw);
                } else if !WARNING_IGNORE_MODULES.contains(&canonical.as_str()) {
                    tracing::warn!("{} is not a known CircuitPython library.", canonical);
                    if !resolution.unknown.contains(&canonical) {
                        resolution.unknown.push(canonical);
                    }
                }
                continue;
            };

            if !resolution.modules.insert(entry.name.clone()) {
                continue;
            }

            let source: Option<&dyn ManifestSource> = match self.manifests {
                Some(manifests) => Some(manifests),
                None => entry.bundle.map(|b| b as &dyn ManifestSource),
            };
            let Some(source) = source else {
                continue;
            };

            if let Some(requirements) = source.manifest(&entry.name, REQUIREMENTS_FILE) {
                queue.extend(libraries_from_requirements(&requirements));
            }
            if let Some(pyproject) = source.manifest(&entry.name, PYPROJECT_FILE) {
                queue.extend(circup_dependencies(&pyproject));
            }
        }

        resolution
    }
}
