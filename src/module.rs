//! Installed modules compared against the bundles
//!
//! A [`Module`] exists for every name found both on the device and in a
//! bundle. Its [`UpdateState`] is worked out fresh each time it is asked for.

use std::path::PathBuf;

use semver::Version;

use crate::backend::{self, ModuleBackend};
use crate::bundle::Bundle;
use crate::catalog::{CatalogEntry, ModuleCatalog};
use crate::error::{CircupError, Result};
use crate::metadata::{ArtifactVersion, Compatibility};
use crate::session::Session;

/// Version shown when a module declares none
pub const UNKNOWN_VERSION: &str = "unknown";

/// How an installed module relates to its bundle version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    UpToDate,
    MinorUpdate,
    /// Also used when either version is missing or not semver
    MajorUpdate,
    /// Compiled for a different firmware than the device runs
    MpyMismatch,
    /// Compiled file that could not be decoded
    BadFormat,
}

impl UpdateState {
    pub fn needs_update(self) -> bool {
        self != Self::UpToDate
    }

    /// Reason shown in the update table
    pub fn reason(self) -> Option<&'static str> {
        match self {
            Self::UpToDate => None,
            Self::MinorUpdate => Some("Minor Version"),
            Self::MajorUpdate => Some("Major Version"),
            Self::MpyMismatch => Some("MPY Format"),
            Self::BadFormat => Some("Corrupted"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Module<'a> {
    pub name: String,
    /// File name of a single file module, directory name of a package
    pub artifact: String,
    pub is_package: bool,
    pub device_location: String,
    pub device_version: Option<ArtifactVersion>,
    pub bundle_version: Option<String>,
    pub is_bytecode: bool,
    pub compatibility: Compatibility,
    pub repo: Option<String>,
    pub bundle: Option<&'a Bundle>,
}

impl<'a> Module<'a> {
    /// Combine what the device and a bundle know about one module
    pub fn new(device: &CatalogEntry<'_>, bundled: &CatalogEntry<'a>) -> Result<Self> {
        let device_metadata = device.metadata()?;
        let bundle_metadata = bundled.metadata()?;

        let module = Self {
            name: device.name.clone(),
            artifact: device.artifact_name().to_string(),
            is_package: device.is_package(),
            device_location: device.location().to_string(),
            device_version: device_metadata.version.clone(),
            bundle_version: bundle_metadata.declared_version().map(str::to_string),
            is_bytecode: device.is_bytecode(),
            compatibility: device_metadata.compatibility.clone(),
            repo: bundle_metadata
                .repo
                .clone()
                .or_else(|| device_metadata.repo.clone()),
            bundle: bundled.bundle,
        };
        tracing::info!("{:?}", module);
        Ok(module)
    }

    pub fn update_state(&self, session: &Session) -> UpdateState {
        if self.is_bytecode {
            if self
                .device_version
                .as_ref()
                .is_some_and(ArtifactVersion::is_bad_format)
            {
                return UpdateState::BadFormat;
            }
            if self.mpy_mismatch(&session.cpy_version) {
                return UpdateState::MpyMismatch;
            }
        }

        let device = self.device_version.as_ref().and_then(|v| self.parse(v.as_str()));
        let bundled = self.bundle_version.as_deref().and_then(|v| self.parse(v));
        let (Some(device), Some(bundled)) = (device, bundled) else {
            return UpdateState::MajorUpdate;
        };

        if bundled <= device {
            UpdateState::UpToDate
        } else if bundled.major != device.major {
            UpdateState::MajorUpdate
        } else {
            UpdateState::MinorUpdate
        }
    }

    /// Whether the firmware version lies outside `[min, max)`
    ///
    /// Unparseable versions are logged and count as compatible.
    fn mpy_mismatch(&self, cpy_version: &str) -> bool {
        let Ok(firmware) = Version::parse(cpy_version) else {
            tracing::warn!("CircuitPython has incorrect semver value: '{}'", cpy_version);
            return false;
        };
        let bound = |bound: &Option<String>| {
            bound.as_deref().and_then(|v| match Version::parse(v) {
                Ok(version) => Some(version),
                Err(e) => {
                    tracing::warn!("Module '{}' has incorrect MPY compatibility: {}", self.name, e);
                    None
                }
            })
        };

        if bound(&self.compatibility.min).is_some_and(|min| firmware < min) {
            return true;
        }
        bound(&self.compatibility.max).is_some_and(|max| firmware >= max)
    }

    fn parse(&self, version: &str) -> Option<Version> {
        match Version::parse(version) {
            Ok(version) => Some(version),
            Err(e) => {
                tracing::warn!("Module '{}' has incorrect semver value '{}': {}", self.name, version, e);
                None
            }
        }
    }

    /// Whether the bundle declares a version that is valid semver
    pub fn has_valid_bundle_version(&self) -> bool {
        self.bundle_version
            .as_deref()
            .is_none_or(|v| Version::parse(v).is_ok())
    }

    /// `(name, device version, bundle version, reason)` for the update table
    pub fn row(&self, session: &Session) -> [String; 4] {
        [
            self.name.clone(),
            self.device_version
                .as_ref()
                .map_or(UNKNOWN_VERSION, ArtifactVersion::as_str)
                .to_string(),
            self.bundle_version
                .clone()
                .unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
            self.update_state(session)
                .reason()
                .unwrap_or_default()
                .to_string(),
        ]
    }

    /// Local path of the matching artifact in the bundle cache
    ///
    /// Compiled modules come from the platform matching the device firmware.
    pub fn bundle_artifact(&self, session: &Session) -> Result<PathBuf> {
        let bundle = self.bundle.ok_or_else(|| CircupError::ModuleNotFound {
            name: self.name.clone(),
        })?;
        let platform = session.platform(self.is_bytecode)?;
        Ok(bundle.lib_dir(platform)?.join(&self.artifact))
    }

    /// Replace the device copy with the bundle copy
    pub fn update(&self, backend: &dyn ModuleBackend, session: &Session) -> Result<()> {
        let source = self.bundle_artifact(session)?;
        if !source.exists() {
            return Err(if self.is_bytecode {
                CircupError::CompiledArtifactMissing {
                    name: self.name.clone(),
                }
            } else {
                CircupError::NotFound {
                    path: source.display().to_string(),
                }
            });
        }

        let parent = parent_dir(&self.device_location);
        backend::remove_artifact(backend, &self.device_location, self.is_package)?;
        backend::copy_local_artifact(backend, &source, parent)
    }

}

/// Device modules that also exist in the bundles
pub fn find_modules<'a>(
    device: &ModuleCatalog<'_>,
    bundles: &ModuleCatalog<'a>,
) -> Result<Vec<Module<'a>>> {
    device
        .iter()
        .filter_map(|entry| bundles.get(&entry.name).map(|bundled| (entry, bundled)))
        .map(|(entry, bundled)| Module::new(entry, bundled))
        .collect()
}

fn parent_dir(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit_once('/')
        .map_or("", |(parent, _)| parent)
}
