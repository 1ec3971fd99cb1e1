//! Library bundles
//!
//! A bundle is a GitHub repository publishing release zips of CircuitPython
//! libraries, one per platform. Downloads are unpacked below the data
//! directory:
//!
//! ```text
//! <data>/<owner>/<bundle-id>-<platform>/<bundle-id>-<archive>-<tag>/lib/...
//! <data>/<owner>/<bundle-id>-py/<bundle-id>-py-<tag>/requirements/<lib>/requirements.txt
//! <data>/<owner>/<bundle-id>-py/<bundle-id>-py-<tag>/examples/<lib>/<example>.py
//! ```
//!
//! where `<bundle-id>` is the lowercased repository name with `_` replaced by
//! `-`, `<platform>` one of `py`, `8mpy`, `9mpy` and `<archive>` the matching
//! release asset name (`py`, `8.x-mpy`, `9.x-mpy`).

pub mod config;
pub mod download;
pub mod tags;

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use crate::error::{CircupError, Result};
use crate::resolver::ManifestSource;

/// Platform of the Python source libraries
pub const PY_PLATFORM: &str = "py";

/// Platform identifiers and the release asset name for each
pub const PLATFORMS: &[(&str, &str)] = &[("py", "py"), ("8mpy", "8.x-mpy"), ("9mpy", "9.x-mpy")];

const GITHUB: &str = "https://github.com";

/// Release asset name of a platform
pub fn archive_name(platform: &str) -> Option<&'static str> {
    PLATFORMS
        .iter()
        .find(|(id, _)| *id == platform)
        .map(|(_, archive)| *archive)
}

/// Compiled platform matching a firmware version, e.g. `9.1.4` → `9mpy`
pub fn platform_for_version(firmware_version: &str) -> Result<&'static str> {
    let major = firmware_version.split('.').next().unwrap_or_default();
    let platform = format!("{major}mpy");
    PLATFORMS
        .iter()
        .find(|(id, _)| *id == platform)
        .map(|(id, _)| *id)
        .ok_or_else(|| CircupError::UnsupportedPlatform {
            version: firmware_version.to_string(),
        })
}

pub struct Bundle {
    key: String,
    host: String,
    vendor: String,
    bundle_id: String,
    data_dir: PathBuf,
    current: RefCell<Option<String>>,
    latest: RefCell<Option<String>>,
}

impl Bundle {
    /// Create a bundle from its `"owner/repository"` string
    pub fn new(repo: &str, data_dir: &Path) -> Result<Self> {
        let invalid = || CircupError::InvalidBundleName {
            name: repo.to_string(),
        };
        let (vendor, name) = repo.split_once('/').ok_or_else(invalid)?;
        if vendor.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }

        Ok(Self {
            key: repo.to_string(),
            host: GITHUB.to_string(),
            vendor: vendor.to_string(),
            bundle_id: name.to_lowercase().replace('_', "-"),
            data_dir: data_dir.to_path_buf(),
            current: RefCell::new(None),
            latest: RefCell::new(None),
        })
    }

    /// The `owner/repository` string identifying the bundle
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Serve releases from another host than GitHub
    #[must_use]
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.trim_end_matches('/').to_string();
        self
    }

    pub fn url(&self) -> String {
        format!("{}/{}", self.host, self.key)
    }

    pub fn bundle_id(&self) -> &str {
        &self.bundle_id
    }

    /// Name of an unpacked release, `<bundle-id>-<archive>-<tag>`
    pub fn basename(&self, archive: &str, tag: &str) -> String {
        format!("{}-{}-{}", self.bundle_id, archive, tag)
    }

    /// Directory a platform's release zip is unpacked into
    pub fn platform_dir(&self, platform: &str) -> PathBuf {
        self.data_dir
            .join(&self.vendor)
            .join(format!("{}-{}", self.bundle_id, platform))
    }

    /// Where a platform's release zip is downloaded to
    pub fn zip_path(&self, platform: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}-{}.zip", self.bundle_id, platform))
    }

    /// Release asset URL of a platform zip
    pub fn download_url(&self, archive: &str, tag: &str) -> String {
        format!(
            "{}/releases/download/{}/{}.zip",
            self.url(),
            tag,
            self.basename(archive, tag)
        )
    }

    pub fn latest_release_url(&self) -> String {
        format!("{}/releases/latest", self.url())
    }

    fn release_dir(&self, platform: &str) -> Result<PathBuf> {
        let archive = archive_name(platform).ok_or_else(|| CircupError::UnsupportedPlatform {
            version: platform.to_string(),
        })?;
        Ok(self
            .platform_dir(platform)
            .join(self.basename(archive, &self.current_tag())))
    }

    /// Library directory of a platform for the current tag
    pub fn lib_dir(&self, platform: &str) -> Result<PathBuf> {
        Ok(self.release_dir(platform)?.join("lib"))
    }

    fn source_release_dir(&self) -> PathBuf {
        self.platform_dir(PY_PLATFORM)
            .join(self.basename(PY_PLATFORM, &self.current_tag()))
    }

    /// Library directory of the Python source platform
    pub fn source_lib_dir(&self) -> PathBuf {
        self.source_release_dir().join("lib")
    }

    /// Directory holding the manifests of one library
    pub fn requirements_dir(&self, library: &str) -> PathBuf {
        self.source_release_dir().join("requirements").join(library)
    }

    /// Library examples shipped with the Python source release
    pub fn examples_dir(&self) -> PathBuf {
        self.source_release_dir().join("examples")
    }

    /// The downloaded tag, read from the tag cache the first time
    pub fn current_tag(&self) -> String {
        if let Some(tag) = self.current.borrow().as_ref() {
            return tag.clone();
        }
        let tag = tags::TagCache::load(&self.data_dir)
            .get(&self.key)
            .unwrap_or_default()
            .to_string();
        *self.current.borrow_mut() = Some(tag.clone());
        tag
    }

    /// Record a freshly downloaded tag
    pub fn set_current_tag(&self, tag: &str) -> Result<()> {
        tags::save_tag(&self.data_dir, &self.key, tag)?;
        *self.current.borrow_mut() = Some(tag.to_string());
        Ok(())
    }

    /// Latest published tag, looked up once through `lookup`
    pub fn latest_tag<F>(&self, lookup: F) -> Result<String>
    where
        F: FnOnce(&str) -> Result<String>,
    {
        if let Some(tag) = self.latest.borrow().as_ref() {
            return Ok(tag.clone());
        }
        let tag = lookup(&self.latest_release_url())?;
        *self.latest.borrow_mut() = Some(tag.clone());
        Ok(tag)
    }

    /// Whether every platform of the current tag is unpacked
    pub fn is_downloaded(&self) -> bool {
        !self.current_tag().is_empty()
            && PLATFORMS.iter().all(|(platform, _)| {
                self.lib_dir(platform).map(|dir| dir.is_dir()).unwrap_or(false)
            })
    }
}

impl ManifestSource for Bundle {
    fn manifest(&self, library: &str, file_name: &str) -> Option<String> {
        let path = self.requirements_dir(library).join(file_name);
        std::fs::read_to_string(path).ok()
    }
}

impl std::fmt::Debug for Bundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundle")
            .field("key", &self.key)
            .field("url", &self.url())
            .field("current", &self.current.borrow())
            .field("latest", &self.latest.borrow())
            .finish()
    }
}

impl PartialEq for Bundle {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
