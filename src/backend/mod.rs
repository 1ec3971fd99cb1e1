//! Device backends
//!
//! A [`ModuleBackend`] is bound to one device for its lifetime and exposes a
//! small filesystem-like surface over it. Two transports exist:
//!
//! - [`DiskBackend`]: the CIRCUITPY drive mounted over USB
//! - [`WebBackend`]: the HTTP web workflow pseudo-filesystem
//!
//! Paths passed to a backend are device-relative and `/`-separated, e.g.
//! `lib/adafruit_bus_device/i2c_device.py`. Each backend owns how such a path
//! maps onto its medium. Code above this module never branches on which
//! backend it is talking to.

pub mod disk;
pub mod web;


use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::error::{CircupError, Result};

pub use disk::DiskBackend;
pub use web::WebBackend;

/// Library directory on the device
pub const LIBRARY_DIR: &str = "lib";

/// File written by CircuitPython on boot, holding the firmware version
pub const BOOT_OUT_FILE: &str = "boot_out.txt";

/// One child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    /// Modification time in nanoseconds since the epoch, when known
    pub mtime: Option<u64>,
}

/// Firmware version and board id reported by a device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub firmware_version: String,
    pub board_id: String,
}

/// A device artifact available as a local file
///
/// Temporary copies are removed when dropped.
#[derive(Debug)]
pub enum StagedArtifact {
    Local(PathBuf),
    Temporary(NamedTempFile),
}

impl StagedArtifact {
    pub fn path(&self) -> &Path {
        match self {
            Self::Local(path) => path,
            Self::Temporary(file) => file.path(),
        }
    }
}

/// Operations every device transport provides
pub trait ModuleBackend {
    /// Human readable location of the device, for messages
    fn location(&self) -> String;

    /// Device-relative library directory
    fn library_dir(&self) -> &str {
        LIBRARY_DIR
    }

    /// List the immediate children of a directory
    fn enumerate(&self, path: &str) -> Result<Vec<DirEntry>>;

    /// Read a whole file
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Make a file available on the local filesystem
    fn stage(&self, path: &str) -> Result<StagedArtifact>;

    /// Create or replace a file
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Create a directory, succeeding if it already exists
    fn mkdir(&self, path: &str) -> Result<()>;

    /// Delete a file, or a directory with everything below it
    fn delete(&self, path: &str) -> Result<()>;

    fn exists(&self, path: &str) -> Result<bool>;

    fn identity(&self) -> Result<DeviceIdentity>;

    /// Free space on the device in bytes
    fn free_space(&self) -> Result<u64>;

    fn is_present(&self) -> bool;
}

/// Join a device-relative directory and a child name
pub fn join(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        dir.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Last component of a device-relative path
pub fn file_name(path: &str) -> &str {
    let path = path.trim_end_matches('/');
    path.rsplit('/').next().unwrap_or(path)
}

/// Parse the contents of `boot_out.txt`
///
/// ```text
/// Adafruit CircuitPython 9.1.4 on 2024-09-17; Adafruit QT Py ESP32S2 with ESP32S2
/// Board ID:adafruit_qtpy_esp32s2
/// ```
///
/// The version is the third word from the end of the text before `;`.
pub fn parse_boot_out(content: &str) -> Option<DeviceIdentity> {
    let mut lines = content.lines();
    let version_line = lines.next()?;
    let head = version_line.split(';').next().unwrap_or_default();
    let words: Vec<&str> = head.split(' ').collect();
    let firmware_version = words.len().checked_sub(3).map(|i| words[i])?;
    if firmware_version.is_empty() {
        return None;
    }

    let board_id = lines
        .next()
        .and_then(|line| line.strip_prefix("Board ID:"))
        .map(|id| id.trim().to_string())
        .unwrap_or_default();

    Some(DeviceIdentity {
        firmware_version: firmware_version.to_string(),
        board_id,
    })
}

/// Copy one local file into a device directory, keeping its name
pub fn copy_local_file(backend: &dyn ModuleBackend, local: &Path, device_dir: &str) -> Result<()> {
    let name = local_file_name(local)?;
    let bytes = std::fs::read(local).map_err(|e| CircupError::FileReadFailed {
        path: local.display().to_string(),
        reason: e.to_string(),
    })?;
    let target = join(device_dir, &name);
    tracing::debug!("Writing {} to {}", local.display(), target);
    backend.write(&target, &bytes)
}

/// Copy a local directory tree onto the device as `device_dir`
///
/// Directories are created before the files below them.
pub fn copy_local_tree(backend: &dyn ModuleBackend, local_dir: &Path, device_dir: &str) -> Result<()> {
    backend.mkdir(device_dir)?;

    for entry in WalkDir::new(local_dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(local_dir)
            .map_err(|e| CircupError::IoError {
                message: e.to_string(),
            })?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let target = join(device_dir, &relative);

        if entry.file_type().is_dir() {
            backend.mkdir(&target)?;
        } else if entry.file_type().is_file() {
            let bytes = std::fs::read(entry.path()).map_err(|e| CircupError::FileReadFailed {
                path: entry.path().display().to_string(),
                reason: e.to_string(),
            })?;
            tracing::debug!("Writing {} to {}", entry.path().display(), target);
            backend.write(&target, &bytes)?;
        }
    }

    Ok(())
}

/// Copy a local file or directory into a device directory
pub fn copy_local_artifact(backend: &dyn ModuleBackend, local: &Path, device_dir: &str) -> Result<()> {
    if local.is_dir() {
        let name = local_file_name(local)?;
        copy_local_tree(backend, local, &join(device_dir, &name))
    } else {
        copy_local_file(backend, local, device_dir)
    }
}

/// Delete a module artifact from the device
pub fn remove_artifact(backend: &dyn ModuleBackend, path: &str, ignore_missing: bool) -> Result<()> {
    tracing::info!("Removing {} from {}", path, backend.location());
    match backend.delete(path) {
        Err(CircupError::NotFound { .. }) if ignore_missing => Ok(()),
        other => other,
    }
}

fn local_file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CircupError::IoError {
            message: format!("No file name in {}", path.display()),
        })
}
