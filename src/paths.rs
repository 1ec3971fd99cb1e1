//! Locations of the files circup keeps on the host
//!
//! Everything lives below one data directory: downloaded bundles, the tag
//! cache, the bundle list overrides and the log file.

use std::path::{Path, PathBuf};

use crate::error::{CircupError, Result};

/// Default data directory name under the user's data directory
const DATA_DIR: &str = "circup";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "CIRCUP_DATA_DIR";

/// Environment variable overriding the log directory
pub const LOG_DIR_ENV: &str = "CIRCUP_LOG_DIR";

/// Tag of the bundle release currently downloaded, per bundle key
pub const TAGS_FILE: &str = "circup.json";

/// Replaces the built-in bundle list when present
pub const BUNDLE_CONFIG_OVERWRITE: &str = "bundle_config.json";

/// Bundles added with `bundle-add`
pub const BUNDLE_CONFIG_LOCAL: &str = "bundle_config_local.json";

pub const LOG_FILE: &str = "circup.log";

/// Get the data directory path
///
/// Uses the platform's data location with a `circup` subdirectory. Can be
/// overridden with the `CIRCUP_DATA_DIR` environment variable.
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    let base = dirs::data_dir().ok_or(CircupError::DataDirUnavailable)?;
    Ok(base.join(DATA_DIR))
}

/// Get the log directory path, `logs` below the data directory by default
pub fn log_dir(data_dir: &Path) -> PathBuf {
    match std::env::var(LOG_DIR_ENV) {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => data_dir.join("logs"),
    }
}

pub fn tags_file(data_dir: &Path) -> PathBuf {
    data_dir.join(TAGS_FILE)
}

pub fn bundle_config_overwrite(data_dir: &Path) -> PathBuf {
    data_dir.join(BUNDLE_CONFIG_OVERWRITE)
}

pub fn bundle_config_local(data_dir: &Path) -> PathBuf {
    data_dir.join(BUNDLE_CONFIG_LOCAL)
}
