//! Locating the device and choosing its backend

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::backend::web::SHARED_HOSTNAME;
use crate::backend::{DiskBackend, ModuleBackend, WebBackend};
use crate::error::{CircupError, Result};

/// Volume label of a CircuitPython drive
const VOLUME_LABEL: &str = "CIRCUITPY";

const MOUNT_COMMANDS: &[&str] = &["mount", "/sbin/mount"];

/// How to reach the device, from the command line flags
#[derive(Debug, Clone, Default)]
pub struct DeviceOptions {
    pub path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: u16,
    pub password: Option<String>,
    pub timeout: Duration,
}

/// Find the mount point of a connected CIRCUITPY drive
pub fn find_device() -> Option<PathBuf> {
    for command in MOUNT_COMMANDS {
        match Command::new(command).output() {
            Ok(output) => {
                let text = String::from_utf8_lossy(&output.stdout);
                if let Some(path) = mount_point_from_output(&text) {
                    tracing::info!("Found {} mounted at {}", VOLUME_LABEL, path.display());
                    return Some(path);
                }
            }
            Err(e) => tracing::debug!("Unable to run {}: {}", command, e),
        }
    }
    None
}

/// Last mounted volume whose mount point ends with the CIRCUITPY label
///
/// Expects `mount` output lines like
/// `/dev/sdb1 on /media/user/CIRCUITPY type vfat (rw,nosuid)`.
pub fn mount_point_from_output(output: &str) -> Option<PathBuf> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().nth(2))
        .filter(|volume| volume.ends_with(VOLUME_LABEL))
        .last()
        .map(PathBuf::from)
}

/// Open the backend selected by the options
///
/// `--path` wins over `--host`; without either the drive is looked up among
/// the mounted volumes.
pub fn connect(options: &DeviceOptions) -> Result<Box<dyn ModuleBackend>> {
    if let Some(path) = &options.path {
        return Ok(Box::new(DiskBackend::new(path)));
    }

    if let Some(host) = &options.host {
        let password = options.password.as_deref();
        let backend = WebBackend::new(host, options.port, password, options.timeout)?;
        if host != SHARED_HOSTNAME {
            return Ok(Box::new(backend));
        }

        println!("Checking versions.json on {SHARED_HOSTNAME} to find hostname");
        return match backend.hostname() {
            Ok(Some(hostname)) => {
                println!("Using hostname: {hostname}");
                Ok(Box::new(WebBackend::new(
                    &hostname,
                    options.port,
                    password,
                    options.timeout,
                )?))
            }
            Ok(None) => Ok(Box::new(backend)),
            Err(e) => {
                tracing::warn!("Unable to resolve {}: {}", SHARED_HOSTNAME, e);
                Ok(Box::new(backend))
            }
        };
    }

    find_device()
        .map(|path| Box::new(DiskBackend::new(path)) as Box<dyn ModuleBackend>)
        .ok_or(CircupError::DeviceNotFound)
}

/// Whether a path given for `--auto-file` refers to the local machine
pub fn is_local_path(path: &str) -> bool {
    let path = Path::new(path);
    path.is_absolute() || path.starts_with(".") || path.starts_with("..")
}
