//! Backend for a device mounted as a local filesystem

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use super::{BOOT_OUT_FILE, DeviceIdentity, DirEntry, ModuleBackend, StagedArtifact};
use crate::error::{CircupError, Result};

#[derive(Debug, Clone)]
pub struct DiskBackend {
    root: PathBuf,
}

impl DiskBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path of a device-relative path
    pub fn local_path(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }

    fn write_error(&self, path: &Path, err: std::io::Error) -> CircupError {
        match err.kind() {
            ErrorKind::ReadOnlyFilesystem | ErrorKind::PermissionDenied => {
                CircupError::ReadOnlyDevice {
                    location: self.location(),
                }
            }
            ErrorKind::NotFound => CircupError::NotFound {
                path: path.display().to_string(),
            },
            _ => CircupError::FileWriteFailed {
                path: path.display().to_string(),
                reason: err.to_string(),
            },
        }
    }
}

fn read_error(path: &Path, err: std::io::Error) -> CircupError {
    if err.kind() == ErrorKind::NotFound {
        CircupError::NotFound {
            path: path.display().to_string(),
        }
    } else {
        CircupError::FileReadFailed {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }
}

impl ModuleBackend for DiskBackend {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn enumerate(&self, path: &str) -> Result<Vec<DirEntry>> {
        let dir = self.local_path(path);
        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| read_error(&dir, e))? {
            let entry = entry.map_err(|e| read_error(&dir, e))?;
            let metadata = entry.metadata().map_err(|e| read_error(&entry.path(), e))?;
            let mtime = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .and_then(|d| u64::try_from(d.as_nanos()).ok());
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: metadata.is_dir(),
                size: metadata.len(),
                mtime,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let local = self.local_path(path);
        fs::read(&local).map_err(|e| read_error(&local, e))
    }

    fn stage(&self, path: &str) -> Result<StagedArtifact> {
        let local = self.local_path(path);
        if !local.exists() {
            return Err(CircupError::NotFound {
                path: local.display().to_string(),
            });
        }
        Ok(StagedArtifact::Local(local))
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let local = self.local_path(path);
        fs::write(&local, bytes).map_err(|e| self.write_error(&local, e))
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        let local = self.local_path(path);
        fs::create_dir_all(&local).map_err(|e| self.write_error(&local, e))
    }

    fn delete(&self, path: &str) -> Result<()> {
        let local = self.local_path(path);
        let metadata = fs::symlink_metadata(&local).map_err(|e| read_error(&local, e))?;
        let result = if metadata.is_dir() {
            fs::remove_dir_all(&local)
        } else {
            fs::remove_file(&local)
        };
        result.map_err(|e| self.write_error(&local, e))
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.local_path(path).exists())
    }

    fn identity(&self) -> Result<DeviceIdentity> {
        let path = self.root.join(BOOT_OUT_FILE);
        let content = fs::read_to_string(&path).map_err(|e| CircupError::VersionLookupFailed {
            reason: format!("{}: {}", path.display(), e),
        })?;
        super::parse_boot_out(&content).ok_or_else(|| CircupError::VersionLookupFailed {
            reason: format!("unexpected contents in {}", path.display()),
        })
    }

    fn free_space(&self) -> Result<u64> {
        fs2::available_space(&self.root).map_err(|e| CircupError::IoError {
            message: format!("Unable to read free space of {}: {}", self.root.display(), e),
        })
    }

    fn is_present(&self) -> bool {
        self.root.exists()
    }
}
