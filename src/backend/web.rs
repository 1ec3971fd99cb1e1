//! Backend for a device reached over the CircuitPython web workflow
//!
//! The device serves its filesystem under `/fs/` and a version document at
//! `/cp/version.json`. Every filesystem request carries HTTP basic auth with
//! an empty user name and the workflow password.

use std::io::Write;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;

use super::{DeviceIdentity, DirEntry, ModuleBackend, StagedArtifact};
use crate::error::{CircupError, Result, redact_url};

/// Filesystem prefix on the device
const FS_PATH: &str = "fs/";

const VERSION_PATH: &str = "cp/version.json";

/// Oldest web API version with the JSON directory listing
const MIN_WEB_API_VERSION: u32 = 4;

pub const DEFAULT_PORT: u16 = 80;

/// Shared name answered by whichever web workflow device responds first
pub const SHARED_HOSTNAME: &str = "circuitpython.local";

#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    files: Vec<ListingFile>,
    free: Option<u64>,
    block_size: Option<u64>,
    writable: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ListingFile {
    name: String,
    #[serde(default)]
    directory: bool,
    #[serde(default)]
    file_size: u64,
    modified_ns: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    version: Option<String>,
    board_id: Option<String>,
    web_api_version: Option<u32>,
    hostname: Option<String>,
}

pub struct WebBackend {
    base_url: String,
    password: String,
    client: Client,
}

impl std::fmt::Debug for WebBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl WebBackend {
    pub fn new(host: &str, port: u16, password: Option<&str>, timeout: Duration) -> Result<Self> {
        let password = password.ok_or(CircupError::MissingPassword)?;
        if host.is_empty() || host.contains("://") {
            return Err(CircupError::InvalidHost {
                host: host.to_string(),
            });
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("circup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CircupError::Transport {
                url: host.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            base_url: format!("http://{host}:{port}/"),
            password: password.to_string(),
            client,
        })
    }

    fn fs_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, FS_PATH, path.trim_start_matches('/'))
    }

    fn dir_url(&self, path: &str) -> String {
        let url = self.fs_url(path);
        if url.ends_with('/') { url } else { url + "/" }
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth("", Some(&self.password))
    }

    /// Map non-success statuses onto typed errors
    fn check(&self, response: Response, path: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        match status {
            StatusCode::NOT_FOUND => Err(CircupError::NotFound {
                path: path.to_string(),
            }),
            StatusCode::CONFLICT => Err(CircupError::ReadOnlyDevice {
                location: self.location(),
            }),
            _ => Err(CircupError::Transport {
                url: redact_url(response.url().as_str()),
                reason: format!("HTTP {status}"),
            }),
        }
    }

    fn listing(&self, path: &str) -> Result<Listing> {
        let url = self.dir_url(path);
        tracing::debug!("Listing {}", url);
        let response = self
            .authed(self.client.get(&url))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()?;
        let response = self.check(response, path)?;
        Ok(response.json()?)
    }

    /// The device's own mDNS name, e.g. `cpy-1a2b3c.local`
    pub fn hostname(&self) -> Result<Option<String>> {
        Ok(self
            .version_info()?
            .hostname
            .map(|name| format!("{name}.local")))
    }

    fn version_info(&self) -> Result<VersionInfo> {
        let url = format!("{}{}", self.base_url, VERSION_PATH);
        let response = self.authed(self.client.get(&url)).send()?;
        let response = self.check(response, VERSION_PATH)?;
        Ok(response.json()?)
    }
}

impl ModuleBackend for WebBackend {
    fn location(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }

    fn enumerate(&self, path: &str) -> Result<Vec<DirEntry>> {
        let mut entries: Vec<DirEntry> = self
            .listing(path)?
            .files
            .into_iter()
            .map(|f| DirEntry {
                name: f.name,
                is_dir: f.directory,
                size: f.file_size,
                mtime: f.modified_ns,
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.fs_url(path);
        tracing::debug!("Fetching {}", url);
        let response = self.authed(self.client.get(&url)).send()?;
        let response = self.check(response, path)?;
        Ok(response.bytes()?.to_vec())
    }

    fn stage(&self, path: &str) -> Result<StagedArtifact> {
        let bytes = self.read(path)?;
        let name = super::file_name(path);
        let (stem, ext) = match name.rfind('.') {
            Some(idx) => (&name[..idx], &name[idx..]),
            None => (name, ""),
        };
        let mut file = tempfile::Builder::new()
            .prefix(&format!("{stem}-"))
            .suffix(ext)
            .tempfile()?;
        file.write_all(&bytes)?;
        file.flush()?;
        Ok(StagedArtifact::Temporary(file))
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let url = self.fs_url(path);
        tracing::debug!("Uploading {} bytes to {}", bytes.len(), url);
        let response = self
            .authed(self.client.put(&url))
            .body(bytes.to_vec())
            .send()?;
        self.check(response, path).map(|_| ())
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        let url = self.dir_url(path);
        let response = self.authed(self.client.put(&url)).send()?;
        self.check(response, path).map(|_| ())
    }

    fn delete(&self, path: &str) -> Result<()> {
        let trimmed = path.trim_end_matches('/');
        let name = super::file_name(trimmed);
        let parent = trimmed.strip_suffix(name).unwrap_or_default();
        let is_dir = self
            .enumerate(parent)?
            .into_iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.is_dir)
            .ok_or_else(|| CircupError::NotFound {
                path: path.to_string(),
            })?;

        let url = if is_dir {
            self.dir_url(trimmed)
        } else {
            self.fs_url(trimmed)
        };
        let response = self.authed(self.client.delete(&url)).send()?;
        self.check(response, path).map(|_| ())
    }

    fn exists(&self, path: &str) -> Result<bool> {
        let url = self.fs_url(path);
        let response = self.authed(self.client.get(&url)).send()?;
        match self.check(response, path) {
            Ok(_) => Ok(true),
            Err(CircupError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn identity(&self) -> Result<DeviceIdentity> {
        let info = self
            .version_info()
            .map_err(|e| CircupError::VersionLookupFailed {
                reason: format!("{}: {}", self.location(), e),
            })?;
        let firmware_version = info.version.ok_or_else(|| CircupError::VersionLookupFailed {
            reason: format!("{} did not report a version", self.location()),
        })?;
        Ok(DeviceIdentity {
            firmware_version,
            board_id: info.board_id.unwrap_or_default(),
        })
    }

    fn free_space(&self) -> Result<u64> {
        let listing = self.listing("")?;
        if listing.writable != Some(true) {
            return Err(CircupError::ReadOnlyDevice {
                location: self.location(),
            });
        }
        match (listing.free, listing.block_size) {
            (Some(free), Some(block_size)) => {
                free.checked_mul(block_size)
                    .ok_or_else(|| CircupError::Transport {
                        url: self.fs_url(""),
                        reason: format!("Free space out of range: {free} blocks of {block_size} bytes"),
                    })
            }
            _ => Err(CircupError::Transport {
                url: self.fs_url(""),
                reason: "Unable to get free block count from device".to_string(),
            }),
        }
    }

    fn is_present(&self) -> bool {
        match self.version_info() {
            Ok(VersionInfo {
                web_api_version: Some(api),
                ..
            }) if api >= MIN_WEB_API_VERSION => true,
            Ok(VersionInfo {
                web_api_version: Some(api),
                ..
            }) => {
                tracing::error!(
                    "Device running unsupported web API version {} < {}",
                    api,
                    MIN_WEB_API_VERSION
                );
                false
            }
            Ok(_) => {
                tracing::error!("Unable to get web API version from device");
                false
            }
            Err(e) => {
                tracing::debug!("Device at {} not reachable: {}", self.location(), e);
                false
            }
        }
    }
}
