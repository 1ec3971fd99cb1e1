//! Error types and handling for circup
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! Odd or missing module metadata is never an error: it is carried as data in
//! [`crate::metadata::ArtifactMetadata`]. The variants here cover device and
//! transport failures, configuration problems and user mistakes.

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for circup operations
#[derive(Error, Diagnostic, Debug)]
pub enum CircupError {
    // Device errors
    #[error("Could not find a connected CircuitPython device")]
    #[diagnostic(
        code(circup::device::not_found),
        help(
            "Pass --path with the mounted CIRCUITPY drive, or --host and --password for a web workflow device"
        )
    )]
    DeviceNotFound,

    #[error("Device at {location} is not reachable")]
    #[diagnostic(
        code(circup::device::unreachable),
        help("Check that the device is powered, connected and running CircuitPython with web API version 4 or later")
    )]
    DeviceUnreachable { location: String },

    #[error("Device at {location} is not writable")]
    #[diagnostic(
        code(circup::device::read_only),
        help("Remount the storage as writable on the device side (not from the PC), then try again")
    )]
    ReadOnlyDevice { location: String },

    #[error("--host needs --password")]
    #[diagnostic(
        code(circup::device::missing_password),
        help("Pass --password or set the CIRCUP_WEBWORKFLOW_PASSWORD environment variable")
    )]
    MissingPassword,

    #[error("Invalid host: {host}")]
    #[diagnostic(
        code(circup::device::invalid_host),
        help("Pass the bare hostname or IP address, without 'http://'")
    )]
    InvalidHost { host: String },

    #[error("Unable to read the device version: {reason}")]
    #[diagnostic(code(circup::device::version_lookup_failed))]
    VersionLookupFailed { reason: String },

    #[error("Not enough free space on device to install '{name}' ({needed} > {available} bytes)")]
    #[diagnostic(code(circup::device::insufficient_space))]
    InsufficientSpace {
        name: String,
        needed: u64,
        available: u64,
    },

    // Transport errors
    #[error("Not found: {path}")]
    #[diagnostic(code(circup::transport::not_found))]
    NotFound { path: String },

    #[error("Request to {url} failed: {reason}")]
    #[diagnostic(code(circup::transport::failed))]
    Transport { url: String, reason: String },

    // Module errors
    #[error("Unknown module named '{name}'")]
    #[diagnostic(
        code(circup::module::not_found),
        help("Run 'circup show' to list the modules available in the bundles")
    )]
    ModuleNotFound { name: String },

    #[error("Cannot find compiled version of module '{name}'")]
    #[diagnostic(
        code(circup::module::compiled_missing),
        help("Install the source version with --py")
    )]
    CompiledArtifactMissing { name: String },

    #[error("No bundle platform for CircuitPython {version}")]
    #[diagnostic(
        code(circup::module::unsupported_platform),
        help("Install the source version with --py")
    )]
    UnsupportedPlatform { version: String },

    // Bundle errors
    #[error("Bundle '{name}' not found")]
    #[diagnostic(
        code(circup::bundle::not_found),
        help("Run 'circup bundle-show' to list the configured bundles")
    )]
    BundleNotFound { name: String },

    #[error("Invalid bundle name: {name}")]
    #[diagnostic(
        code(circup::bundle::invalid_name),
        help("Expecting a GitHub URL or a 'user/repository' string")
    )]
    InvalidBundleName { name: String },

    #[error("Failed to download bundle {url}: {reason}")]
    #[diagnostic(code(circup::bundle::download_failed))]
    BundleDownloadFailed { url: String, reason: String },

    // Configuration errors
    #[error("Failed to parse configuration file: {path}")]
    #[diagnostic(code(circup::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Failed to read configuration file: {path}")]
    #[diagnostic(code(circup::config::read_failed))]
    ConfigReadFailed { path: String, reason: String },

    #[error("Could not determine the data directory")]
    #[diagnostic(
        code(circup::config::no_data_dir),
        help("Set CIRCUP_DATA_DIR to a writable directory")
    )]
    DataDirUnavailable,

    // File system errors
    #[error("Failed to read file: {path}")]
    #[diagnostic(code(circup::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}")]
    #[diagnostic(code(circup::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(circup::fs::io_error))]
    IoError { message: String },

    #[error("Operation cancelled")]
    #[diagnostic(code(circup::cancelled))]
    Cancelled,
}

impl From<std::io::Error> for CircupError {
    fn from(err: std::io::Error) -> Self {
        CircupError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CircupError {
    fn from(err: serde_json::Error) -> Self {
        CircupError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for CircupError {
    fn from(err: reqwest::Error) -> Self {
        CircupError::Transport {
            url: err
                .url()
                .map(|u| redact_url(u.as_str()))
                .unwrap_or_default(),
            reason: err.to_string(),
        }
    }
}

impl From<walkdir::Error> for CircupError {
    fn from(err: walkdir::Error) -> Self {
        CircupError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for CircupError {
    fn from(err: zip::result::ZipError) -> Self {
        CircupError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<inquire::InquireError> for CircupError {
    fn from(err: inquire::InquireError) -> Self {
        match err {
            inquire::InquireError::OperationCanceled
            | inquire::InquireError::OperationInterrupted => CircupError::Cancelled,
            other => CircupError::IoError {
                message: other.to_string(),
            },
        }
    }
}

/// Strip any `user:password@` part from a URL before it ends up in a message
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}://{}", scheme, &rest[at + 1..]),
        None => url.to_string(),
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, CircupError>;
