//! Module metadata extraction
//!
//! Reads the `__version__` and `__repo__` style metadata out of a single module
//! artifact, either Python source text or a compiled `.mpy` container.
//!
//! Extraction never fails. Anything odd about an artifact is carried in the
//! returned [`ArtifactMetadata`]:
//!
//! - no version present: `version` is `None`
//! - compiled container that could not be decoded: `version` is
//!   [`ArtifactVersion::BadFormat`]

pub mod bytecode;
pub mod lazy;
pub mod source;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

pub use lazy::LazyMetadata;

/// Version string used when displaying a bytecode file that could not be decoded
pub const BAD_FILE_FORMAT: &str = "Invalid";

/// Extension of Python source modules
pub const SOURCE_EXTENSION: &str = "py";

/// Extension of compiled bytecode modules
pub const BYTECODE_EXTENSION: &str = "mpy";

/// The kind of a module artifact, decided by its file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Source,
    Bytecode,
}

impl ArtifactKind {
    /// Classify a file name, `None` for anything that is not a module artifact
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?;
        match ext {
            SOURCE_EXTENSION => Some(Self::Source),
            BYTECODE_EXTENSION => Some(Self::Bytecode),
            _ => None,
        }
    }
}

/// Strip a module artifact extension from a file name
pub fn module_stem(file_name: &str) -> &str {
    file_name
        .strip_suffix(".py")
        .or_else(|| file_name.strip_suffix(".mpy"))
        .unwrap_or(file_name)
}

/// A version found in an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactVersion {
    /// The version the artifact declares
    Declared(String),
    /// The artifact is a compiled container in an unknown or corrupt format
    BadFormat,
}

impl ArtifactVersion {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Declared(v) => v,
            Self::BadFormat => BAD_FILE_FORMAT,
        }
    }

    pub fn is_bad_format(&self) -> bool {
        matches!(self, Self::BadFormat)
    }
}

impl fmt::Display for ArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CircuitPython versions a compiled artifact can run on: `[min, max)`
///
/// A missing bound means no limit on that side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compatibility {
    pub min: Option<String>,
    pub max: Option<String>,
}

impl Compatibility {
    pub fn new(min: Option<&str>, max: Option<&str>) -> Self {
        Self {
            min: min.map(str::to_string),
            max: max.map(str::to_string),
        }
    }
}

/// Metadata extracted from one module artifact
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactMetadata {
    pub is_bytecode: bool,
    pub version: Option<ArtifactVersion>,
    pub repo: Option<String>,
    pub compatibility: Compatibility,
    pub source_path: String,
    /// Other dunder assignments found in source text, e.g. `__author__`
    pub extra: BTreeMap<String, String>,
}

impl ArtifactMetadata {
    /// An empty record for an artifact of the given kind
    pub fn empty(source_path: impl Into<String>, is_bytecode: bool) -> Self {
        Self {
            is_bytecode,
            source_path: source_path.into(),
            ..Self::default()
        }
    }

    pub fn has_version(&self) -> bool {
        self.version.is_some()
    }

    pub fn is_bad_format(&self) -> bool {
        self.version
            .as_ref()
            .is_some_and(ArtifactVersion::is_bad_format)
    }

    /// The declared version, `None` when absent or bad format
    pub fn declared_version(&self) -> Option<&str> {
        match &self.version {
            Some(ArtifactVersion::Declared(v)) => Some(v),
            _ => None,
        }
    }
}

/// Extract metadata from a file on the local filesystem
pub fn extract_file(path: &Path) -> ArtifactMetadata {
    let shown = path.display().to_string();
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let Some(kind) = ArtifactKind::from_file_name(name) else {
        return ArtifactMetadata::empty(shown, false);
    };
    match std::fs::read(path) {
        Ok(bytes) => extract_kind(kind, &shown, &bytes),
        Err(e) => {
            tracing::warn!("Unable to read {}: {}", shown, e);
            ArtifactMetadata::empty(shown, kind == ArtifactKind::Bytecode)
        }
    }
}

fn extract_kind(kind: ArtifactKind, source_path: &str, bytes: &[u8]) -> ArtifactMetadata {
    tracing::debug!("Extracting metadata from {}", source_path);
    let metadata = match kind {
        ArtifactKind::Source => source::extract(source_path, bytes),
        ArtifactKind::Bytecode => bytecode::extract(source_path, bytes),
    };
    if metadata.has_version() || metadata.repo.is_some() {
        tracing::debug!(
            "Extracted metadata: version={:?} repo={:?}",
            metadata.version,
            metadata.repo
        );
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_artifact_kind_from_file_name() {
        assert_eq!(
            ArtifactKind::from_file_name("neopixel.py"),
            Some(ArtifactKind::Source)
        );
        assert_eq!(
            ArtifactKind::from_file_name("neopixel.mpy"),
            Some(ArtifactKind::Bytecode)
        );
        assert_eq!(ArtifactKind::from_file_name("README.txt"), None);
        assert_eq!(ArtifactKind::from_file_name("py"), None);
    }

    #[test]
    fn test_module_stem() {
        assert_eq!(module_stem("adafruit_bus_device.py"), "adafruit_bus_device");
        assert_eq!(module_stem("neopixel.mpy"), "neopixel");
        assert_eq!(module_stem("adafruit_hid"), "adafruit_hid");
    }

    #[test]
    fn test_bad_format_display() {
        assert_eq!(ArtifactVersion::BadFormat.to_string(), "Invalid");
        assert_eq!(
            ArtifactVersion::Declared("1.0.0".to_string()).to_string(),
            "1.0.0"
        );
    }

    #[test]
    fn test_extract_file_source() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("local_module.py");
        std::fs::write(
            &path,
            "__version__ = \"1.2.3\"\n__repo__ = \"https://github.com/adafruit/SomeLibrary.git\"\n",
        )
        .unwrap();

        let metadata = extract_file(&path);
        assert!(!metadata.is_bytecode);
        assert_eq!(metadata.declared_version(), Some("1.2.3"));
        assert_eq!(
            metadata.repo.as_deref(),
            Some("https://github.com/adafruit/SomeLibrary.git")
        );
        assert!(metadata.extra.is_empty());
    }

    #[test]
    fn test_extract_file_missing_is_empty() {
        let temp = TempDir::new().unwrap();
        let metadata = extract_file(&temp.path().join("gone.mpy"));
        assert!(metadata.is_bytecode);
        assert!(metadata.version.is_none());
    }

    #[test]
    fn test_extract_file_unknown_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        std::fs::write(&path, "__version__ = \"1.0.0\"").unwrap();
        let metadata = extract_file(&path);
        assert!(metadata.version.is_none());
        assert!(!metadata.is_bytecode);
    }
}
