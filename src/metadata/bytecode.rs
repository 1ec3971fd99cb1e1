//! Metadata from compiled `.mpy` containers
//!
//! There is no parser for the compiled format here. The container starts with a
//! two byte magic that identifies the format generation, and the version is
//! found with byte-level heuristics that differ per generation:
//!
//! | Magic     | Firmware            | Strategy                                   |
//! |-----------|---------------------|--------------------------------------------|
//! | `M\x03`   | before 7.0.0        | backtrack from `__version__`, 1 byte prefix |
//! | `C\x05`   | 7.x and 8.x         | backtrack from `__version__`, 2 byte prefix, length stored doubled |
//! | `C\x06`   | 9.0.0 and later     | first NUL terminated `x.y.z` in the file    |
//!
//! In the first two generations small strings in the interned string table are
//! stored as a length byte followed by the string bytes, and the version string
//! sits right before `__version__`. Walking backwards from the literal, the
//! first byte whose value equals the distance walked minus one is taken as the
//! length prefix of the version string.

use std::sync::LazyLock;

use regex::bytes::Regex;

use super::{ArtifactMetadata, ArtifactVersion, Compatibility};

const VERSION_LITERAL: &[u8] = b"__version__";

#[allow(clippy::expect_used)]
static NUL_TERMINATED_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+\.\d+\.\d+)\x00").expect("version pattern is valid")
});

/// Compiled container format generations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpyGeneration {
    /// `M\x03`, CircuitPython before 7
    V3,
    /// `C\x05`, CircuitPython 7 and 8
    V5,
    /// `C\x06`, CircuitPython 9 onwards
    V6,
}

impl MpyGeneration {
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        match bytes.get(..2)? {
            b"M\x03" => Some(Self::V3),
            b"C\x05" => Some(Self::V5),
            b"C\x06" => Some(Self::V6),
            _ => None,
        }
    }

    /// Firmware versions able to load this generation
    pub fn compatibility(self) -> Compatibility {
        match self {
            Self::V3 => Compatibility::new(None, Some("7.0.0-alpha.1")),
            Self::V5 => Compatibility::new(Some("7.0.0-alpha.1"), Some("8.99.99")),
            Self::V6 => Compatibility::new(Some("9.0.0-alpha.1"), None),
        }
    }
}

/// Extract the version and compatibility of a compiled container
pub fn extract(source_path: &str, bytes: &[u8]) -> ArtifactMetadata {
    let mut metadata = ArtifactMetadata::empty(source_path, true);

    let Some(generation) = MpyGeneration::from_magic(bytes) else {
        tracing::warn!("{}: unknown mpy format", source_path);
        metadata.version = Some(ArtifactVersion::BadFormat);
        return metadata;
    };

    metadata.compatibility = generation.compatibility();
    metadata.version = match generation {
        MpyGeneration::V3 => backtrack_version(bytes, 1, 1),
        MpyGeneration::V5 => backtrack_version(bytes, 2, 2),
        MpyGeneration::V6 => first_version_string(bytes),
    };

    if metadata.is_bad_format() {
        tracing::warn!("{}: could not decode __version__", source_path);
    }
    metadata
}

/// Backtrack from the `__version__` literal looking for the length prefix
///
/// `prefix_len` is the number of bytes between the version string and the
/// literal, `scale` the factor the stored length byte is multiplied by.
fn backtrack_version(bytes: &[u8], prefix_len: usize, scale: u8) -> Option<ArtifactVersion> {
    let literal_at = find(bytes, VERSION_LITERAL)?;
    let Some(loc) = literal_at.checked_sub(prefix_len) else {
        return Some(ArtifactVersion::BadFormat);
    };

    let mut offset = 1;
    while offset < loc {
        let val = usize::from(bytes[loc - offset] / scale);
        if val == offset - 1 {
            let start = loc - offset + 1;
            return Some(match std::str::from_utf8(&bytes[start..loc]) {
                Ok(version) => ArtifactVersion::Declared(version.to_string()),
                Err(_) => ArtifactVersion::BadFormat,
            });
        }
        offset += 1;
    }

    Some(ArtifactVersion::BadFormat)
}

fn first_version_string(bytes: &[u8]) -> Option<ArtifactVersion> {
    let caps = NUL_TERMINATED_VERSION.captures(bytes)?;
    let version = std::str::from_utf8(&caps[1]).ok()?;
    Some(ArtifactVersion::Declared(version.to_string()))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
