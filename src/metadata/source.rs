//! Metadata from Python source text
//!
//! Matches simple dunder assignments, one per logical line:
//!
//! ```text
//! __version__ = "1.1.4"
//! __repo__ = "https://github.com/adafruit/SomeLibrary.git"
//! __version__: str = "1.1.4"
//! __version__ = (
//!     "1.1.4"
//! )
//! ```
//!
//! The source is never evaluated.

use std::sync::LazyLock;

use regex::Regex;

use super::{ArtifactMetadata, ArtifactVersion};

#[allow(clippy::expect_used)]
static DUNDER_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(__\w+__)(?:[ \t]*:[ \t]*\w+)?[ \t]*=[ \t]*\(?\s*['"]([^'"\n]+)['"]"#)
        .expect("dunder assignment pattern is valid")
});

/// Extract dunder metadata from source bytes
pub fn extract(source_path: &str, bytes: &[u8]) -> ArtifactMetadata {
    let content = String::from_utf8_lossy(bytes);
    let mut metadata = ArtifactMetadata::empty(source_path, false);

    for caps in DUNDER_ASSIGNMENT.captures_iter(&content) {
        let key = &caps[1];
        let value = caps[2].to_string();
        match key {
            "__version__" => metadata.version = Some(ArtifactVersion::Declared(value)),
            "__repo__" => metadata.repo = Some(value),
            _ => {
                metadata.extra.insert(key.to_string(), value);
            }
        }
    }

    metadata
}
