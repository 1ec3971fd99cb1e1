//! Deferred module metadata
//!
//! Cheap facts known from a directory listing are stored eagerly; the decoded
//! version, repository and compatibility are only produced on first access,
//! since decoding means reading (and for the web workflow, downloading) every
//! artifact of the module.

use std::cell::OnceCell;
use std::fmt;

use super::ArtifactMetadata;
use crate::error::Result;

pub struct LazyMetadata {
    /// Where the module lives, relative to the catalog's backend
    pub location: String,
    pub is_package: bool,
    pub is_bytecode: bool,
    decoded: OnceCell<ArtifactMetadata>,
}

impl LazyMetadata {
    pub fn new(location: impl Into<String>, is_package: bool, is_bytecode: bool) -> Self {
        Self {
            location: location.into(),
            is_package,
            is_bytecode,
            decoded: OnceCell::new(),
        }
    }

    /// Create with already decoded metadata
    pub fn decoded(metadata: ArtifactMetadata, is_package: bool) -> Self {
        let lazy = Self::new(metadata.source_path.clone(), is_package, metadata.is_bytecode);
        let _ = lazy.decoded.set(metadata);
        lazy
    }

    /// Return the decoded metadata, running `load` the first time
    ///
    /// A failed load leaves the value unset so a later access retries.
    pub fn get_or_try_load<F>(&self, load: F) -> Result<&ArtifactMetadata>
    where
        F: FnOnce() -> Result<ArtifactMetadata>,
    {
        if let Some(metadata) = self.decoded.get() {
            return Ok(metadata);
        }
        let metadata = load()?;
        Ok(self.decoded.get_or_init(|| metadata))
    }

    pub fn is_loaded(&self) -> bool {
        self.decoded.get().is_some()
    }
}

impl fmt::Debug for LazyMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("LazyMetadata");
        s.field("location", &self.location)
            .field("is_package", &self.is_package)
            .field("is_bytecode", &self.is_bytecode);
        match self.decoded.get() {
            Some(metadata) => s.field("decoded", metadata),
            None => s.field("decoded", &"<Not Loaded>"),
        };
        s.finish()
    }
}
