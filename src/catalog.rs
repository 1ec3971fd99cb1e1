//! Module catalogs
//!
//! A catalog maps module names to what lives under one library directory,
//! either on the device or in a downloaded bundle. Entries are built from
//! directory listings only; the version and compatibility of a module are
//! decoded the first time they are asked for.

use std::collections::BTreeMap;

use crate::backend::{self, DiskBackend, ModuleBackend};
use crate::bundle::Bundle;
use crate::error::{CircupError, Result};
use crate::metadata::{
    self, ArtifactKind, ArtifactMetadata, ArtifactVersion, LazyMetadata, module_stem,
};

/// One module found under a catalog root
pub struct CatalogEntry<'a> {
    pub name: String,
    /// Artifacts of a package, sorted with `__init__` files first
    pub artifacts: Vec<String>,
    /// Bundle the module came from, for bundle catalogs
    pub bundle: Option<&'a Bundle>,
    lazy: LazyMetadata,
    backend: &'a dyn ModuleBackend,
}

impl<'a> CatalogEntry<'a> {
    /// Backend-relative path of the file or package directory
    pub fn location(&self) -> &str {
        &self.lazy.location
    }

    pub fn is_package(&self) -> bool {
        self.lazy.is_package
    }

    pub fn is_bytecode(&self) -> bool {
        self.lazy.is_bytecode
    }

    /// File or directory name of the artifact
    pub fn artifact_name(&self) -> &str {
        backend::file_name(self.location())
    }

    /// Decoded metadata, read from the backend on first access
    pub fn metadata(&self) -> Result<&ArtifactMetadata> {
        self.lazy.get_or_try_load(|| self.decode())
    }

    /// The version shown to users, `None` when the module declares none
    pub fn version(&self) -> Result<Option<&str>> {
        Ok(self.metadata()?.version.as_ref().map(ArtifactVersion::as_str))
    }

    fn decode(&self) -> Result<ArtifactMetadata> {
        if !self.is_package() {
            let mut metadata = self.extract(self.location())?;
            metadata.source_path = self.location().to_string();
            return Ok(metadata);
        }

        let mut found: Option<ArtifactMetadata> = None;
        for artifact in &self.artifacts {
            let metadata = self.extract(artifact)?;
            if metadata.is_bad_format() {
                tracing::warn!("{}: bad format in {}", self.name, artifact);
                found = Some(metadata);
                break;
            }
            if found.is_none() && metadata.has_version() {
                found = Some(metadata);
            }
        }

        let mut metadata =
            found.unwrap_or_else(|| ArtifactMetadata::empty(self.location(), self.is_bytecode()));
        metadata.source_path = self.location().to_string();
        metadata.is_bytecode = self.is_bytecode();
        Ok(metadata)
    }

    fn extract(&self, path: &str) -> Result<ArtifactMetadata> {
        let staged = self.backend.stage(path)?;
        Ok(metadata::extract_file(staged.path()))
    }
}

impl std::fmt::Debug for CatalogEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("name", &self.name)
            .field("metadata", &self.lazy)
            .field("bundle", &self.bundle.map(Bundle::key))
            .finish_non_exhaustive()
    }
}

/// A bundle together with a backend over its source library tree
pub struct BundleLibrary<'a> {
    pub bundle: &'a Bundle,
    pub backend: DiskBackend,
}

impl<'a> BundleLibrary<'a> {
    pub fn new(bundle: &'a Bundle) -> Self {
        Self {
            bundle,
            backend: DiskBackend::new(bundle.source_lib_dir()),
        }
    }

    pub fn for_all(bundles: &'a [Bundle]) -> Vec<Self> {
        bundles.iter().map(Self::new).collect()
    }
}

#[derive(Default)]
pub struct ModuleCatalog<'a> {
    entries: BTreeMap<String, CatalogEntry<'a>>,
}

impl<'a> ModuleCatalog<'a> {
    /// Catalog the modules directly below `root`
    ///
    /// A missing root gives an empty catalog.
    pub fn build(backend: &'a dyn ModuleBackend, root: &str) -> Result<Self> {
        Self::build_from(backend, root, None)
    }

    /// Catalog the device library directory
    pub fn for_device(backend: &'a dyn ModuleBackend) -> Result<Self> {
        Self::build(backend, backend.library_dir())
    }

    /// Merge the catalogs of several bundles, the first bundle providing a name wins
    pub fn from_bundles(libraries: &'a [BundleLibrary<'a>]) -> Result<Self> {
        let mut catalog = Self::default();
        for library in libraries {
            let other = Self::build_from(&library.backend, "", Some(library.bundle))?;
            catalog.merge(other);
        }
        Ok(catalog)
    }

    fn build_from(
        backend: &'a dyn ModuleBackend,
        root: &str,
        bundle: Option<&'a Bundle>,
    ) -> Result<Self> {
        let listing = match backend.enumerate(root) {
            Ok(listing) => listing,
            Err(CircupError::NotFound { .. }) => {
                tracing::debug!("{} has no {}", backend.location(), root);
                return Ok(Self::default());
            }
            Err(e) => return Err(e),
        };

        let visible: Vec<_> = listing
            .into_iter()
            .filter(|entry| !entry.name.starts_with('.'))
            .collect();

        let mut entries = BTreeMap::new();
        let mut add = |name: String, lazy: LazyMetadata, artifacts: Vec<String>| {
            entries.insert(
                name.clone(),
                CatalogEntry {
                    name,
                    artifacts,
                    bundle,
                    lazy,
                    backend,
                },
            );
        };

        // Compiled files shadow source files of the same name, packages shadow both.
        for kind in [ArtifactKind::Source, ArtifactKind::Bytecode] {
            for entry in visible.iter().filter(|e| !e.is_dir) {
                if ArtifactKind::from_file_name(&entry.name) != Some(kind) {
                    continue;
                }
                let location = backend::join(root, &entry.name);
                let lazy = LazyMetadata::new(location, false, kind == ArtifactKind::Bytecode);
                add(module_stem(&entry.name).to_string(), lazy, Vec::new());
            }
        }

        for entry in visible.iter().filter(|e| e.is_dir) {
            let location = backend::join(root, &entry.name);
            let artifacts = package_artifacts(backend, &location)?;
            let is_bytecode = artifacts
                .iter()
                .any(|a| ArtifactKind::from_file_name(a) == Some(ArtifactKind::Bytecode));
            let lazy = LazyMetadata::new(location, true, is_bytecode);
            add(entry.name.clone(), lazy, artifacts);
        }

        tracing::debug!("Found {} modules in {}", entries.len(), backend.location());
        Ok(Self { entries })
    }

    /// Add the entries of `other` whose names are not present yet
    pub fn merge(&mut self, other: ModuleCatalog<'a>) {
        for (name, entry) in other.entries {
            self.entries.entry(name).or_insert(entry);
        }
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry<'a>> {
        self.entries.get(name)
    }

    /// Look a name up ignoring case
    pub fn find(&self, name: &str) -> Option<&CatalogEntry<'a>> {
        self.get(name).or_else(|| {
            self.entries
                .values()
                .find(|entry| entry.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry<'a>> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name to displayed version of every module
    pub fn versions(&self) -> Result<BTreeMap<String, Option<String>>> {
        self.iter()
            .map(|entry| Ok((entry.name.clone(), entry.version()?.map(str::to_string))))
            .collect()
    }
}

/// Every module artifact below a package directory
fn package_artifacts(backend: &dyn ModuleBackend, dir: &str) -> Result<Vec<String>> {
    let mut artifacts = Vec::new();
    let mut pending = vec![dir.to_string()];

    while let Some(current) = pending.pop() {
        for entry in backend.enumerate(&current)? {
            if entry.name.starts_with('.') {
                continue;
            }
            let path = backend::join(&current, &entry.name);
            if entry.is_dir {
                pending.push(path);
            } else if ArtifactKind::from_file_name(&entry.name).is_some() {
                artifacts.push(path);
            }
        }
    }

    artifacts.sort_by(|a, b| {
        let a_rest = module_stem(backend::file_name(a)) != "__init__";
        let b_rest = module_stem(backend::file_name(b)) != "__init__";
        a_rest.cmp(&b_rest).then_with(|| a.cmp(b))
    });
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &std::path::Path, path: &str, content: &[u8]) {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }

    fn v6_mpy(version: &str) -> Vec<u8> {
        let mut bytes = b"C\x06\x00\x1f\x0b__version__\x0a".to_vec();
        bytes.extend_from_slice(version.as_bytes());
        bytes.push(0);
        bytes
    }

    #[test]
    fn test_single_files_and_packages() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lib/simpleio.py", b"__version__ = \"3.0.0\"\n");
        write(temp.path(), "lib/neopixel.mpy", &v6_mpy("6.3.11"));
        write(
            temp.path(),
            "lib/adafruit_display_text/__init__.py",
            b"__version__ = \"3.2.0\"\n",
        );
        write(
            temp.path(),
            "lib/adafruit_display_text/label.py",
            b"__version__ = \"9.9.9\"\n",
        );
        write(temp.path(), "lib/README.txt", b"not a module");
        write(temp.path(), "lib/.hidden.py", b"__version__ = \"1.0.0\"\n");
        write(temp.path(), "lib/.Trashes/x.py", b"");

        let backend = DiskBackend::new(temp.path());
        let catalog = ModuleCatalog::for_device(&backend).unwrap();

        let names: Vec<&str> = catalog.names().collect();
        assert_eq!(names, vec!["adafruit_display_text", "neopixel", "simpleio"]);

        let neopixel = catalog.get("neopixel").unwrap();
        assert!(neopixel.is_bytecode());
        assert!(!neopixel.is_package());
        assert_eq!(neopixel.location(), "lib/neopixel.mpy");
        assert_eq!(neopixel.version().unwrap(), Some("6.3.11"));

        let text = catalog.get("adafruit_display_text").unwrap();
        assert!(text.is_package());
        assert!(!text.is_bytecode());
        assert_eq!(
            text.artifacts,
            vec![
                "lib/adafruit_display_text/__init__.py",
                "lib/adafruit_display_text/label.py"
            ]
        );
        // the first versioned artifact wins
        assert_eq!(text.version().unwrap(), Some("3.2.0"));
        assert_eq!(text.metadata().unwrap().source_path, "lib/adafruit_display_text");
    }

    #[test]
    fn test_metadata_is_not_read_until_asked() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lib/simpleio.py", b"__version__ = \"3.0.0\"\n");

        let backend = DiskBackend::new(temp.path());
        let catalog = ModuleCatalog::for_device(&backend).unwrap();
        let entry = catalog.get("simpleio").unwrap();
        assert!(!entry.lazy.is_loaded());

        // removing the file after listing only shows up once decoding happens
        fs::remove_file(temp.path().join("lib/simpleio.py")).unwrap();
        assert!(matches!(entry.metadata(), Err(CircupError::NotFound { .. })));
    }

    #[test]
    fn test_bad_format_sibling_poisons_package() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lib/pkg/__init__.mpy", &v6_mpy("1.0.0"));
        write(temp.path(), "lib/pkg/broken.mpy", b"XX garbage");
        write(temp.path(), "lib/pkg/later.mpy", &v6_mpy("2.0.0"));

        let backend = DiskBackend::new(temp.path());
        let catalog = ModuleCatalog::for_device(&backend).unwrap();
        let entry = catalog.get("pkg").unwrap();

        assert!(entry.is_bytecode());
        assert!(entry.metadata().unwrap().is_bad_format());
        assert_eq!(entry.version().unwrap(), Some("Invalid"));
    }

    #[test]
    fn test_unversioned_package() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lib/pkg/__init__.mpy", b"C\x06\x00\x1fno version");
        write(temp.path(), "lib/pkg/sub/helper.mpy", b"C\x06\x00\x1fnone");

        let backend = DiskBackend::new(temp.path());
        let catalog = ModuleCatalog::for_device(&backend).unwrap();
        let entry = catalog.get("pkg").unwrap();

        assert_eq!(entry.artifacts.len(), 2);
        let metadata = entry.metadata().unwrap();
        assert!(metadata.version.is_none());
        assert!(metadata.is_bytecode);
    }

    #[test]
    fn test_compiled_file_shadows_source() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lib/foo.py", b"__version__ = \"1.0.0\"\n");
        write(temp.path(), "lib/foo.mpy", &v6_mpy("2.0.0"));

        let backend = DiskBackend::new(temp.path());
        let catalog = ModuleCatalog::for_device(&backend).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("foo").unwrap().is_bytecode());
    }

    #[test]
    fn test_missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        let backend = DiskBackend::new(temp.path());
        let catalog = ModuleCatalog::for_device(&backend).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_find_ignores_case() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lib/Adafruit_Thing.py", b"");

        let backend = DiskBackend::new(temp.path());
        let catalog = ModuleCatalog::for_device(&backend).unwrap();
        assert!(catalog.get("adafruit_thing").is_none());
        assert_eq!(
            catalog.find("adafruit_thing").map(|e| e.name.as_str()),
            Some("Adafruit_Thing")
        );
    }

    #[test]
    fn test_merge_keeps_first() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write(first.path(), "foo.py", b"__version__ = \"1.0.0\"\n");
        write(second.path(), "foo.py", b"__version__ = \"2.0.0\"\n");
        write(second.path(), "bar.py", b"__version__ = \"3.0.0\"\n");

        let a = DiskBackend::new(first.path());
        let b = DiskBackend::new(second.path());
        let mut catalog = ModuleCatalog::build(&a, "").unwrap();
        catalog.merge(ModuleCatalog::build(&b, "").unwrap());

        let versions = catalog.versions().unwrap();
        assert_eq!(versions.get("foo").cloned().flatten().as_deref(), Some("1.0.0"));
        assert_eq!(versions.get("bar").cloned().flatten().as_deref(), Some("3.0.0"));
    }
}
