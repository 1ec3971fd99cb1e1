//! Installing modules from the bundles or from local paths

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::backend::{self, ModuleBackend};
use crate::catalog::{CatalogEntry, ModuleCatalog};
use crate::error::{CircupError, Result};
use crate::metadata::{BYTECODE_EXTENSION, module_stem};
use crate::session::Session;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Install the `.py` source instead of the compiled module
    pub use_source: bool,
    /// Replace a module that is already on the device
    pub upgrade: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// `local` is the path the module was taken from when not from a bundle
    Installed { name: String, local: Option<PathBuf> },
    AlreadyInstalled { name: String, local: Option<PathBuf> },
}

/// Install one module onto the device
///
/// `name` is either a module name from the bundles or a path to a local file
/// or directory.
pub fn install_module(
    backend: &dyn ModuleBackend,
    session: &Session,
    device: &ModuleCatalog<'_>,
    bundles: &ModuleCatalog<'_>,
    name: &str,
    options: InstallOptions,
) -> Result<InstallOutcome> {
    let local = Path::new(name);
    let from_local = local.exists();
    let (name, source) = if from_local {
        let file_name = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::info!("Installing from local path: {}", local.display());
        (module_stem(&file_name).to_string(), local.to_path_buf())
    } else {
        let entry = bundles
            .find(name)
            .ok_or_else(|| CircupError::ModuleNotFound {
                name: name.to_string(),
            })?;
        (entry.name.clone(), bundle_source(entry, session, options)?)
    };

    if let Some(installed) = device.find(&name) {
        if !options.upgrade {
            let local = from_local.then(|| source.clone());
            return Ok(InstallOutcome::AlreadyInstalled { name, local });
        }
        backend::remove_artifact(backend, installed.location(), true)?;
    }

    let needed = artifact_size(&source);
    let available = backend.free_space()?;
    if available < needed {
        tracing::error!("Aborted installing module {} - not enough free space", name);
        return Err(CircupError::InsufficientSpace {
            name,
            needed,
            available,
        });
    }

    let library_dir = backend.library_dir();
    backend.mkdir(library_dir)?;
    backend::copy_local_artifact(backend, &source, library_dir)?;
    tracing::info!("Installed '{}' from {}", name, source.display());
    let local = from_local.then_some(source);
    Ok(InstallOutcome::Installed { name, local })
}

/// Where a bundle module is copied from, source or compiled
fn bundle_source(entry: &CatalogEntry<'_>, session: &Session, options: InstallOptions) -> Result<PathBuf> {
    let bundle = entry.bundle.ok_or_else(|| CircupError::ModuleNotFound {
        name: entry.name.clone(),
    })?;

    if options.use_source {
        return Ok(bundle.source_lib_dir().join(entry.artifact_name()));
    }

    let artifact = if entry.is_package() {
        entry.artifact_name().to_string()
    } else {
        format!("{}.{}", entry.name, BYTECODE_EXTENSION)
    };
    let path = bundle.lib_dir(session.compiled_platform()?)?.join(artifact);
    if !path.exists() {
        return Err(CircupError::CompiledArtifactMissing {
            name: entry.name.clone(),
        });
    }
    Ok(path)
}

/// Bytes taken by a file, or by every file below a directory
///
/// Symbolic links are not counted.
pub fn artifact_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::error!("Skipping file in space calculation: {}", e);
                None
            }
        })
        .filter(|entry| {
            if entry.path_is_symlink() {
                tracing::warn!(
                    "Skipping symbolic link in space calculation: {}",
                    entry.path().display()
                );
                return false;
            }
            entry.file_type().is_file()
        })
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}
