//! Freeze command

use std::path::Path;

use inquire::Confirm;

use crate::backend::ModuleBackend;
use crate::catalog::{BundleLibrary, ModuleCatalog};
use crate::cli::FreezeArgs;
use crate::error::{CircupError, Result};
use crate::metadata::ArtifactVersion;
use crate::module::{Module, find_modules};
use crate::resolver::REQUIREMENTS_FILE;
use crate::session::Session;

use super::load_bundles;

/// Run freeze command
pub fn run(backend: &dyn ModuleBackend, session: &Session, args: FreezeArgs) -> Result<()> {
    let bundles = load_bundles(session)?;
    let libraries = BundleLibrary::for_all(&bundles);
    let bundle_catalog = ModuleCatalog::from_bundles(&libraries)?;
    let device_catalog = ModuleCatalog::for_device(backend)?;

    let lines = requirement_lines(&find_modules(&device_catalog, &bundle_catalog)?);
    if lines.is_empty() {
        println!("No modules found on the device.");
        return Ok(());
    }
    for line in &lines {
        println!("{line}");
    }

    if args.requirement {
        let path = Path::new(REQUIREMENTS_FILE);
        if path.exists() {
            let overwrite = Confirm::new(&format!(
                "{REQUIREMENTS_FILE} file already exists in this location.\nDo you want to overwrite it?"
            ))
            .with_default(false)
            .prompt()?;
            if !overwrite {
                println!("Not overwriting {REQUIREMENTS_FILE}.");
                return Ok(());
            }
        }
        write_requirements(path, &lines)?;
        println!("Wrote {REQUIREMENTS_FILE}");
    }
    Ok(())
}

/// `name==version` per module, just `name` when no version is declared
pub fn requirement_lines(modules: &[Module<'_>]) -> Vec<String> {
    modules
        .iter()
        .map(|module| match &module.device_version {
            Some(ArtifactVersion::Declared(version)) => format!("{}=={}", module.name, version),
            _ => module.name.clone(),
        })
        .collect()
}

fn write_requirements(path: &Path, lines: &[String]) -> Result<()> {
    let mut content = lines.join("\n");
    content.push('\n');
    std::fs::write(path, content).map_err(|e| CircupError::FileWriteFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
