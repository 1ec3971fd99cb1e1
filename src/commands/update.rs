//! Update command

use inquire::Confirm;

use crate::backend::ModuleBackend;
use crate::catalog::{BundleLibrary, ModuleCatalog};
use crate::cli::UpdateArgs;
use crate::error::{CircupError, Result};
use crate::installer::InstallOptions;
use crate::module::{Module, UpdateState, find_modules};
use crate::resolver::DependencyResolver;
use crate::session::Session;

use super::install::{install_all, report_unknown};
use super::name_list;

/// Run update command
pub fn run(backend: &dyn ModuleBackend, session: &Session, args: UpdateArgs) -> Result<()> {
    let bundles = super::load_bundles(session)?;
    let libraries = BundleLibrary::for_all(&bundles);
    let bundle_catalog = ModuleCatalog::from_bundles(&libraries)?;
    let device_catalog = ModuleCatalog::for_device(backend)?;

    let modules = find_modules(&device_catalog, &bundle_catalog)?;
    let outdated: Vec<(&Module<'_>, UpdateState)> = modules
        .iter()
        .map(|module| (module, module.update_state(session)))
        .filter(|(_, state)| state.needs_update())
        .collect();

    if outdated.is_empty() {
        println!("None of the module[s] found on the device need an update.");
        return Ok(());
    }
    println!("Found {} module[s] needing update.", outdated.len());
    if !args.all {
        println!("Please indicate which module[s] you wish to update:\n");
    }

    let mut updated = Vec::new();
    for (module, state) in outdated {
        if !module.has_valid_bundle_version() {
            warn_invalid_version(module);
        }
        if !args.all && !confirm_update(module, state)? {
            continue;
        }
        match module.update(backend, session) {
            Ok(()) => {
                println!("Updated {}", module.name);
                updated.push(module.name.clone());
            }
            Err(e @ CircupError::ReadOnlyDevice { .. }) => return Err(e),
            Err(e) => {
                tracing::error!("Failed to update {}: {:?}", module.name, e);
                println!("Something went wrong, {e} (check the logs)");
            }
        }
    }

    if updated.is_empty() {
        return Ok(());
    }
    install_missing_requirements(backend, session, &bundle_catalog, &updated)
}

/// Install what the updated modules now require but the device lacks
fn install_missing_requirements(
    backend: &dyn ModuleBackend,
    session: &Session,
    bundles: &ModuleCatalog<'_>,
    updated: &[String],
) -> Result<()> {
    println!(
        "Checking {} updated module[s] for missing requirements.",
        updated.len()
    );
    let device = ModuleCatalog::for_device(backend)?;
    let resolution = DependencyResolver::new(bundles).resolve(updated);
    report_unknown(&resolution);

    let missing: Vec<String> = resolution
        .modules
        .into_iter()
        .filter(|name| !device.contains(name))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    println!("Ready to install: {}\n", name_list(&missing));
    install_all(backend, session, &device, bundles, &missing, InstallOptions::default())
}

fn warn_invalid_version(module: &Module<'_>) {
    let mut message = format!(
        "WARNING: Library {} repo has incorrect __version__\n\tmetadata. \
         Circup will assume it needs updating.\n\tPlease file an issue in the library repo.",
        module.name
    );
    if let Some(repo) = &module.repo {
        message.push_str(&format!("\n\t{repo}"));
    }
    println!("{}", console::style(message).yellow());
}

fn confirm_update(module: &Module<'_>, state: UpdateState) -> Result<bool> {
    let question = match state {
        UpdateState::BadFormat => {
            println!(
                "{}",
                console::style(format!(
                    "WARNING: '{}': module corrupted or in an unknown mpy format. Updating is required.",
                    module.name
                ))
                .yellow()
            );
            "Do you want to update?".to_string()
        }
        UpdateState::MpyMismatch => {
            println!(
                "{}",
                console::style(format!(
                    "WARNING: '{}': mpy format doesn't match the device's Circuitpython version. Updating is required.",
                    module.name
                ))
                .yellow()
            );
            "Do you want to update?".to_string()
        }
        UpdateState::MajorUpdate => format!(
            "'{}' is a Major Version update and may contain breaking changes. Do you want to update?",
            module.name
        ),
        UpdateState::MinorUpdate | UpdateState::UpToDate => format!("Update '{}'?", module.name),
    };
    Ok(Confirm::new(&question).with_default(false).prompt()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DiskBackend;
    use crate::test_fixtures::*;

    #[test]
    fn test_updated_module_pulls_in_new_requirement() {
        let device = create_device("9.1.4");
        write_file(device.path(), "lib/adafruit_display_text/__init__.py", &py_source("2.0.0"));
        let backend = DiskBackend::new(device.path());

        let data = create_temp_dir();
        let bundle = create_bundle(data.path());
        let py = bundle.source_lib_dir();
        write_file(&py, "adafruit_display_text/__init__.py", &py_source("3.0.0"));
        write_file(&py, "adafruit_bitmap_font/__init__.py", &py_source("2.1.0"));
        write_file(
            &bundle.requirements_dir("adafruit_display_text"),
            "requirements.txt",
            b"adafruit-circuitpython-bitmap-font\n",
        );
        write_file(&bundle.lib_dir("9mpy").unwrap(), "adafruit_bitmap_font/__init__.mpy", &mpy_v6("2.1.0"));

        let bundles = [bundle];
        let libraries = BundleLibrary::for_all(&bundles);
        let bundle_catalog = ModuleCatalog::from_bundles(&libraries).unwrap();
        let session = Session::new(data.path()).with_device("9.1.4", "raspberry_pi_pico");

        install_missing_requirements(
            &backend,
            &session,
            &bundle_catalog,
            &["adafruit_display_text".to_string()],
        )
        .unwrap();
        assert!(device.path().join("lib/adafruit_bitmap_font/__init__.mpy").exists());
    }
}
