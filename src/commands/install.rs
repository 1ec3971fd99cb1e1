//! Install command

use std::path::Path;

use crate::backend::ModuleBackend;
use crate::catalog::{BundleLibrary, ModuleCatalog};
use crate::cli::InstallArgs;
use crate::device::is_local_path;
use crate::error::{CircupError, Result};
use crate::imports::libraries_from_code;
use crate::installer::{InstallOptions, InstallOutcome, install_module};
use crate::resolver::{DependencyResolver, Resolution, libraries_from_requirements};
use crate::session::Session;

use super::{load_bundles, name_list};

/// Scanned by `--auto` when no other file is named
pub const DEFAULT_AUTO_FILE: &str = "code.py";

/// Run install command
pub fn run(backend: &dyn ModuleBackend, session: &Session, args: InstallArgs) -> Result<()> {
    let bundles = load_bundles(session)?;
    let libraries = BundleLibrary::for_all(&bundles);
    let bundle_catalog = ModuleCatalog::from_bundles(&libraries)?;
    let device_catalog = ModuleCatalog::for_device(backend)?;

    let requested = requested_modules(backend, &args, &bundle_catalog)?;
    println!("Searching for dependencies for: {}", name_list(&requested));
    let resolution = DependencyResolver::new(&bundle_catalog).resolve(&requested);
    report_unknown(&resolution);

    let to_install: Vec<String> = resolution.modules.into_iter().collect();
    println!("Ready to install: {}\n", name_list(&to_install));

    let options = InstallOptions {
        use_source: args.py,
        upgrade: args.upgrade,
    };
    install_all(backend, session, &device_catalog, &bundle_catalog, &to_install, options)
}

/// Names asked for on the command line, from a requirements file or from imports
///
/// Sorted, without duplicates.
fn requested_modules(
    backend: &dyn ModuleBackend,
    args: &InstallArgs,
    bundles: &ModuleCatalog<'_>,
) -> Result<Vec<String>> {
    let mut requested = if let Some(path) = &args.requirement {
        libraries_from_requirements(&read_local(path)?)
    } else if args.auto || args.auto_file.is_some() {
        let file = args.auto_file.as_deref().unwrap_or(DEFAULT_AUTO_FILE);
        println!("Auto file: {file}");
        let source = if is_local_path(file) {
            read_local(Path::new(file))?
        } else {
            String::from_utf8_lossy(&backend.read(file)?).into_owned()
        };
        libraries_from_code(&source, bundles)
    } else {
        args.modules.clone()
    };
    requested.sort();
    requested.dedup();
    Ok(requested)
}

fn read_local(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| CircupError::FileReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Warn about requested names no bundle provides
pub(crate) fn report_unknown(resolution: &Resolution) {
    for name in &resolution.unknown {
        println!(
            "{}",
            console::style(format!(
                "WARNING:\n\t{name} is not a known CircuitPython library."
            ))
            .yellow()
        );
    }
}

/// Install every name in order, reporting each result
///
/// Per-module problems are printed and the next module is tried; device
/// failures stop the whole run.
pub(crate) fn install_all(
    backend: &dyn ModuleBackend,
    session: &Session,
    device: &ModuleCatalog<'_>,
    bundles: &ModuleCatalog<'_>,
    names: &[String],
    options: InstallOptions,
) -> Result<()> {
    for name in names {
        match install_module(backend, session, device, bundles, name, options) {
            Ok(InstallOutcome::Installed { name, local }) => {
                report_local(local.as_deref());
                println!("Installed '{name}'.");
            }
            Ok(InstallOutcome::AlreadyInstalled { name, local }) => {
                report_local(local.as_deref());
                println!("'{name}' is already installed.");
            }
            Err(CircupError::ModuleNotFound { name }) => {
                println!("Unknown module named, '{name}'.");
            }
            Err(CircupError::CompiledArtifactMissing { name }) => {
                tracing::warn!("No compiled version of {}", name);
                println!("Cannot find compiled version of module.");
            }
            Err(CircupError::InsufficientSpace { name, .. }) => {
                println!(
                    "{}",
                    console::style(format!(
                        "Aborted installing module {name} - not enough free space"
                    ))
                    .red()
                );
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn report_local(local: Option<&Path>) {
    if let Some(path) = local {
        println!("Installing from local path: {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DiskBackend;
    use crate::test_fixtures::*;
    use std::path::PathBuf;

    fn args(modules: &[&str]) -> InstallArgs {
        InstallArgs {
            modules: modules.iter().map(|m| (*m).to_string()).collect(),
            py: false,
            requirement: None,
            auto: false,
            auto_file: None,
            upgrade: false,
        }
    }

    #[test]
    fn test_requested_modules_sorted_and_unique() {
        let device = create_device("9.1.4");
        let backend = DiskBackend::new(device.path());
        let catalog = ModuleCatalog::default();

        let names = requested_modules(&backend, &args(&["neopixel", "adafruit_hid", "neopixel"]), &catalog)
            .unwrap();
        assert_eq!(names, vec!["adafruit_hid", "neopixel"]);
    }

    #[test]
    fn test_requested_modules_from_requirements() {
        let device = create_device("9.1.4");
        let backend = DiskBackend::new(device.path());
        let temp = create_temp_dir();
        write_file(temp.path(), "requirements.txt", b"neopixel>=6.0\n# comment\nadafruit-circuitpython-hid\n");

        let mut install = args(&["ignored"]);
        install.requirement = Some(temp.path().join("requirements.txt"));
        let names = requested_modules(&backend, &install, &ModuleCatalog::default()).unwrap();
        assert_eq!(names, vec!["adafruit-circuitpython-hid", "neopixel"]);
    }

    #[test]
    fn test_requested_modules_missing_requirements_file() {
        let device = create_device("9.1.4");
        let backend = DiskBackend::new(device.path());
        let mut install = args(&[]);
        install.requirement = Some(PathBuf::from("/nonexistent/requirements.txt"));
        assert!(matches!(
            requested_modules(&backend, &install, &ModuleCatalog::default()),
            Err(CircupError::FileReadFailed { .. })
        ));
    }

    #[test]
    fn test_requested_modules_from_device_code() {
        let device = create_device("9.1.4");
        write_file(device.path(), "code.py", b"import neopixel\nimport time\n");
        let backend = DiskBackend::new(device.path());

        let data = create_temp_dir();
        let bundle = create_bundle(data.path());
        write_file(&bundle.source_lib_dir(), "neopixel.py", &py_source("6.3.11"));
        let bundles = [bundle];
        let libraries = BundleLibrary::for_all(&bundles);
        let catalog = ModuleCatalog::from_bundles(&libraries).unwrap();

        let mut install = args(&[]);
        install.auto = true;
        let names = requested_modules(&backend, &install, &catalog).unwrap();
        assert_eq!(names, vec!["neopixel"]);
    }

    #[test]
    fn test_install_all_reports_and_continues() {
        let device = create_device("9.1.4");
        let backend = DiskBackend::new(device.path());
        let data = create_temp_dir();
        let bundle = create_bundle(data.path());
        write_file(&bundle.source_lib_dir(), "neopixel.py", &py_source("6.3.11"));
        write_file(&bundle.source_lib_dir(), "adafruit_pixelbuf.py", &py_source("2.0.0"));
        write_file(&bundle.lib_dir("9mpy").unwrap(), "neopixel.mpy", &mpy_v6("6.3.11"));

        let bundles = [bundle];
        let libraries = BundleLibrary::for_all(&bundles);
        let catalog = ModuleCatalog::from_bundles(&libraries).unwrap();
        let installed = ModuleCatalog::for_device(&backend).unwrap();
        let session = Session::new(data.path()).with_device("9.1.4", "raspberry_pi_pico");

        let names = vec![
            "adafruit_pixelbuf".to_string(),
            "missing".to_string(),
            "neopixel".to_string(),
        ];
        install_all(&backend, &session, &installed, &catalog, &names, InstallOptions::default())
            .unwrap();

        assert!(device.path().join("lib/neopixel.mpy").exists());
        assert!(!device.path().join("lib/adafruit_pixelbuf.mpy").exists());
    }
}
