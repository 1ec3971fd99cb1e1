//! Uninstall command

use crate::backend::{self, ModuleBackend};
use crate::catalog::ModuleCatalog;
use crate::cli::UninstallArgs;
use crate::error::Result;

/// Run uninstall command
pub fn run(backend: &dyn ModuleBackend, args: UninstallArgs) -> Result<()> {
    println!(
        "Uninstalling {} from {}",
        args.modules.join(", "),
        backend.location()
    );
    let installed = ModuleCatalog::for_device(backend)?;
    for name in &args.modules {
        let name = name.to_lowercase();
        match installed.find(&name) {
            Some(entry) => {
                backend::remove_artifact(backend, entry.location(), entry.is_package())?;
                tracing::info!("Removed {}", entry.location());
                println!("Uninstalled '{name}'.");
            }
            None => println!("Module '{name}' not found on device."),
        }
    }
    Ok(())
}
