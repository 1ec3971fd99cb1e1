//! List command

use crate::backend::ModuleBackend;
use crate::catalog::{BundleLibrary, ModuleCatalog};
use crate::error::Result;
use crate::module::find_modules;
use crate::session::Session;

use super::load_bundles;

const HEADER: [&str; 4] = ["Module", "Version", "Latest", "Update Reason"];

const INTRO: &str = "The following modules are out of date or probably need an update.\n\
                     Major Updates may include breaking changes. Review before updating.\n\
                     MPY Format changes from Circuitpython 8 to 9 require an update.\n";

/// Run list command
pub fn run(backend: &dyn ModuleBackend, session: &Session) -> Result<()> {
    let bundles = load_bundles(session)?;
    let libraries = BundleLibrary::for_all(&bundles);
    let bundle_catalog = ModuleCatalog::from_bundles(&libraries)?;
    let device_catalog = ModuleCatalog::for_device(backend)?;

    let rows: Vec<[String; 4]> = find_modules(&device_catalog, &bundle_catalog)?
        .iter()
        .filter(|module| module.update_state(session).needs_update())
        .map(|module| module.row(session))
        .collect();

    if rows.is_empty() {
        println!("All modules found on the device are up to date.");
        return Ok(());
    }
    println!("{INTRO}");
    print!("{}", format_table(&rows));
    Ok(())
}

/// Left-aligned columns, two spaces wider than their longest cell
pub fn format_table(rows: &[[String; 4]]) -> String {
    let header = HEADER.map(str::to_string);
    let mut widths = [0usize; 4];
    for row in std::iter::once(&header).chain(rows) {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count() + 2);
        }
    }
    let dashes = widths.map(|width| "-".repeat(width - 1));

    let mut out = String::new();
    for row in [&header, &dashes].into_iter().chain(rows) {
        let line: String = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
