//! Show command

use crate::catalog::{BundleLibrary, ModuleCatalog};
use crate::cli::ShowArgs;
use crate::error::Result;
use crate::session::Session;

use super::load_bundles;

/// Run show command
pub fn run(session: &Session, args: ShowArgs) -> Result<()> {
    let bundles = load_bundles(session)?;
    let libraries = BundleLibrary::for_all(&bundles);
    let catalog = ModuleCatalog::from_bundles(&libraries)?;

    let names = matching_names(catalog.names(), args.pattern.as_deref());
    for name in &names {
        println!("{name}");
    }
    println!("{} shown of {} packages.", names.len(), catalog.len());
    Ok(())
}

/// Sorted names containing `pattern`, ignoring case
fn matching_names<'n>(names: impl Iterator<Item = &'n str>, pattern: Option<&str>) -> Vec<&'n str> {
    let pattern = pattern.map(str::to_lowercase);
    let mut matching: Vec<&str> = names
        .filter(|name| {
            pattern
                .as_deref()
                .is_none_or(|p| name.to_lowercase().contains(p))
        })
        .collect();
    matching.sort_unstable();
    matching
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: [&str; 4] = ["neopixel", "adafruit_display_text", "adafruit_hid", "adafruit_displayio_ssd1306"];

    #[test]
    fn test_all_names_sorted() {
        assert_eq!(
            matching_names(NAMES.into_iter(), None),
            vec!["adafruit_display_text", "adafruit_displayio_ssd1306", "adafruit_hid", "neopixel"]
        );
    }

    #[test]
    fn test_match_ignores_case() {
        assert_eq!(
            matching_names(NAMES.into_iter(), Some("DISPLAY")),
            vec!["adafruit_display_text", "adafruit_displayio_ssd1306"]
        );
        assert!(matching_names(NAMES.into_iter(), Some("nothing")).is_empty());
    }
}
