//! Example command

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::backend::ModuleBackend;
use crate::bundle::download::Downloader;
use crate::bundle::{Bundle, config};
use crate::cli::ExampleArgs;
use crate::error::{CircupError, Result};
use crate::session::Session;

/// Device file a single-file example becomes with `--rename`
pub const CODE_FILE: &str = "code.py";

/// Run example command
pub fn run(backend: &dyn ModuleBackend, session: &Session, args: ExampleArgs) -> Result<()> {
    let bundles = downloaded_bundles(session)?;
    let examples = bundle_examples(&bundles);

    if args.list {
        if args.examples.is_empty() {
            println!("Available example libraries:");
            for library in example_libraries(&examples) {
                println!("{library}");
            }
        } else {
            for name in matching_examples(&examples, &args.examples) {
                println!("{name}");
            }
        }
        return Ok(());
    }

    for name in &args.examples {
        match examples.get(name) {
            Some(source) => copy_example(backend, source, args.rename, args.overwrite)?,
            None => println!(
                "{}",
                console::style(format!(
                    "Error: {name} was not found in any local bundle examples."
                ))
                .red()
            ),
        }
    }
    Ok(())
}

/// The configured bundles, downloading only those never downloaded
fn downloaded_bundles(session: &Session) -> Result<Vec<Bundle>> {
    let bundles = config::bundles(&session.data_dir)?;
    let downloader = Downloader::new(session.timeout, session.offline)?;
    for bundle in &bundles {
        if !bundle.source_lib_dir().is_dir() {
            downloader.ensure_latest(bundle)?;
        }
    }
    Ok(bundles)
}

/// Every example file of the bundles, keyed by `library/.../example`
///
/// Only files below a library directory count; later bundles win on
/// clashing names.
pub fn bundle_examples(bundles: &[Bundle]) -> BTreeMap<String, PathBuf> {
    let mut examples = BTreeMap::new();
    for bundle in bundles {
        let dir = bundle.examples_dir();
        let Ok(entries) = std::fs::read_dir(&dir) else {
            tracing::debug!("No examples in {}", dir.display());
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() || entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            for file in WalkDir::new(&path).sort_by_file_name().into_iter().flatten() {
                if !file.file_type().is_file() {
                    continue;
                }
                if let Ok(relative) = file.path().strip_prefix(&dir) {
                    examples.insert(example_name(relative), file.path().to_path_buf());
                }
            }
        }
    }
    examples
}

/// `adafruit_ssd1306/ssd1306_simpletest.py` → `adafruit_ssd1306/ssd1306_simpletest`
fn example_name(relative: &Path) -> String {
    let name = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    match name.strip_suffix(".py") {
        Some(stem) => stem.to_string(),
        None => name,
    }
}

/// Libraries that ship at least one example
pub fn example_libraries(examples: &BTreeMap<String, PathBuf>) -> BTreeSet<&str> {
    examples
        .keys()
        .filter_map(|name| name.split('/').next())
        .collect()
}

/// Example names starting with any of `prefixes`, sorted
pub fn matching_examples<'a>(
    examples: &'a BTreeMap<String, PathBuf>,
    prefixes: &[String],
) -> Vec<&'a str> {
    examples
        .keys()
        .filter(|name| prefixes.iter().any(|prefix| name.starts_with(prefix.as_str())))
        .map(String::as_str)
        .collect()
}

/// Copy one example file to the root of the device
///
/// An existing file is only replaced with `overwrite`.
pub fn copy_example(
    backend: &dyn ModuleBackend,
    source: &Path,
    rename: bool,
    overwrite: bool,
) -> Result<()> {
    let target = if rename {
        CODE_FILE.to_string()
    } else {
        source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    if !overwrite && backend.exists(&target)? {
        println!(
            "{}",
            console::style(format!(
                "File: {target} already exists. Use --overwrite if you wish to replace it."
            ))
            .red()
        );
        return Ok(());
    }

    println!("{}: {target}", if overwrite { "Overwriting" } else { "Copying" });
    let bytes = std::fs::read(source).map_err(|e| CircupError::FileReadFailed {
        path: source.display().to_string(),
        reason: e.to_string(),
    })?;
    tracing::info!("Copying example {} to {}", source.display(), target);
    backend.write(&target, &bytes)
}
