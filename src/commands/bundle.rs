//! Bundle list commands: bundle-show, bundle-add and bundle-remove

use std::collections::BTreeMap;
use std::path::Path;

use inquire::Confirm;

use crate::bundle::download::Downloader;
use crate::bundle::{Bundle, config};
use crate::catalog::{BundleLibrary, ModuleCatalog};
use crate::cli::{BundleAddArgs, BundleRemoveArgs, BundleShowArgs};
use crate::error::{CircupError, Result};
use crate::session::Session;

/// Run bundle-show command
pub fn show(session: &Session, args: BundleShowArgs) -> Result<()> {
    let local = config::load_local(&session.data_dir);
    let bundles = if args.modules {
        super::load_bundles(session)?
    } else {
        config::bundles(&session.data_dir)?
    };

    for bundle in &bundles {
        let name = if local.values().any(|repo| repo == bundle.key()) {
            console::style(bundle.key()).yellow()
        } else {
            console::style(bundle.key()).green()
        };
        println!("{name}");
        println!("    {}", bundle.url());
        let tag = bundle.current_tag();
        println!(
            "    version = {}",
            if tag.is_empty() { "not downloaded" } else { tag.as_str() }
        );

        if args.modules {
            println!("Modules:");
            let library = BundleLibrary::new(bundle);
            let catalog = ModuleCatalog::from_bundles(std::slice::from_ref(&library))?;
            for (name, version) in catalog.versions()? {
                println!("    {} ({})", name, version.as_deref().unwrap_or("-"));
            }
        }
    }
    Ok(())
}

/// Run bundle-add command
///
/// A repository is only added once GitHub confirms it publishes the release
/// zips circup needs.
pub fn add(session: &Session, args: BundleAddArgs) -> Result<()> {
    let data_dir = &session.data_dir;
    if session.offline {
        println!("Cannot check new bundles while offline, nothing added.");
        return Ok(());
    }
    let downloader = Downloader::new(session.timeout, false)?;
    let mut local = config::load_local(data_dir);
    let mut changed = false;

    for input in &args.bundles {
        let repo = config::normalize_repo(input);
        if is_listed(data_dir, &local, &repo) {
            println!("Bundle already in list.");
            println!("    {repo}");
            continue;
        }

        let bundle = match Bundle::new(&repo, data_dir) {
            Ok(bundle) => bundle,
            Err(CircupError::InvalidBundleName { .. }) => {
                println!(
                    "{}",
                    console::style(format!(
                        "Invalid bundle name, expecting a GitHub URL or user/repository: {input}"
                    ))
                    .red()
                );
                continue;
            }
            Err(e) => return Err(e),
        };

        if !downloader.validate(&bundle)? {
            println!(
                "{}",
                console::style(format!(
                    "Bundle invalid, it does not exist or has no release zips: {}",
                    bundle.url()
                ))
                .red()
            );
            continue;
        }

        local.insert(repo.clone(), repo.clone());
        changed = true;
        println!("Added {repo}");
        println!("    {}", bundle.url());
    }

    if changed {
        config::save_local(data_dir, &local)?;
    }
    Ok(())
}

fn is_listed(data_dir: &Path, local: &BTreeMap<String, String>, repo: &str) -> bool {
    local.values().any(|existing| existing == repo)
        || config::load_all(data_dir)
            .iter()
            .any(|(_, existing)| existing == repo)
}

/// Run bundle-remove command
pub fn remove(session: &Session, args: BundleRemoveArgs) -> Result<()> {
    if args.reset {
        config::save_local(&session.data_dir, &BTreeMap::new())?;
        println!("Local bundle list cleared.");
        return Ok(());
    }
    if args.bundles.is_empty() {
        println!("Name the bundles to remove, or pass --reset.");
        return Ok(());
    }
    remove_bundles(&session.data_dir, &args.bundles, &mut |_| {
        Ok(Confirm::new("Do you want to remove that bundle ?")
            .with_default(true)
            .prompt()?)
    })
}

fn remove_bundles(
    data_dir: &Path,
    names: &[String],
    confirm: &mut dyn FnMut(&str) -> Result<bool>,
) -> Result<()> {
    let mut local = config::load_local(data_dir);
    let configured = config::load_configured(data_dir);
    let mut removed = false;

    for input in names {
        let repo = config::normalize_repo(input);
        let found = local
            .iter()
            .find(|(name, existing)| **name == repo || **existing == repo)
            .map(|(name, existing)| (name.clone(), existing.clone()));

        match found {
            Some((name, existing)) => {
                println!("{name}: {existing}");
                if confirm(&existing)? {
                    local.remove(&name);
                    removed = true;
                    println!("Removed {existing}");
                }
            }
            None if configured.iter().any(|(_, builtin)| *builtin == repo) => {
                println!(
                    "{}",
                    console::style(format!("Cannot remove built-in module:\n    {repo}")).yellow()
                );
            }
            None => {
                println!(
                    "{}",
                    console::style(format!(
                        "Bundle not found in the local list, nothing removed:\n    {repo}"
                    ))
                    .yellow()
                );
            }
        }
    }

    if removed {
        config::save_local(data_dir, &local)?;
    }
    Ok(())
}
