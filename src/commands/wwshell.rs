//! File operations on the device: ls, put, get, rm, mkdir
//!
//! Device paths may be written with or without leading and trailing `/`;
//! `/` alone is the root of the device.

use std::fs;
use std::path::Path;

use crate::backend::{self, DirEntry, ModuleBackend};
use crate::cli::{WwshellArgs, WwshellCommand};
use crate::error::{CircupError, Result};

/// Run wwshell command
pub fn run(backend: &dyn ModuleBackend, args: WwshellArgs) -> Result<()> {
    match args.command {
        WwshellCommand::Ls { directory } => ls(backend, &directory),
        WwshellCommand::Put {
            file,
            location,
            overwrite,
        } => put(backend, &file, &location, overwrite),
        WwshellCommand::Get { file, location } => {
            get(backend, &file, location.as_deref().unwrap_or(Path::new(".")))
        }
        WwshellCommand::Rm { file } => {
            println!("running: rm {file}");
            backend.delete(&device_path(&file))
        }
        WwshellCommand::Mkdir { directory } => {
            println!("running: mkdir {directory}");
            backend.mkdir(&device_path(&directory))
        }
    }
}

fn device_path(path: &str) -> String {
    path.trim_matches('/').to_string()
}

/// Directories first, then files, each alphabetically
pub fn directories_first(mut entries: Vec<DirEntry>) -> Vec<DirEntry> {
    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    entries
}

fn ls(backend: &dyn ModuleBackend, path: &str) -> Result<()> {
    let shown = if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    };
    println!("running: ls {shown}");

    let entries = backend.enumerate(&device_path(path))?;
    println!("Size\tName");
    for entry in directories_first(entries) {
        let suffix = if entry.is_dir { "/" } else { "" };
        println!("{}\t{}{}", entry.size, entry.name, suffix);
    }
    Ok(())
}

/// Upload a local file or directory into a device directory
pub fn put(backend: &dyn ModuleBackend, file: &Path, location: &str, overwrite: bool) -> Result<()> {
    println!(
        "Attempting PUT: {} at {} overwrite? {}",
        file.display(),
        location,
        overwrite
    );
    let name = file
        .file_name()
        .filter(|_| file.exists())
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CircupError::FileReadFailed {
            path: file.display().to_string(),
            reason: "no such file or directory".to_string(),
        })?;
    let location = device_path(location);
    let target = backend::join(&location, &name);

    if backend.exists(&target)? {
        if !overwrite {
            println!(
                "{}",
                console::style(format!(
                    "{target} already exists. Pass --overwrite if you wish to replace it."
                ))
                .red()
            );
            return Ok(());
        }
        println!(
            "{}",
            console::style(format!("{target} already exists. Overwriting it.")).yellow()
        );
    }

    backend::copy_local_artifact(backend, file, &location)?;
    println!("Successfully PUT {target}");
    Ok(())
}

/// Download a device file or directory into a local directory
pub fn get(backend: &dyn ModuleBackend, file: &str, dest_dir: &Path) -> Result<()> {
    println!("running: get {file} {}", dest_dir.display());
    let path = device_path(file);
    let entry = find_entry(backend, &path)?;
    let local = dest_dir.join(&entry.name);
    if entry.is_dir {
        download_tree(backend, &path, &local)
    } else {
        create_local_dir(dest_dir)?;
        write_local(&local, &backend.read(&path)?)
    }
}

/// The listing entry of a device path, found through its parent
fn find_entry(backend: &dyn ModuleBackend, path: &str) -> Result<DirEntry> {
    let (parent, name) = path.rsplit_once('/').unwrap_or(("", path));
    backend
        .enumerate(parent)?
        .into_iter()
        .find(|entry| entry.name == name)
        .ok_or_else(|| CircupError::NotFound {
            path: path.to_string(),
        })
}

fn download_tree(backend: &dyn ModuleBackend, device_dir: &str, local_dir: &Path) -> Result<()> {
    create_local_dir(local_dir)?;
    for entry in backend.enumerate(device_dir)? {
        let child = backend::join(device_dir, &entry.name);
        let local = local_dir.join(&entry.name);
        if entry.is_dir {
            download_tree(backend, &child, &local)?;
        } else {
            write_local(&local, &backend.read(&child)?)?;
        }
    }
    Ok(())
}

fn create_local_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| CircupError::FileWriteFailed {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })
}

fn write_local(path: &Path, bytes: &[u8]) -> Result<()> {
    tracing::debug!("Saving {} bytes to {}", bytes.len(), path.display());
    fs::write(path, bytes).map_err(|e| CircupError::FileWriteFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
