//! Test fixtures shared by the unit tests
//!
//! Builds throwaway devices and unpacked bundles on disk so each test can
//! describe its starting state in a few lines.
//!
//! ```ignore
//! let device = create_device("9.1.4");
//! write_file(device.path(), "lib/neopixel.mpy", &mpy_v6("6.3.0"));
//!
//! let data = create_temp_dir();
//! let bundle = create_bundle(data.path());
//! write_file(&bundle.lib_dir("9mpy").unwrap(), "neopixel.mpy", &mpy_v6("6.3.11"));
//! ```

use std::path::Path;

use tempfile::TempDir;

use crate::bundle::Bundle;

/// Repository used for fixture bundles
pub const BUNDLE_REPO: &str = "adafruit/Adafruit_CircuitPython_Bundle";

/// Tag the fixture bundles are unpacked under
pub const BUNDLE_TAG: &str = "20240917";

/// # Panics
///
/// Panics if the temp directory cannot be created.
#[must_use]
pub fn create_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// A mounted device with `boot_out.txt` reporting `cpy_version`
///
/// # Panics
///
/// Panics if the device files cannot be written.
#[must_use]
pub fn create_device(cpy_version: &str) -> TempDir {
    let temp = create_temp_dir();
    write_file(
        temp.path(),
        "boot_out.txt",
        format!(
            "Adafruit CircuitPython {cpy_version} on 2024-09-17; Raspberry Pi Pico with rp2040\nBoard ID:raspberry_pi_pico\n"
        )
        .as_bytes(),
    );
    std::fs::create_dir_all(temp.path().join("lib")).expect("Failed to create lib");
    temp
}

/// A bundle whose current tag is [`BUNDLE_TAG`], with empty library trees
///
/// # Panics
///
/// Panics if the bundle directories cannot be created.
#[must_use]
pub fn create_bundle(data_dir: &Path) -> Bundle {
    let bundle = Bundle::new(BUNDLE_REPO, data_dir).expect("Failed to create bundle");
    bundle
        .set_current_tag(BUNDLE_TAG)
        .expect("Failed to save bundle tag");
    for (platform, _) in crate::bundle::PLATFORMS {
        let dir = bundle.lib_dir(platform).expect("Failed to get lib dir");
        std::fs::create_dir_all(dir).expect("Failed to create lib dir");
    }
    bundle
}

/// Write a file, creating its parent directories
///
/// # Panics
///
/// Panics if the file cannot be written.
pub fn write_file(root: &Path, path: &str, content: &[u8]) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    std::fs::write(full, content).expect("Failed to write file");
}

/// Source text declaring a version
#[must_use]
pub fn py_source(version: &str) -> Vec<u8> {
    format!("__version__ = \"{version}\"\n__repo__ = \"https://github.com/adafruit/Example.git\"\n")
        .into_bytes()
}

/// A CircuitPython 9 style compiled module declaring a version
#[must_use]
pub fn mpy_v6(version: &str) -> Vec<u8> {
    let mut bytes = b"C\x06\x00\x1f\x0b__version__\x0a".to_vec();
    bytes.extend_from_slice(version.as_bytes());
    bytes.push(0);
    bytes
}

/// A CircuitPython 7/8 style compiled module declaring a version
#[must_use]
pub fn mpy_v5(version: &str) -> Vec<u8> {
    let mut bytes = b"C\x05\x00\x1f".to_vec();
    bytes.push(u8::try_from(version.len() * 2).expect("Version too long"));
    bytes.extend_from_slice(version.as_bytes());
    bytes.extend_from_slice(b"\x00\x16__version__");
    bytes
}
