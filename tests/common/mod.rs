//! Common test utilities for circup integration tests
//!
//! A [`TestEnv`] holds a fake mounted device and a data directory with one
//! bundle already unpacked, so commands run with `--offline` never touch the
//! network.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

pub const BUNDLE_REPO: &str = "adafruit/Adafruit_CircuitPython_Bundle";
pub const BUNDLE_TAG: &str = "20240917";
pub const CPY_VERSION: &str = "9.1.4";
pub const BOARD_ID: &str = "raspberry_pi_pico";

const BUNDLE_ID: &str = "adafruit-circuitpython-bundle";

/// Platform directory and release asset name of each unpacked platform
const PLATFORMS: [(&str, &str); 3] = [("py", "py"), ("8mpy", "8.x-mpy"), ("9mpy", "9.x-mpy")];

pub struct TestEnv {
    pub data: TempDir,
    pub device: TempDir,
    pub work: TempDir,
}

impl TestEnv {
    /// An empty device and an empty, already downloaded bundle
    pub fn new() -> Self {
        let env = Self {
            data: TempDir::new().expect("Failed to create data directory"),
            device: TempDir::new().expect("Failed to create device directory"),
            work: TempDir::new().expect("Failed to create working directory"),
        };
        write(
            env.device.path(),
            "boot_out.txt",
            format!("Adafruit CircuitPython {CPY_VERSION} on 2024-09-17; Raspberry Pi Pico with rp2040\nBoard ID:{BOARD_ID}\n")
                .as_bytes(),
        );
        std::fs::create_dir_all(env.device.path().join("lib")).expect("Failed to create lib");

        write(
            env.data.path(),
            "bundle_config.json",
            format!("{{\"adafruit\": \"{BUNDLE_REPO}\"}}").as_bytes(),
        );
        write(
            env.data.path(),
            "circup.json",
            format!("{{\"{BUNDLE_REPO}\": \"{BUNDLE_TAG}\"}}").as_bytes(),
        );
        for (platform, _) in PLATFORMS {
            std::fs::create_dir_all(env.bundle_lib(platform)).expect("Failed to create bundle lib");
        }
        env
    }

    /// Unpacked release directory of a platform
    fn release_dir(&self, platform: &str) -> PathBuf {
        let archive = PLATFORMS
            .iter()
            .find(|(p, _)| *p == platform)
            .map(|(_, archive)| *archive)
            .expect("Unknown platform");
        self.data
            .path()
            .join("adafruit")
            .join(format!("{BUNDLE_ID}-{platform}"))
            .join(format!("{BUNDLE_ID}-{archive}-{BUNDLE_TAG}"))
    }

    pub fn bundle_lib(&self, platform: &str) -> PathBuf {
        self.release_dir(platform).join("lib")
    }

    /// Add a module to the bundle, as source and compiled for CircuitPython 9
    pub fn add_bundle_module(&self, name: &str, version: &str) {
        write(&self.bundle_lib("py"), &format!("{name}.py"), &py_source(version));
        write(&self.bundle_lib("9mpy"), &format!("{name}.mpy"), &mpy_v6(version));
    }

    /// Record the requirements a bundle module declares
    pub fn add_requirements(&self, name: &str, requirements: &str) {
        let dir = self.release_dir("py").join("requirements").join(name);
        write(&dir, "requirements.txt", requirements.as_bytes());
    }

    /// Add an example file below the bundle's `examples/` directory
    pub fn add_bundle_example(&self, path: &str, content: &[u8]) {
        write(&self.release_dir("py").join("examples"), path, content);
    }

    pub fn write_device_file(&self, path: &str, content: &[u8]) {
        write(self.device.path(), path, content);
    }

    pub fn device_file_exists(&self, path: &str) -> bool {
        self.device.path().join(path).exists()
    }

    /// The binary, isolated in this environment
    #[allow(deprecated)]
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("circup").expect("Failed to find circup binary");
        cmd.current_dir(self.work.path())
            .env("CIRCUP_DATA_DIR", self.data.path())
            .env("CIRCUP_LOG_DIR", self.data.path().join("logs"))
            .env_remove("CIRCUP_WEBWORKFLOW_PASSWORD")
            .env_remove("RUST_LOG")
            .arg("--offline");
        cmd
    }

    /// The binary pointed at this environment's device
    pub fn device_command(&self) -> Command {
        let mut cmd = self.command();
        cmd.arg("--path")
            .arg(self.device.path())
            .args(["--cpy-version", CPY_VERSION, "--board-id", BOARD_ID]);
        cmd
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

pub fn write(root: &Path, path: &str, content: &[u8]) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    std::fs::write(full, content).expect("Failed to write file");
}

pub fn py_source(version: &str) -> Vec<u8> {
    format!("__version__ = \"{version}\"\n__repo__ = \"https://github.com/adafruit/Example.git\"\n")
        .into_bytes()
}

/// A CircuitPython 9 compiled module declaring a version
pub fn mpy_v6(version: &str) -> Vec<u8> {
    let mut bytes = b"C\x06\x00\x1f\x0b__version__\x0a".to_vec();
    bytes.extend_from_slice(version.as_bytes());
    bytes.push(0);
    bytes
}
