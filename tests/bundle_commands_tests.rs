//! Integration tests for the device-free commands: show and bundle-*

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_show_all() {
    let env = TestEnv::new();
    env.add_bundle_module("neopixel", "6.3.11");
    env.add_bundle_module("adafruit_pixelbuf", "2.0.4");
    env.add_bundle_module("adafruit_ticks", "1.1.0");

    env.command()
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("adafruit_pixelbuf\nadafruit_ticks\nneopixel\n"))
        .stdout(predicate::str::contains("3 shown of 3 packages."));
}

#[test]
fn test_show_match() {
    let env = TestEnv::new();
    env.add_bundle_module("neopixel", "6.3.11");
    env.add_bundle_module("adafruit_pixelbuf", "2.0.4");
    env.add_bundle_module("adafruit_ticks", "1.1.0");

    env.command()
        .args(["show", "PIXEL"])
        .assert()
        .success()
        .stdout(predicate::str::contains("adafruit_ticks").not())
        .stdout(predicate::str::contains("2 shown of 3 packages."));
}

#[test]
fn test_show_needs_no_device() {
    TestEnv::new()
        .command()
        .args(["--path", "/nonexistent/CIRCUITPY", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 shown of 0 packages."));
}

#[test]
fn test_bundle_show() {
    TestEnv::new()
        .command()
        .arg("bundle-show")
        .assert()
        .success()
        .stdout(predicate::str::contains("adafruit/Adafruit_CircuitPython_Bundle"))
        .stdout(predicate::str::contains(
            "https://github.com/adafruit/Adafruit_CircuitPython_Bundle",
        ))
        .stdout(predicate::str::contains("version = 20240917"));
}

#[test]
fn test_bundle_show_modules() {
    let env = TestEnv::new();
    env.add_bundle_module("neopixel", "6.3.11");
    env.command()
        .args(["bundle-show", "--modules"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Modules:"))
        .stdout(predicate::str::contains("neopixel (6.3.11)"));
}

#[test]
fn test_bundle_add_offline() {
    TestEnv::new()
        .command()
        .args(["bundle-add", "https://github.com/adafruit/Adafruit_CircuitPython_Bundle"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cannot check new bundles while offline"));
}

#[test]
fn test_bundle_remove_builtin() {
    TestEnv::new()
        .command()
        .args(["bundle-remove", "adafruit/Adafruit_CircuitPython_Bundle"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cannot remove built-in module:"));
}

#[test]
fn test_bundle_remove_reset() {
    let env = TestEnv::new();
    common::write(
        env.data.path(),
        "bundle_config_local.json",
        br#"{"someone/Some_Bundle": "someone/Some_Bundle"}"#,
    );
    env.command()
        .args(["bundle-remove", "--reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Local bundle list cleared."));
    assert!(!env.data.path().join("bundle_config_local.json").exists());
}
