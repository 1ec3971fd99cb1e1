//! CLI definitions using clap derive API
//!
//! This module is organized into submodules for each command's argument types:
//! - install: Install command arguments
//! - uninstall: Uninstall command arguments
//! - modules: freeze, list, update and show arguments
//! - bundle: bundle-show, bundle-add and bundle-remove arguments
//! - example: Example command arguments
//! - wwshell: file operations on the device
//! - completions: Completions command arguments

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

pub mod bundle;
pub mod completions;
pub mod example;
pub mod install;
pub mod modules;
pub mod uninstall;
pub mod wwshell;

pub use bundle::{BundleAddArgs, BundleRemoveArgs, BundleShowArgs};
pub use completions::CompletionsArgs;
pub use example::ExampleArgs;
pub use install::InstallArgs;
pub use modules::{FreezeArgs, ListArgs, ShowArgs, UpdateArgs};
pub use uninstall::UninstallArgs;
pub use wwshell::{WwshellArgs, WwshellCommand};

use crate::backend::web::DEFAULT_PORT;
use crate::device::DeviceOptions;

/// Environment variable holding the web workflow password
pub const PASSWORD_ENV: &str = "CIRCUP_WEBWORKFLOW_PASSWORD";

/// Circup - CircuitPython library updater
///
/// Manage and update the library modules on a CircuitPython device.
#[derive(Parser, Debug)]
#[command(
    name = "circup",
    author,
    version,
    color = clap::ColorChoice::Always,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "A tool to manage and update libraries on a CircuitPython device",
    long_about = "Circup finds the library modules installed on a connected CircuitPython device, \
                  compares them with the latest library bundles and installs, updates or removes \
                  them. Devices are reached through the mounted CIRCUITPY drive or over the \
                  web workflow.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  circup list                              \x1b[90m# Show out of date modules\x1b[0m\n   \
                  circup update --all                      \x1b[90m# Update them without prompting\x1b[0m\n   \
                  circup install adafruit_display_text     \x1b[90m# Install a module and its dependencies\x1b[0m\n   \
                  circup install --auto                    \x1b[90m# Install everything code.py imports\x1b[0m\n   \
                  circup --host 192.168.1.20 list          \x1b[90m# Use the web workflow\x1b[0m\n   \
                  circup bundle-add adafruit/Some_Bundle   \x1b[90m# Use an extra bundle\x1b[0m\n   \
                  circup example --list                    \x1b[90m# Libraries with examples\x1b[0m\n\n\
                  "
)]
pub struct Cli {
    /// Also write the log to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Path to the CircuitPython drive, overriding automatic detection
    #[arg(long, global = true, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Hostname or IP address of a web workflow device
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Web workflow port
    #[arg(long, global = true, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Web workflow password
    #[arg(long, global = true, env = PASSWORD_ENV, hide_env_values = true)]
    pub password: Option<String>,

    /// Timeout in seconds for network operations
    #[arg(long, global = true, default_value_t = 30, value_name = "SECONDS")]
    pub timeout: u64,

    /// Board ID of the device; together with --cpy-version, skips asking the device
    #[arg(long, global = true)]
    pub board_id: Option<String>,

    /// CircuitPython version of the device; together with --board-id, skips asking the device
    #[arg(long, global = true, value_name = "VERSION")]
    pub cpy_version: Option<String>,

    /// Use the bundles already downloaded, never touch the network for them
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn device_options(&self) -> DeviceOptions {
        DeviceOptions {
            path: self.path.clone(),
            host: self.host.clone(),
            port: self.port,
            password: self.password.clone(),
            timeout: self.timeout(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Output the modules on the device as requirements
    Freeze(FreezeArgs),

    /// List out of date modules on the device
    List(ListArgs),

    /// Install modules onto the device
    Install(InstallArgs),

    /// Remove modules from the device
    Uninstall(UninstallArgs),

    /// Update out of date modules on the device
    Update(UpdateArgs),

    /// List the modules available in the bundles
    Show(ShowArgs),

    /// Show the bundles in use
    BundleShow(BundleShowArgs),

    /// Add bundles to the local bundle list
    BundleAdd(BundleAddArgs),

    /// Remove bundles from the local bundle list
    BundleRemove(BundleRemoveArgs),

    /// Copy library examples from the bundles onto the device
    Example(ExampleArgs),

    /// Work with the files on the device: ls, put, get, rm, mkdir
    Wwshell(WwshellArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

impl Commands {
    /// Whether the command works without a connected device
    pub fn is_boardless(&self) -> bool {
        matches!(
            self,
            Self::Show(_)
                | Self::BundleShow(_)
                | Self::BundleAdd(_)
                | Self::BundleRemove(_)
                | Self::Completions(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_cli_parsing_list() {
        let cli = Cli::try_parse_from(["circup", "list"]).unwrap();
        assert!(matches!(cli.command, Commands::List(_)));
        assert!(!cli.command.is_boardless());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["circup", "freeze"]).unwrap();
        assert_eq!(cli.port, 80);
        assert_eq!(cli.timeout(), Duration::from_secs(30));
        assert!(!cli.offline);
        assert!(cli.path.is_none());
    }

    #[test]
    fn test_cli_global_options() {
        let cli = Cli::try_parse_from([
            "circup",
            "--host",
            "192.168.1.20",
            "--port",
            "8080",
            "--password",
            "pw",
            "list",
            "--timeout",
            "5",
            "--offline",
        ])
        .unwrap();
        let options = cli.device_options();
        assert_eq!(options.host.as_deref(), Some("192.168.1.20"));
        assert_eq!(options.port, 8080);
        assert_eq!(options.password.as_deref(), Some("pw"));
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert!(cli.offline);
    }

    #[test]
    #[serial]
    fn test_cli_password_from_env() {
        let original = std::env::var(PASSWORD_ENV).ok();
        unsafe {
            std::env::set_var(PASSWORD_ENV, "from-env");
        }
        let cli = Cli::try_parse_from(["circup", "--host", "cpy.local", "list"]).unwrap();
        let flag = Cli::try_parse_from(["circup", "--password", "flag", "list"]).unwrap();
        unsafe {
            match original {
                Some(value) => std::env::set_var(PASSWORD_ENV, value),
                None => std::env::remove_var(PASSWORD_ENV),
            }
        }
        assert_eq!(cli.password.as_deref(), Some("from-env"));
        assert_eq!(flag.password.as_deref(), Some("flag"));
    }

    #[test]
    fn test_cli_board_override() {
        let cli = Cli::try_parse_from([
            "circup",
            "--path",
            "/media/CIRCUITPY",
            "--board-id",
            "raspberry_pi_pico",
            "--cpy-version",
            "9.1.4",
            "list",
        ])
        .unwrap();
        assert_eq!(cli.board_id.as_deref(), Some("raspberry_pi_pico"));
        assert_eq!(cli.cpy_version.as_deref(), Some("9.1.4"));
        assert_eq!(cli.path, Some(PathBuf::from("/media/CIRCUITPY")));
    }

    #[test]
    fn test_device_commands() {
        for args in [
            vec!["circup", "example", "--list"],
            vec!["circup", "wwshell", "ls"],
            vec!["circup", "update", "--all"],
        ] {
            let cli = Cli::try_parse_from(&args).unwrap();
            assert!(!cli.command.is_boardless(), "{args:?}");
        }
    }

    #[test]
    fn test_boardless_commands() {
        for args in [
            vec!["circup", "show"],
            vec!["circup", "bundle-show"],
            vec!["circup", "bundle-add", "a/b"],
            vec!["circup", "bundle-remove", "--reset"],
            vec!["circup", "completions", "bash"],
        ] {
            let cli = Cli::try_parse_from(&args).unwrap();
            assert!(cli.command.is_boardless(), "{args:?}");
        }
    }

    #[test]
    fn test_cli_parsing_completions() {
        let cli = Cli::try_parse_from(["circup", "completions", "bash"]).unwrap();
        match cli.command {
            Commands::Completions(args) => {
                assert_eq!(args.shell, "bash");
            }
            _ => panic!("Expected Completions command"),
        }
    }
}
