use clap::Parser;

/// Arguments for the uninstall command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Uninstall a module:\n    circup uninstall neopixel\n\n\
                  Uninstall several modules:\n    circup uninstall adafruit_hid adafruit_display_text")]
pub struct UninstallArgs {
    /// Names of the modules to remove
    #[arg(required = true)]
    pub modules: Vec<String>,
}
