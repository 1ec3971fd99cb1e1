use clap::Parser;
use std::path::PathBuf;

/// Arguments for the install command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Install a module and its dependencies:\n    circup install adafruit_display_text\n\n\
                  Install the source version:\n    circup install --py adafruit_display_text\n\n\
                  Install from a requirements file:\n    circup install -r requirements.txt\n\n\
                  Install the modules code.py imports:\n    circup install --auto\n\n\
                  Install the modules another file imports:\n    circup install --auto-file boot.py\n\n\
                  Install a local module:\n    circup install ./my_module.py\n\n\
                  Replace modules that are already installed:\n    circup install -U neopixel")]
pub struct InstallArgs {
    /// Module names or local paths
    pub modules: Vec<String>,

    /// Install the .py version of the modules instead of the compiled version
    #[arg(long = "py")]
    pub py: bool,

    /// Install every module listed in a requirements file
    #[arg(long, short = 'r', value_name = "FILE")]
    pub requirement: Option<PathBuf>,

    /// Install the modules imported by code.py
    #[arg(long, short = 'a')]
    pub auto: bool,

    /// File to scan for imports: a name on the device, or a ./ or absolute local path
    #[arg(long, value_name = "FILE")]
    pub auto_file: Option<String>,

    /// Upgrade modules that are already installed
    #[arg(long, short = 'U')]
    pub upgrade: bool,
}
