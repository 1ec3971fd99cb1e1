use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Arguments for the wwshell command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  List the root of a web workflow device:\n    circup --host 192.168.1.20 wwshell ls\n\n\
                  Upload a file into lib/:\n    circup --host 192.168.1.20 wwshell put helpers.py lib\n\n\
                  Download code.py into the current directory:\n    circup --host 192.168.1.20 wwshell get code.py\n\n\
                  Delete a file:\n    circup --host 192.168.1.20 wwshell rm lib/helpers.py")]
pub struct WwshellArgs {
    #[command(subcommand)]
    pub command: WwshellCommand,
}

#[derive(Subcommand, Debug)]
pub enum WwshellCommand {
    /// List a directory on the device
    Ls {
        /// Directory to list
        #[arg(default_value = "/")]
        directory: String,
    },

    /// Upload a local file or directory to the device
    Put {
        /// Local file or directory
        file: PathBuf,

        /// Device directory to upload into, the root when omitted
        #[arg(default_value = "")]
        location: String,

        /// Replace the file on the device if it exists
        #[arg(long)]
        overwrite: bool,
    },

    /// Download a file or directory from the device
    Get {
        /// File or directory on the device
        file: String,

        /// Local directory to download into, the current one when omitted
        location: Option<PathBuf>,
    },

    /// Delete a file or directory on the device
    Rm {
        /// File or directory on the device
        file: String,
    },

    /// Create a directory on the device
    Mkdir {
        /// Directory on the device
        directory: String,
    },
}
