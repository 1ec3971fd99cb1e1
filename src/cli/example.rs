use clap::Parser;

/// Arguments for the example command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  List the libraries that ship examples:\n    circup example --list\n\n\
                  List the examples of a library:\n    circup example --list adafruit_ssd1306\n\n\
                  Copy an example onto the device:\n    circup example adafruit_ssd1306/ssd1306_simpletest\n\n\
                  Copy it as code.py, replacing the current one:\n    circup example --rename --overwrite adafruit_ssd1306/ssd1306_simpletest")]
pub struct ExampleArgs {
    /// Examples as `library/example`, without the `.py` extension
    pub examples: Vec<String>,

    /// List available examples, or those starting with the given names
    #[arg(long, short = 'l')]
    pub list: bool,

    /// Install a single-file example as code.py
    #[arg(long)]
    pub rename: bool,

    /// Replace the file on the device if it exists
    #[arg(long)]
    pub overwrite: bool,
}
