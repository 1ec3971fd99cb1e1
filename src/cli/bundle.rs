use clap::Parser;

/// Arguments for the bundle-show command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  List the bundles:\n    circup bundle-show\n\n\
                  Also list the modules in each bundle:\n    circup bundle-show --modules")]
pub struct BundleShowArgs {
    /// List the modules of each bundle
    #[arg(long)]
    pub modules: bool,
}

/// Arguments for the bundle-add command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Add a bundle by repository:\n    circup bundle-add adafruit/CircuitPython_Community_Bundle\n\n\
                  Add a bundle by URL:\n    circup bundle-add https://github.com/user/Some_Bundle")]
pub struct BundleAddArgs {
    /// GitHub repositories as `user/repository` or a github.com URL
    #[arg(required = true)]
    pub bundles: Vec<String>,
}

/// Arguments for the bundle-remove command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Remove a bundle:\n    circup bundle-remove user/Some_Bundle\n\n\
                  Remove every locally added bundle:\n    circup bundle-remove --reset")]
pub struct BundleRemoveArgs {
    /// Names or repositories of locally added bundles
    pub bundles: Vec<String>,

    /// Remove all locally added bundles
    #[arg(long)]
    pub reset: bool,
}
