use clap::Parser;

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    circup completions bash > ~/.bash_completion.d/circup\n\n\
                  Generate zsh completions:\n    circup completions zsh > ~/.zfunc/_circup\n\n\
                  Generate fish completions:\n    circup completions fish > ~/.config/fish/completions/circup.fish\n\n\
                  Generate PowerShell completions:\n    circup completions powershell")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    pub shell: String,
}
