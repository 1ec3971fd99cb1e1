use clap::Parser;

/// Arguments for the freeze command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Print the installed modules:\n    circup freeze\n\n\
                  Save them to requirements.txt:\n    circup freeze -r")]
pub struct FreezeArgs {
    /// Save the output to requirements.txt in the current directory
    #[arg(long, short = 'r')]
    pub requirement: bool,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {}

/// Arguments for the update command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Choose the modules to update:\n    circup update\n\n\
                  Update everything without prompting:\n    circup update --all")]
pub struct UpdateArgs {
    /// Update all modules without prompting, including major version updates
    #[arg(long)]
    pub all: bool,
}

/// Arguments for the show command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  List every available module:\n    circup show\n\n\
                  List the modules matching a word:\n    circup show display")]
pub struct ShowArgs {
    /// Only list modules whose name contains this text
    #[arg(value_name = "MATCH")]
    pub pattern: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::super::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_cli_parsing_freeze() {
        let cli = Cli::try_parse_from(["circup", "freeze", "-r"]).unwrap();
        match cli.command {
            Commands::Freeze(args) => assert!(args.requirement),
            _ => panic!("Expected Freeze command"),
        }
    }

    #[test]
    fn test_cli_parsing_update() {
        let cli = Cli::try_parse_from(["circup", "update", "--all"]).unwrap();
        match cli.command {
            Commands::Update(args) => assert!(args.all),
            _ => panic!("Expected Update command"),
        }
    }

    #[test]
    fn test_cli_parsing_show() {
        let cli = Cli::try_parse_from(["circup", "show", "display"]).unwrap();
        match cli.command {
            Commands::Show(args) => assert_eq!(args.pattern.as_deref(), Some("display")),
            _ => panic!("Expected Show command"),
        }

        let cli = Cli::try_parse_from(["circup", "show"]).unwrap();
        match cli.command {
            Commands::Show(args) => assert_eq!(args.pattern, None),
            _ => panic!("Expected Show command"),
        }
    }
}
