mod cli;
mod run;
mod sim;

use anyhow::Result;
use cli::{Command, ConfigAction};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Command::Simulate(args) => run::simulate(args),
        Command::Config(config_cmd) => match config_cmd.action {
            ConfigAction::Validate { path } => run::validate_config(&path),
            ConfigAction::Defaults => run::print_default_config(),
        },
    }
}
