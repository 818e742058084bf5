mod commands;
mod output;

use clap::{Parser, Subcommand};
use color_eyre::Result;

#[derive(Parser, Debug)]
#[command(name = "gantry", version, about = "Local CI pipeline runner with matrix fan-out")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a pipeline declaration
    Run(commands::run::RunArgs),

    /// Validate a pipeline declaration without running it
    Validate(commands::validate::ValidateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => commands::run::execute(args).await,
        Commands::Validate(args) => commands::validate::execute(args),
    }
}
