pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "prodcat",
    about = "Product catalog operator CLI",
    long_about = "Inspect catalog configuration, dry-run catalog loads, and export the loaded catalog.",
    after_help = "Examples:\n  prodcat config\n  prodcat check\n  prodcat export --output products.snapshot.json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Run one full catalog load without publishing it anywhere")]
    Check,
    #[command(about = "Load the catalog and write it back in the catalog file schema")]
    Export {
        #[arg(long, help = "Destination path for the exported catalog document")]
        output: PathBuf,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Check => commands::check::run(),
        Command::Export { output } => commands::export::run(&output),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
