pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "pricebot",
    about = "Pricebot operator CLI",
    long_about = "Query item prices from the terminal, inspect effective configuration, and run readiness checks.",
    after_help = "Examples:\n  pricebot lookup bitcoin\n  pricebot lookup --json graphics card\n  pricebot config\n  pricebot doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Look up trader prices for an item and print the reply the bot would send")]
    Lookup {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
        #[arg(required = true, num_args = 1.., help = "Item name; multiple words are joined with spaces")]
        item: Vec<String>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and check that the price API answers")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    // same .env the server reads
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Lookup { json, item } => commands::lookup::run(&item.join(" "), json),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
