pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "reforma",
    about = "Reforma operator CLI",
    long_about = "Inspect the price catalog and effective configuration, check runtime readiness, and generate quote documents without the portal.",
    after_help = "Examples:\n  reforma catalog\n  reforma doctor --json\n  reforma smoke\n  reforma quote --request presupuesto.toml"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Load the price table and print it grouped by category")]
    Catalog {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, catalog load, and renderer availability checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run the quoting pipeline end to end with per-check timing details")]
    Smoke,
    #[command(about = "Compute a quote from a request file and write the rendered document")]
    Quote {
        #[arg(long, help = "Quote request TOML with client details and category quantities")]
        request: PathBuf,
        #[arg(long, help = "Output path for the document (extension follows the format)")]
        out: Option<PathBuf>,
        #[arg(long, default_value = "presupuesto", help = "Document template to render")]
        template: String,
        #[arg(long, help = "Skip PDF conversion and write printable HTML")]
        html: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Catalog { json } => commands::catalog::run(json),
        Command::Smoke => commands::smoke::run(),
        Command::Quote { request, out, template, html } => {
            commands::quote::run(&request, out.as_deref(), &template, html)
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
