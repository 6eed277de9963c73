pub mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use evaka_finance_core::config::{AppConfig, LoadOptions, LogFormat};

use crate::commands::generate::GenerateArgs;

#[derive(Debug, Parser)]
#[command(
    name = "evaka-finance",
    about = "eVaka finance decision operator CLI",
    long_about = "Apply migrations, inspect configuration, and regenerate fee and voucher value decision drafts.",
    after_help = "Examples:\n  evaka-finance migrate\n  evaka-finance generate --snapshot family.json --event income --person <uuid> --from 2024-01-01\n  evaka-finance decisions --head <uuid>"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Regenerate decision drafts for the households a change affects")]
    Generate(GenerateArgs),
    #[command(about = "List stored fee and voucher value decisions of a head of family")]
    Decisions {
        #[arg(long, help = "Head of family person id")]
        head: Uuid,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Stdout carries the command payload, so logs go to stderr.
    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Generate(args) => commands::generate::run(args),
        Command::Decisions { head } => commands::decisions::run(head),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn init_logging(config: &AppConfig) {
    let level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
