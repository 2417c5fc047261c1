mod classifier;
mod cli;
mod dimensions;
mod error;
mod export;
mod fmt;
mod hashing;
mod importer;
mod models;
mod pipeline;
mod resolver;
mod rules;
mod settings;

use clap::Parser;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, RulesCommands};

fn main() {
    let cli = Cli::parse();
    init_logger(cli.log_level());

    let result = match cli.command {
        Commands::Init { output_dir, force } => cli::init::run(output_dir, force),
        Commands::Run {
            file,
            output_dir,
            rules,
            preview,
        } => cli::run::run(&file, output_dir.as_deref(), rules.as_deref(), preview),
        Commands::Hash { identifiers } => cli::hash::run(&identifiers),
        Commands::Coverage {
            file,
            rules,
            top,
            counterparty,
        } => cli::coverage::run(&file, rules.as_deref(), top, counterparty.as_deref()),
        Commands::Rules { command } => match command {
            RulesCommands::List { rules } => cli::rules::list(rules.as_deref()),
        },
    };

    if let Err(e) = result {
        error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        None => EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
