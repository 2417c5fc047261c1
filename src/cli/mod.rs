pub mod coverage;
pub mod hash;
pub mod init;
pub mod rules;
pub mod run;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

use crate::error::{FinError, Result};
use crate::hashing::Salt;
use crate::pipeline::Pipeline;
use crate::rules::RuleSet;
use crate::settings::{load_salt, load_settings, shellexpand_path, Settings};

#[derive(Parser)]
#[command(
    name = "finmodel",
    about = "Anonymize, categorize and star-schema a bank statement export."
)]
pub struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write default settings and an editable rules file.
    Init {
        /// Directory for the output tables (default: ~/Documents/finmodel)
        #[arg(long = "output-dir")]
        output_dir: Option<String>,
        /// Overwrite an existing rules file with the built-in rules
        #[arg(long)]
        force: bool,
    },
    /// Enrich a statement and write the company, transaction-info and fact tables.
    Run {
        /// Semicolon-delimited statement export
        file: String,
        /// Directory for the output tables
        #[arg(long = "output-dir")]
        output_dir: Option<String>,
        /// Rules file (default: from settings)
        #[arg(long)]
        rules: Option<String>,
        /// Print the first N enriched rows
        #[arg(long)]
        preview: Option<usize>,
    },
    /// Print the salted hash of account identifiers, for use in the rules file.
    Hash {
        /// Account identifiers (IBANs)
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
    /// Show how many rows resolve to a company and which counterparties do not.
    Coverage {
        /// Semicolon-delimited statement export
        file: String,
        /// Rules file (default: from settings)
        #[arg(long)]
        rules: Option<String>,
        /// Number of unresolved counterparties to list
        #[arg(long, default_value = "20")]
        top: usize,
        /// Preview rows of this counterparty
        #[arg(long)]
        counterparty: Option<String>,
    },
    /// Inspect the matching rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// List description rules and category lists in match order.
    List {
        /// Rules file (default: from settings)
        #[arg(long)]
        rules: Option<String>,
    },
}

pub(crate) fn rules_path(settings: &Settings, rules: Option<&str>) -> PathBuf {
    PathBuf::from(shellexpand_path(rules.unwrap_or(&settings.rules_path)))
}

/// An explicit `--rules` path must exist; the settings default falls back to the built-in rules.
pub(crate) fn load_rules(settings: &Settings, rules: Option<&str>) -> Result<RuleSet> {
    let path = rules_path(settings, rules);
    if rules.is_some() {
        if !path.exists() {
            return Err(FinError::Settings(format!(
                "rules file {} does not exist",
                path.display()
            )));
        }
        return RuleSet::load(&path);
    }
    RuleSet::load_or_builtin(&path)
}

/// Settings, rules and salt wired into a ready pipeline.
pub(crate) fn build_pipeline(rules: Option<&str>) -> Result<(Settings, Pipeline)> {
    let settings = load_settings()?;
    let rule_set = load_rules(&settings, rules)?;
    let salt: Salt = load_salt(true)?;
    let pipeline = Pipeline::new(&rule_set, salt, settings.digest)?;
    Ok((settings, pipeline))
}
