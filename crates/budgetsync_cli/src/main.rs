//! BudgetSync CLI
//!
//! Command-line tools for budgets synchronized into a file-backed
//! document store.
//!
//! # Commands
//!
//! - `inspect` - Display the root document and reconstructed record counts
//! - `verify` - Check that the manifest and every chunk decode cleanly
//! - `reset` - Tombstone the budget and delete its chunks
//! - `gc` - Delete chunk documents the manifest does not reference
//! - `key-check` - Print the key check value of a key

mod commands;

use clap::{Args, Parser, Subcommand};
use commands::{KeySource, Target};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// BudgetSync command-line tools.
#[derive(Parser)]
#[command(name = "budgetsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Budget id
    #[arg(global = true, short, long)]
    budget: Option<String>,

    /// Root collection holding budgets
    #[arg(global = true, long, default_value = "budgets")]
    root: String,

    #[command(flatten)]
    key: KeyArgs,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct KeyArgs {
    /// Encryption key, base64-encoded (32 bytes)
    #[arg(global = true, long, conflicts_with = "passphrase")]
    key: Option<String>,

    /// Passphrase to derive the encryption key from
    #[arg(global = true, long, requires = "salt")]
    passphrase: Option<String>,

    /// Salt for passphrase derivation
    #[arg(global = true, long)]
    salt: Option<String>,
}

impl KeyArgs {
    fn source(self) -> Option<KeySource> {
        match (self.key, self.passphrase, self.salt) {
            (Some(key), _, _) => Some(KeySource::Base64(key)),
            (None, Some(passphrase), Some(salt)) => Some(KeySource::Passphrase { passphrase, salt }),
            _ => None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Display the root document and reconstructed record counts
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check that the manifest and every listed chunk decode cleanly
    Verify,

    /// Tombstone the budget and delete all of its chunks
    Reset {
        /// Confirm the destructive reset
        #[arg(long)]
        yes: bool,
    },

    /// Delete chunk documents the manifest does not reference
    Gc,

    /// Print the key check value of the given key
    KeyCheck,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let key = cli.key.source();
    let target = || -> Result<Target, Box<dyn std::error::Error>> {
        Ok(Target {
            path: cli.path.clone().ok_or("Store path required")?,
            budget_id: cli.budget.clone().ok_or("Budget id required")?,
            root_collection: cli.root.clone(),
        })
    };

    match cli.command {
        Commands::Inspect { ref format } => {
            commands::inspect::run(&target()?, key.as_ref(), format)?;
        }
        Commands::Verify => {
            let key = key.as_ref().ok_or("A key is required for verify")?;
            commands::verify::run(&target()?, key)?;
        }
        Commands::Reset { yes } => {
            if !yes {
                return Err("Refusing to reset without --yes".into());
            }
            let key = key.as_ref().ok_or("A key is required for reset")?;
            commands::reset::run(&target()?, key)?;
        }
        Commands::Gc => {
            let key = key.as_ref().ok_or("A key is required for gc")?;
            commands::gc::run(&target()?, key)?;
        }
        Commands::KeyCheck => {
            let key = key.as_ref().ok_or("A key is required for key-check")?;
            println!("{}", key.resolve()?.key_check());
        }
        Commands::Version => {
            println!("BudgetSync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
