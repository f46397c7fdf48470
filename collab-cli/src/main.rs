//! # collab-cli
//!
//! CLI tool for exercising collab-sync sessions.
//!
//! ## Commands
//!
//! - `simulate`: Run several participants against an in-process authority
//!   and check that they converge
//!
//! ## Example
//!
//! ```bash
//! # Three participants, 50 rounds of random edits
//! collab-cli simulate --clients 3 --rounds 50 --seed 7
//!
//! # Start from a document and settings file
//! collab-cli simulate --text "hello world" --config collab.toml
//!
//! # Watch every integration step
//! RUST_LOG=collab_client=debug,collab_core=debug collab-cli simulate
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::simulate;

/// CLI tool for exercising collab-sync sessions.
#[derive(Parser, Debug)]
#[command(name = "collab-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Simulate concurrent editors sharing one authority
    Simulate {
        /// Number of participants
        #[arg(long, default_value = "3")]
        clients: usize,

        /// Rounds of edits
        #[arg(long, default_value = "20")]
        rounds: usize,

        /// Seed for the random edits (random if omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Initial document
        #[arg(long, default_value = "")]
        text: String,

        /// Client settings file (TOML)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            clients,
            rounds,
            seed,
            text,
            config,
        } => {
            let options = simulate::Options {
                clients,
                rounds,
                seed,
                text,
                config,
            };
            let report = simulate::run(&options).await?;
            report.print();
            if !report.converged() {
                anyhow::bail!("participants diverged");
            }
        }
    }

    Ok(())
}
