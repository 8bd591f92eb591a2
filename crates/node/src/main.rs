//! IOU CLI - Main entry point

use clap::{Parser, Subcommand};
use iou_node::{commands, AppContext, NodeConfig};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "iou")]
#[command(about = "IOU - Bilateral obligations on a notarised ledger", long_about = None)]
struct Cli {
    /// Data directory path (overrides the config file)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a signing key for a party
    Keygen {
        /// Party name (will be uppercased)
        name: String,
        /// Replace an existing key file
        #[arg(long)]
        force: bool,
    },

    /// Issue a new IOU; the lender initiates
    Issue {
        #[arg(long)]
        lender: String,
        #[arg(long)]
        borrower: String,
        #[arg(long)]
        amount: Decimal,
        /// Currency code
        #[arg(long, default_value = "USD")]
        currency: String,
    },

    /// Transfer an IOU to a new lender; only the current lender may do this
    Transfer {
        /// Party initiating the transfer
        #[arg(long = "as")]
        caller: String,
        /// Linear id of the IOU
        #[arg(long)]
        id: String,
        /// New lender
        #[arg(long)]
        to: String,
    },

    /// List current IOUs
    List {
        /// Only IOUs this party participates in
        #[arg(long)]
        party: Option<String>,
    },

    /// Re-verify signatures and contract rules of every journaled transaction
    Audit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_file(path)?,
        None => NodeConfig::default(),
    };
    if let Some(data) = cli.data {
        config.data_dir = data;
    }

    // Key generation does not need the ledger
    if let Commands::Keygen { name, force } = &cli.command {
        return commands::keygen(&config, name, *force);
    }

    let mut ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Keygen { .. } => {}

        Commands::Issue {
            lender,
            borrower,
            amount,
            currency,
        } => {
            commands::issue(&mut ctx, &lender, &borrower, amount, &currency).await?;
        }

        Commands::Transfer { caller, id, to } => {
            commands::transfer(&mut ctx, &caller, &id, &to).await?;
        }

        Commands::List { party } => {
            commands::list(&ctx, party.as_deref()).await?;
        }

        Commands::Audit => {
            commands::audit(&ctx)?;
        }
    }

    Ok(())
}
