use anyhow::Result;
use clap::{Parser, Subcommand};
use ocn_ledger::Amount;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "ocn")]
#[command(about = "Off-chain node: registration & stake reconciliation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env overrides -> local...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Load, parse and validate the node config without touching the ledger.
    Validate {
        /// Layered config paths in merge order. Falls back to OCN_CONFIG_JSON / OCN_CONFIG_FILE_PATH.
        #[arg(long = "config")]
        config_paths: Vec<String>,
    },

    /// Run one reconciliation pass over every configured worker and reputer.
    /// Exits non-zero if any tuple did not converge.
    Reconcile {
        /// Layered config paths in merge order. Falls back to OCN_CONFIG_JSON / OCN_CONFIG_FILE_PATH.
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Reconcile against an in-memory paper ledger instead of the network.
        #[arg(long, default_value_t = false)]
        paper: bool,

        /// Paper mode: starting balance of the node's address (base units).
        #[arg(long, default_value = "0", requires = "paper")]
        paper_balance: Amount,

        /// Paper mode: registration fee (base units).
        #[arg(long, default_value = "0", requires = "paper")]
        paper_fee: Amount,

        /// Print the pass report as one JSON document instead of key=value lines.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Optional dev convenience; absence is not an error. Neither file
    // overrides a variable that is already set, so `.env.local` wins.
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => commands::config::config_hash(&paths)?,

        Commands::Validate { config_paths } => commands::config::validate(&config_paths)?,

        Commands::Reconcile {
            config_paths,
            paper,
            paper_balance,
            paper_fee,
            json,
        } => {
            let ledger = if paper {
                commands::reconcile::LedgerMode::Paper {
                    balance: paper_balance,
                    registration_fee: paper_fee,
                }
            } else {
                commands::reconcile::LedgerMode::Live
            };
            commands::reconcile::reconcile(&config_paths, ledger, json).await?
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
}
