//! movie-ingest CLI
//!
//! Embeds the overview of every movie in `imdb_top_1000.csv` and upserts the
//! rows into a Couchbase collection.
//!
//! Commands:
//!   ingest - Run the full ingestion (default)
//!   check  - Verify configuration, cluster access and dataset without writing

mod commands;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use movie_ingest::{load_env_file, telemetry, Config, MOVIES_DATASET};

#[derive(Parser)]
#[command(name = "movie-ingest")]
#[command(about = "Embed movie overviews and load them into Couchbase")]
#[command(version)]
struct Cli {
    /// Env file to load (defaults to ./.env when present)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed every row and upsert it into the collection
    Ingest,

    /// Check config, cluster access and dataset without embedding or writing
    Check,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    let dataset = Path::new(MOVIES_DATASET);
    match cli.command {
        None | Some(Commands::Ingest) => commands::run_ingest(&config, dataset).await?,
        Some(Commands::Check) => commands::run_check(&config, dataset).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    // RUST_LOG may come from the env file
    let env_file = load_env_file(cli.env_file.as_deref());
    telemetry::init(cli.verbose);

    let result = match env_file {
        Ok(()) => run(cli).await,
        Err(e) => Err(e.into()),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Error while ingesting data: {e:#}");
            ExitCode::FAILURE
        }
    }
}
