//! Heart-disease risk CLI.
//!
//! Retrains the risk model from the baseline dataset plus clinician
//! feedback, scores individual records and collects new feedback.

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use database::create_pool;
use heart_risk::commands::{self, RecordArgs};
use tracing_subscriber::EnvFilter;

/// Heart-disease risk model
#[derive(Parser)]
#[command(name = "heart-risk")]
#[command(about = "Feedback-driven retraining and prediction for heart-disease risk")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge feedback into the baseline, retrain and promote the best model
    Retrain {
        /// Train on the baseline CSV only, without touching the database
        #[arg(long)]
        offline: bool,

        /// Use small ensembles and a short search
        #[arg(long)]
        quick: bool,
    },

    /// Predict heart-disease risk for one record
    Predict {
        #[command(flatten)]
        record: RecordArgs,
    },

    /// Store a clinician-confirmed diagnosis
    Feedback {
        #[command(flatten)]
        record: RecordArgs,

        /// Confirmed diagnosis: 0 = no heart disease, 1 = heart disease
        #[arg(long)]
        diagnosis: i64,
    },

    /// Run database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;

    match cli.command {
        Commands::Retrain { offline, quick } => {
            if offline {
                commands::retrain::run(&config, None, quick).await?;
            } else {
                let pool = create_pool(config.database_url()?).await?;
                commands::retrain::run(&config, Some(&pool), quick).await?;
            }
        }
        Commands::Predict { record } => {
            commands::predict::run(&config, &record).await?;
        }
        Commands::Feedback { record, diagnosis } => {
            let pool = create_pool(config.database_url()?).await?;
            commands::feedback::run(&pool, &record, diagnosis).await?;
        }
        Commands::Migrate => {
            let pool = create_pool(config.database_url()?).await?;
            commands::migrate::run(&pool).await?;
        }
    }

    Ok(())
}
