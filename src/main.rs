use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use rotator_engine::cli::commands;
use rotator_engine::config::Config;

#[derive(Parser)]
#[command(name = "rotator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine's tick loop
    Start {
        /// Compute decisions without submitting orders
        #[arg(long)]
        dry_run: bool,
    },

    /// Show current positions and P&L
    Status,

    /// Show the loaded configuration (secrets masked)
    Config,

    /// Check connectivity to the store and external collaborators
    Health,

    /// Show the scout queue's pending and in-progress rows
    Scout {
        #[command(subcommand)]
        action: ScoutAction,
    },

    /// Evaluate the rotation cascade without executing the chosen action
    Rotate {
        #[command(subcommand)]
        action: RotateAction,
    },

    /// Force-close a single position outside the rotation cascade
    Close {
        /// Token mint address
        mint: String,
    },
}

#[derive(Subcommand)]
enum ScoutAction {
    /// Print the scout queue
    Status,
}

#[derive(Subcommand)]
enum RotateAction {
    /// Evaluate but do not execute
    DryRun,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("rotator_engine=info".parse().unwrap()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Start { dry_run } => commands::start(&config, dry_run).await,
        Commands::Status => commands::status(&config).await,
        Commands::Config => commands::show_config(&config),
        Commands::Health => commands::health(&config).await,
        Commands::Scout { action } => match action {
            ScoutAction::Status => commands::scout_status(&config).await,
        },
        Commands::Rotate { action } => match action {
            RotateAction::DryRun => commands::rotate_dry_run(&config).await,
        },
        Commands::Close { mint } => commands::close_position(&config, &mint).await,
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
