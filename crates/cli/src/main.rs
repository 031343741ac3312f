mod commands;

use clap::{Parser, Subcommand};
use commands::migrate;
use tidemark_migrate::{init_logging, LoggingConfig, MigrateConfig};

#[derive(Parser)]
#[command(name = "tidemark")]
#[command(about = "Apply and revert ordered SQL migrations")]
#[command(version)]
struct Cli {
    /// Emit log lines as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new, empty migration
    Create {
        /// Migration name (words are joined into PascalCase)
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Apply all pending migrations
    Migrate,

    /// Revert the most recent migration
    Rollback {
        /// Revert every applied migration
        #[arg(short, long)]
        all: bool,
    },

    /// Show migration status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = MigrateConfig::from_env()?;
    init_logging(&LoggingConfig::cli(&config.log_level).with_json(cli.json_logs))
        .map_err(|e| anyhow::anyhow!(e))?;

    match cli.command {
        Commands::Create { name } => {
            migrate::create(&config, &name.join(" ")).await?;
        }
        Commands::Migrate => {
            migrate::run(&config).await?;
        }
        Commands::Rollback { all } => {
            migrate::rollback(&config, all).await?;
        }
        Commands::Status { json } => {
            migrate::status(&config, json).await?;
        }
    }

    Ok(())
}
