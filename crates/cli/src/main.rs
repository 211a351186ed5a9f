mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use commands::*;

#[derive(Parser)]
#[command(name = "migr8")]
#[command(about = "Fast database schema migrations for PostgreSQL, MySQL and SQLite")]
#[command(version)]
struct Cli {
    /// Config file (default: ./.migr8.yaml, then $HOME/.migr8.yaml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Database URL, overriding the configured connection
    #[arg(long, global = true, value_name = "URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migration operations
    Migrate {
        #[command(subcommand)]
        migrate_command: MigrateCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Apply pending migrations
    Up,

    /// Roll back applied migrations, most recent first
    Down {
        /// Number of migrations to roll back, or "all"
        #[arg(default_value = "1", value_parser = migrate::parse_steps)]
        steps: migrate::Steps,
    },

    /// Show which migrations are applied
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a new up/down migration pair
    Create {
        /// Migration name (e.g. "create users")
        name: String,
    },

    /// Compare checksums of applied migrations with the files on disk
    Verify,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a sample configuration file
    Init {
        /// Where to write the file
        #[arg(long, default_value = migr8_core::CONFIG_FILE_NAME)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the resolved configuration
    Show,

    /// Test the database connection
    Test,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let options = GlobalOptions {
        config: cli.config,
        verbose: cli.verbose,
        database_url: cli.database_url,
    };

    match cli.command {
        Commands::Migrate { migrate_command } => {
            let config = options.load_config()?;
            init_logging(config.verbose)?;

            match migrate_command {
                MigrateCommands::Up => migrate::up(&config).await?,
                MigrateCommands::Down { steps } => migrate::down(&config, steps).await?,
                MigrateCommands::Status { json } => migrate::status(&config, json).await?,
                MigrateCommands::Create { name } => migrate::create(&config, &name)?,
                MigrateCommands::Verify => migrate::verify(&config).await?,
            }
        }
        Commands::Config { config_command } => match config_command {
            ConfigCommands::Init { path, force } => {
                init_logging(options.verbose)?;
                config::init(&path, force)?;
            }
            ConfigCommands::Show => {
                let config = options.load_config()?;
                init_logging(config.verbose)?;
                config::show(&config);
            }
            ConfigCommands::Test => {
                let config = options.load_config()?;
                init_logging(config.verbose)?;
                config::test(&config).await?;
            }
        },
        Commands::Version => version::run(),
    }

    Ok(())
}
