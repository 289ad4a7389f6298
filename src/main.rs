//! Lyceum - learning management system
//!
//! Command-line entry point: runs the HTTP API and a handful of
//! administrative commands against the same database.

mod cli;

use clap::{Parser, Subcommand};
use cli::{config::ConfigAction, courses::CourseAction, users::UserAction};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lyceum")]
#[command(about = "Learning management system with role-based access and gamified analytics", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level (RUST_LOG takes precedence when set)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Database path (overrides the configured path)
    #[arg(long, global = true, env = "LYCEUM_DB_PATH")]
    db_path: Option<String>,

    /// Configuration file (defaults to ./lyceum.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and apply migrations
    Init,

    /// Start the HTTP API server
    Serve {
        /// Listen address (overrides server.addr)
        #[arg(long)]
        addr: Option<String>,
    },

    /// Manage accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Inspect the course catalog
    Course {
        #[command(subcommand)]
        action: CourseAction,
    },

    /// Show statistics and leaderboard for a course
    Stats {
        /// Course id
        course_id: String,

        /// Leaderboard entries to show
        #[arg(short, long, default_value = "10")]
        top: usize,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn init_tracing(log_level: &str) {
    let level = match log_level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Lagged SSE subscribers are expected; keep broadcast noise down
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str().to_lowercase();
        EnvFilter::new(format!(
            "lyceum={level},lyceum_core={level},tower_http={level},tokio::sync::broadcast=error,tokio_stream=error"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    debug!("Lyceum v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = cli::helpers::load_config(cli.config.as_deref(), cli.db_path)?;

    match cli.command {
        Commands::Init => cli::init::handle(&config).await?,
        Commands::Serve { addr } => cli::serve::handle(&config, addr).await?,
        Commands::User { action } => cli::users::handle(action, &config).await?,
        Commands::Course { action } => cli::courses::handle(action, &config).await?,
        Commands::Stats { course_id, top } => cli::stats::handle(course_id, top, &config).await?,
        Commands::Config { action } => cli::config::handle(action, &config).await?,
    }
    Ok(())
}
