use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsbot_core::{storage::Database, AppConfig};

mod commands;

#[derive(Parser)]
#[command(name = "newsbot")]
#[command(author, version, about = "Posts feed articles with AI summaries to a Telegram channel")]
struct Cli {
    /// Config file (default: ~/.config/newsbot/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the fetcher and notifier until interrupted
    Run,
    /// Fetch all sources once
    Fetch,
    /// Send the oldest unposted article once
    Send,
    /// Manage feed sources
    Source {
        #[command(subcommand)]
        action: SourceAction,
    },
    /// Show source and article counts
    Status,
}

#[derive(Subcommand)]
enum SourceAction {
    /// Add an RSS/Atom feed
    Add {
        /// Unique name for the source
        #[arg(short, long)]
        name: String,
        /// Feed URL
        #[arg(short, long)]
        url: String,
    },
    /// List all sources
    List,
    /// Remove a source and its articles
    Remove {
        /// Name of the source to remove
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let db = Database::new(&config).await?;

    match cli.command {
        Commands::Run => commands::run::run(&db, &config).await,
        Commands::Fetch => commands::fetch::run(&db, &config).await,
        Commands::Send => commands::send::run(&db, &config).await,
        Commands::Source { action } => match action {
            SourceAction::Add { name, url } => commands::source::add(&db, &name, &url).await,
            SourceAction::List => commands::source::list(&db).await,
            SourceAction::Remove { name } => commands::source::remove(&db, &name).await,
        },
        Commands::Status => commands::status::run(&db, &config).await,
    }
}
