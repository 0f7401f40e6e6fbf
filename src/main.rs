mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "rentsync")]
#[command(about = "Run rentsync subscription and calendar jobs against the configured datastore")]
struct Cli {
    /// Config file (defaults to ~/.config/rentsync/config.toml)
    #[arg(long, global = true, env = "RENTSYNC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Move lapsed subscriptions into grace period or expiry
    Lifecycle,
    /// Send due renewal reminders
    Reminders,
    /// Pull external iCal feeds into locked dates
    Sync {
        /// Sync only this subscription
        #[arg(short, long)]
        subscription: Option<Uuid>,
    },
    /// Render a property's outbound iCal feed
    Feed {
        /// Feed token of the property
        token: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rentsync=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let ctx = commands::Context::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Lifecycle => commands::lifecycle::run(&ctx).await,
        Commands::Reminders => commands::reminders::run(&ctx).await,
        Commands::Sync { subscription } => commands::sync::run(&ctx, subscription).await,
        Commands::Feed { token, output } => {
            commands::feed::run(&ctx, &token, output.as_deref()).await
        }
    }
}
