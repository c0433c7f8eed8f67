use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tg_aggregator::config::LogFormat;
use tg_aggregator::{api, App, Config, Result};

#[derive(Parser)]
#[command(name = "tg-aggregator", version, about = "Telegram channel aggregator")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, env = "TG_AGGREGATOR_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Scrape one channel and exit
    Scrape {
        username: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Scrape every active channel and exit
    ScrapeAll {
        #[arg(long)]
        limit_per_channel: Option<usize>,
    },
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tg_aggregator=info,tower_http=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    init_logging(config.log_format);

    let app = App::new(config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(Arc::new(app)).await?,
        Command::Scrape { username, limit } => {
            let limit = app.scrape_limit(limit)?;
            let outcome = app.orchestrator.scrape_channel(&username, limit).await?;
            println!(
                "@{}: {} new posts from {} messages",
                username, outcome.new_posts, outcome.total_messages
            );
        }
        Command::ScrapeAll { limit_per_channel } => {
            let limit = app.scrape_limit(limit_per_channel)?;
            let results = app.orchestrator.scrape_all_channels(limit).await?;
            for (username, outcome) in &results {
                println!(
                    "@{}: {} new posts from {} messages",
                    username, outcome.new_posts, outcome.total_messages
                );
            }
            println!("Scraped {} channels", results.len());
        }
    }

    Ok(())
}

async fn serve(app: Arc<App>) -> Result<()> {
    let addr = app.config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, prefix = %app.config.api_prefix, "listening");

    axum::serve(listener, api::router(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
