mod artifact;
mod bus;
mod config;
mod filter;
mod hub;
mod models;
mod pipeline;
mod scheduler;
mod scraper;
mod server;
mod state;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::artifact::ArtifactWriter;
use crate::config::AppConfig;
use crate::hub::Hub;
use crate::pipeline::Pipeline;
use crate::scheduler::Scheduler;
use crate::scraper::ThirtyTwoScraper;
use crate::server::AppState;

#[derive(Parser)]
#[command(name = "bidwatch", about = "Auction inventory monitor", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Run the refresh scheduler and the control-surface HTTP server
    Serve {
        /// Override the configured bind address
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Run a single scrape cycle and exit
    Once,

    /// Print the effective configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "bidwatch=info,warn",
        1 => "bidwatch=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Serve { bind } => {
            let addr: SocketAddr = match bind {
                Some(addr) => addr,
                None => config
                    .server
                    .bind
                    .parse()
                    .with_context(|| format!("Invalid bind address {:?}", config.server.bind))?,
            };

            let hub = Hub::new(config.refresh.interval_secs);
            hub.log("⏳ Starting auction inventory watch service...");

            let pipeline = build_pipeline(&hub, &config)?;
            let scheduler = Scheduler::new(hub.clone(), pipeline, config.refresh.interval_secs);
            tokio::spawn(scheduler.run());

            server::serve(
                addr,
                AppState {
                    hub,
                    artifact_path: config.output.path.clone(),
                    keepalive_secs: config.server.keepalive_secs,
                },
            )
            .await?;
        }

        Command::Once => {
            let _t = utils::Timer::start("Single scrape cycle");
            let hub = Hub::new(config.refresh.interval_secs);
            let pipeline = build_pipeline(&hub, &config)?;
            let stats = pipeline.run_once().await;
            info!(
                "Done: {} scraped, {} kept, {} filtered, total {}",
                stats.items_scraped, stats.items_kept, stats.items_filtered, stats.total_raised
            );
        }

        Command::Check => {
            println!("─────────────────────────────────");
            println!("  bidwatch — Effective Config");
            println!("─────────────────────────────────");
            println!("  Listing URL : {}", config.scraper.listing_url);
            println!("  Summary URL : {}", config.scraper.summary_url);
            println!("  Interval    : {}s", config.refresh.interval_secs);
            println!("  Bind        : {}", config.server.bind);
            println!("  Keep-alive  : {}s", config.server.keepalive_secs);
            println!("  Artifact    : {:?}", config.output.path);
            println!("  Max pages   : {}", config.scraper.max_pages);
            println!("─────────────────────────────────");
        }
    }

    Ok(())
}

fn build_pipeline(hub: &Hub, config: &AppConfig) -> Result<Pipeline> {
    let scraper = ThirtyTwoScraper::new(&config.scraper).context("Failed to build scraper")?;
    let source_url = scraper.listing_url().to_string();
    Ok(Pipeline::new(
        hub.clone(),
        Arc::new(scraper),
        ArtifactWriter::new(config.output.path.clone()),
        source_url,
    ))
}
