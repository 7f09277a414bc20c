//! Sitemap server.
//!
//! ```text
//!   Client ──▶ TraceLayer / request ID / timeout
//!                 │
//!                 ▼
//!          sitemap middleware ──▶ path table ──▶ TTL caches ──▶ route / child suppliers
//!                 │                                  ▲
//!                 ▼                                  │
//!          XML builder + gzip ──▶ ETag / 304   refresh worker
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use sitemap_server::config::{load_config, ConfigWatcher};
use sitemap_server::lifecycle::signals::spawn_signal_handler;
use sitemap_server::observability::{logging, metrics};
use sitemap_server::{EngineSettings, HttpServer, Shutdown, SitemapEngine};

#[derive(Debug, Parser)]
#[command(name = "sitemap-server", version, about = "Serve cached sitemaps from a TOML config")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Reload the sitemaps whenever the config file changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init(&config.observability.log_level);
    tracing::info!(
        config = ?args.config,
        bind_address = %config.listener.bind_address,
        sitemaps = config.sitemaps.len(),
        "sitemap-server v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let engine = SitemapEngine::new(EngineSettings::from_config(&config));
    engine.register(config.sitemap_options()).await?;

    // The watcher handle must outlive the server.
    let (_watcher, config_updates) = if args.watch {
        let (watcher, updates) = ConfigWatcher::new(&args.config);
        (Some(watcher.run()?), updates)
    } else {
        let (_, updates) = mpsc::unbounded_channel();
        (None, updates)
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config, engine);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
