//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the sitemap middleware
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve on a listener until shutdown
//! - Apply configuration updates by reloading the sitemap tree

use axum::middleware;
use axum::Router;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::engine::SitemapEngine;
use crate::http::handler::sitemap_middleware;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::response;

/// HTTP server for the sitemap engine.
pub struct HttpServer {
    router: Router,
    engine: SitemapEngine,
}

impl HttpServer {
    /// Create a server for an engine that already has its sitemaps registered.
    pub fn new(config: ServerConfig, engine: SitemapEngine) -> Self {
        let router = build_router(&config, engine.clone());
        Self {
            router,
            engine,
        }
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Every config received on `config_updates` replaces the registered
    /// sitemaps; listener and timeout settings need a restart.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ServerConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            sitemaps = self.engine.cache().len(),
            "HTTP server starting"
        );

        let engine = self.engine.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match engine.reload(config.sitemap_options()).await {
                    Ok(()) => tracing::info!("Sitemap configuration reloaded"),
                    Err(error) => {
                        tracing::error!(error = %error, "Sitemap reload failed");
                    }
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
///
/// Requests that match no registered sitemap fall through to a 404.
#[allow(deprecated)]
pub fn build_router(config: &ServerConfig, engine: SitemapEngine) -> Router {
    Router::new()
        .fallback(|| async { response::not_found() })
        .layer(middleware::from_fn_with_state(engine, sitemap_middleware))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(set_request_id_layer())
}
