//! Background refresh of sitemap indexes after they were served.
//!
//! Requests only enqueue a path; the worker resolves it off the request path
//! so a slow child-list supplier never delays a response.

use dashmap::DashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::observability::metrics;
use crate::registry::resolver::Resolver;

/// Sending half of the refresh queue, held by the engine.
#[derive(Debug, Clone)]
pub struct RefreshQueue {
    tx: mpsc::UnboundedSender<String>,
    pending: Arc<DashSet<String>>,
}

impl RefreshQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Self {
            tx,
            pending: Arc::new(DashSet::new()),
        };
        (queue, rx)
    }

    /// Queue a refresh of `path`. Returns false if one is already pending.
    pub fn schedule(&self, path: &str) -> bool {
        if !self.pending.insert(path.to_string()) {
            return false;
        }
        if self.tx.send(path.to_string()).is_err() {
            self.pending.remove(path);
            tracing::debug!(path, "Refresh worker stopped, dropping refresh");
            return false;
        }
        true
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Consumes the refresh queue until every sender is dropped.
pub struct RefreshWorker {
    resolver: Arc<Resolver>,
    rx: mpsc::UnboundedReceiver<String>,
    pending: Arc<DashSet<String>>,
}

impl RefreshWorker {
    pub fn new(
        resolver: Arc<Resolver>,
        queue: &RefreshQueue,
        rx: mpsc::UnboundedReceiver<String>,
    ) -> Self {
        Self {
            resolver,
            rx,
            pending: queue.pending.clone(),
        }
    }

    pub async fn run(mut self) {
        tracing::debug!("Refresh worker started");

        while let Some(path) = self.rx.recv().await {
            self.pending.remove(&path);
            if let Err(error) = self.resolver.refresh(&path).await {
                metrics::record_refresh_failure();
                tracing::warn!(path = %path, error = %error, "Background refresh failed");
            }
        }

        tracing::debug!("Refresh worker stopped");
    }
}
