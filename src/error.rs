//! Engine error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Boxed error returned by route and child-sitemap suppliers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for engine operations.
pub type SitemapResult<T> = Result<T, SitemapError>;

/// Errors produced while registering, rebuilding or serving sitemaps.
#[derive(Debug, thiserror::Error)]
pub enum SitemapError {
    /// A route or child-sitemap supplier failed.
    #[error("supplier for {path} failed: {source}")]
    Supplier {
        path: String,
        #[source]
        source: BoxError,
    },

    /// Descriptor options could not be normalized.
    #[error("invalid sitemap configuration: {0}")]
    Config(String),

    /// Sitemaps nested deeper than the resolver accepts.
    #[error("sitemap {path} nested too deep (depth {depth})")]
    TooDeep { path: String, depth: usize },

    /// A custom [`DocumentBuilder`](crate::sitemap::DocumentBuilder) could
    /// not produce a document. The default XML builder never fails.
    #[error("failed to build document for {path}: {reason}")]
    Build { path: String, reason: String },

    /// Gzip compression failed.
    #[error("gzip compression failed: {0}")]
    Compression(#[from] std::io::Error),

    /// A detached rebuild task panicked or was cancelled.
    #[error("rebuild task for {path} aborted: {reason}")]
    Task { path: String, reason: String },
}

impl SitemapError {
    pub fn supplier(path: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Supplier {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn build(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Build {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl IntoResponse for SitemapError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Sitemap request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate sitemap").into_response()
    }
}
