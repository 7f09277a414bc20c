//! Sitemap request handling.
//!
//! # Request States
//! ```text
//! ROUTE_MATCH → CACHE_LOOKUP → {HIT | STALE → REBUILD}
//!     → BUILD_DOCUMENT → FRESHNESS_CHECK → {304 | 200}
//! ```
//!
//! # Design Decisions
//! - Mounted as middleware so unmatched paths reach the host's own routes
//! - Documents are built per request (they may depend on the `Host` header);
//!   only routes and child lists are cached
//! - A leaf with no routes answers 404 and is evicted so the next request
//!   asks its supplier again

use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::cache::{IndexCache, PathMatch, RouteCache};
use crate::engine::SitemapEngine;
use crate::error::{SitemapError, SitemapResult};
use crate::http::freshness::{self, Validation};
use crate::http::request::request_id;
use crate::http::response::{self, CONTENT_TYPE_GZIP, CONTENT_TYPE_XML};
use crate::observability::metrics;
use crate::sitemap::{self, EtagOptions, RequestContext};

/// Serve registered sitemaps; pass every other request to `next`.
pub async fn sitemap_middleware(
    State(engine): State<SitemapEngine>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method();
    if method != Method::GET && method != Method::HEAD {
        return next.run(request).await;
    }
    let head = method == Method::HEAD;

    let path = request.uri().path().to_string();
    let (kind, result) = match engine.cache().match_path(&path) {
        PathMatch::Unmatched => return next.run(request).await,
        PathMatch::InvalidExtension => {
            tracing::debug!(path = %path, "Unsupported sitemap extension");
            metrics::record_request("leaf", 404);
            return response::not_found();
        }
        PathMatch::Leaf { cache, gzip } => (
            "leaf",
            serve_leaf(&engine, cache, gzip, head, request.headers()).await,
        ),
        PathMatch::Index { cache, gzip } => (
            "index",
            serve_index(&engine, cache, gzip, head, request.headers()).await,
        ),
    };

    let response = match result {
        Ok(response) => response,
        Err(error) => {
            tracing::warn!(
                request_id = %request_id(request.headers()),
                path = %path,
                error = %error,
                "Sitemap could not be generated"
            );
            error.into_response()
        }
    };
    metrics::record_request(kind, response.status().as_u16());
    response
}

async fn serve_leaf(
    engine: &SitemapEngine,
    cache: Arc<RouteCache>,
    gzip: bool,
    head: bool,
    headers: &HeaderMap,
) -> SitemapResult<Response> {
    let entry = cache.get().await?.into_entry();

    if entry.value.routes.is_empty() {
        cache.evict(&entry);
        tracing::debug!(path = %cache.path(), "Sitemap has no routes");
        return Ok(response::not_found());
    }

    let set = &entry.value;
    let xml = engine.builder().build_sitemap(
        &set.options,
        &set.routes,
        engine.base(),
        &RequestContext::from_headers(headers),
    )?;
    let response = respond(cache.path(), xml, gzip, head, set.options.etag.as_ref(), headers).await?;

    if let Some(owner) = cache.owner() {
        engine.refresh_queue().schedule(owner);
    }
    Ok(response)
}

async fn serve_index(
    engine: &SitemapEngine,
    cache: Arc<IndexCache>,
    gzip: bool,
    head: bool,
    headers: &HeaderMap,
) -> SitemapResult<Response> {
    let entry = engine.resolver().sync_children(&cache).await?;

    let descriptor = cache.descriptor();
    let xml = engine.builder().build_sitemap_index(
        descriptor,
        &entry.value.sitemaps,
        engine.base(),
        &RequestContext::from_headers(headers),
    )?;
    let response = respond(cache.path(), xml, gzip, head, descriptor.etag.as_ref(), headers).await?;

    engine.refresh_queue().schedule(cache.path());
    Ok(response)
}

async fn respond(
    path: &str,
    xml: Vec<u8>,
    gzip: bool,
    head: bool,
    etag: Option<&EtagOptions>,
    headers: &HeaderMap,
) -> SitemapResult<Response> {
    let (body, content_type) = if gzip {
        let compressed = tokio::task::spawn_blocking(move || sitemap::gzip(&xml))
            .await
            .map_err(|e| SitemapError::Task {
                path: path.to_string(),
                reason: e.to_string(),
            })??;
        (compressed, CONTENT_TYPE_GZIP)
    } else {
        (xml, CONTENT_TYPE_XML)
    };

    Ok(match freshness::validate(&body, etag, headers) {
        Validation::NotModified(etag) => response::not_modified(etag),
        Validation::Serve(etag) => response::document(body, content_type, etag, head),
    })
}
