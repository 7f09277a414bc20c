//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::routing;
use axum::{middleware, Router};
use flate2::read::GzDecoder;
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use sitemap_server::{BoxError, EngineSettings, RouteSource, RouteSpec, SitemapEngine};

pub const HOSTNAME: &str = "https://example.com/";

/// Buffered response of a test request.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn url_count(&self) -> usize {
        self.text().matches("<url>").count()
    }
}

pub fn engine() -> SitemapEngine {
    SitemapEngine::new(EngineSettings::default())
}

/// Host application with its own `/robots.txt` route and the sitemap middleware.
pub fn app(engine: SitemapEngine) -> Router {
    Router::new()
        .route("/robots.txt", routing::get(|| async { "User-agent: *\n" }))
        .layer(middleware::from_fn_with_state(
            engine,
            sitemap_server::sitemap_middleware,
        ))
}

pub async fn send(app: &Router, method: Method, path: &str, headers: &[(&str, &str)]) -> TestResponse {
    let mut request = Request::builder().method(method).uri(path);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let response = app
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    TestResponse {
        status,
        headers,
        body: body.to_vec(),
    }
}

pub async fn get(app: &Router, path: &str) -> TestResponse {
    send(app, Method::GET, path, &[]).await
}

/// Route source that counts its invocations.
pub fn counting_routes(calls: Arc<AtomicUsize>, routes: &'static [&'static str]) -> RouteSource {
    RouteSource::from_fn(move || {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BoxError>(routes.iter().map(|r| RouteSpec::from(*r)).collect::<Vec<_>>())
        }
    })
}

/// Route source whose responses are scripted per call; the last one repeats.
pub fn scripted_routes(
    script: Vec<Result<Vec<&'static str>, &'static str>>,
) -> (RouteSource, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = calls.clone();
    let script = Arc::new(script);
    let source = RouteSource::from_fn(move || {
        let call = c.fetch_add(1, Ordering::SeqCst);
        let step = script[call.min(script.len() - 1)].clone();
        async move {
            let routes = step.map_err(BoxError::from)?;
            Ok::<_, BoxError>(routes.into_iter().map(RouteSpec::from).collect::<Vec<_>>())
        }
    });
    (source, calls)
}

pub fn gunzip(bytes: &[u8]) -> Vec<u8> {
    let mut decoded = Vec::new();
    GzDecoder::new(bytes).read_to_end(&mut decoded).unwrap();
    decoded
}

/// Wait until `condition` holds, for at most one second.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
