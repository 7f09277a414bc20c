//! Sitemap index serving and child registration.

use axum::http::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sitemap_server::{
    BoxError, ChildSource, RouteSource, SitemapIndexOptions, SitemapNodeOptions, SitemapOptions,
};

mod common;

use common::{app, engine, get, HOSTNAME};

fn child(path: &str, routes: &'static [&'static str]) -> SitemapNodeOptions {
    SitemapOptions::new(path)
        .with_routes(RouteSource::from_static(routes.iter().copied()))
        .into()
}

#[tokio::test]
async fn test_index_lists_children_served_independently() {
    let engine = engine();
    engine
        .register([SitemapIndexOptions::new(
            "/sitemapindex.xml",
            ChildSource::from_static(vec![
                child("/sitemap-foo.xml", &["/foo/1", "/foo/2"]),
                child("/sitemap-bar.xml", &["/bar/1"]),
            ]),
        )
        .with_hostname(HOSTNAME)])
        .await
        .unwrap();
    let app = app(engine);

    let index = get(&app, "/sitemapindex.xml").await;
    assert_eq!(index.status, StatusCode::OK);
    assert_eq!(index.header("content-type"), Some("application/xml"));
    let xml = index.text();
    assert_eq!(xml.matches("<sitemap>").count(), 2);
    assert!(xml.contains("<loc>https://example.com/sitemap-foo.xml</loc>"));
    assert!(xml.contains("<loc>https://example.com/sitemap-bar.xml</loc>"));

    let foo = get(&app, "/sitemap-foo.xml").await;
    assert_eq!(foo.status, StatusCode::OK);
    assert_eq!(foo.url_count(), 2);
    // Hostname inherited from the index.
    assert!(foo.text().contains("<loc>https://example.com/foo/1</loc>"));

    assert_eq!(get(&app, "/sitemap-bar.xml").await.url_count(), 1);
}

#[tokio::test]
async fn test_async_child_list() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = calls.clone();
    let engine = engine();
    engine
        .register([SitemapIndexOptions::new(
            "/sitemapindex.xml",
            ChildSource::from_fn(move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok::<_, BoxError>(vec![
                        child("/sitemap-foo.xml", &["/foo"]),
                        child("/sitemap-bar.xml", &["/bar"]),
                    ])
                }
            }),
        )])
        .await
        .unwrap();
    let app = app(engine);

    assert_eq!(get(&app, "/sitemapindex.xml").await.text().matches("<sitemap>").count(), 2);
    assert_eq!(get(&app, "/sitemap-foo.xml").await.status, StatusCode::OK);
    assert_eq!(get(&app, "/sitemap-bar.xml").await.status, StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_gzip_children_linked_as_gz() {
    let engine = engine();
    engine
        .register([SitemapIndexOptions::new(
            "/sitemapindex.xml",
            ChildSource::from_static(vec![child("/sitemap-foo.xml", &["/foo"])]),
        )
        .with_hostname(HOSTNAME)
        .with_gzip(true)])
        .await
        .unwrap();
    let app = app(engine);

    let index = get(&app, "/sitemapindex.xml.gz").await;
    assert_eq!(index.header("content-type"), Some("application/gzip"));
    let xml = String::from_utf8(common::gunzip(&index.body)).unwrap();
    assert!(xml.contains("<loc>https://example.com/sitemap-foo.xml.gz</loc>"));

    let foo = get(&app, "/sitemap-foo.xml.gz").await;
    assert_eq!(foo.status, StatusCode::OK);
    assert_eq!(foo.header("content-type"), Some("application/gzip"));
}

#[tokio::test]
async fn test_children_replaced_after_index_rebuild() {
    let round = Arc::new(AtomicUsize::new(0));
    let r = round.clone();
    let engine = engine();
    engine
        .register([SitemapIndexOptions::new(
            "/sitemapindex.xml",
            ChildSource::from_fn(move || {
                let first = r.fetch_add(1, Ordering::SeqCst) == 0;
                async move {
                    let children = if first {
                        vec![child("/sitemap-old.xml", &["/old"])]
                    } else {
                        vec![child("/sitemap-new.xml", &["/new"])]
                    };
                    Ok::<_, BoxError>(children)
                }
            }),
        )
        .with_cache_time(Duration::from_millis(20))])
        .await
        .unwrap();
    let app = app(engine.clone());

    assert_eq!(get(&app, "/sitemap-old.xml").await.status, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(40)).await;
    let index = get(&app, "/sitemapindex.xml").await.text();
    assert!(index.contains("/sitemap-new.xml"));
    assert!(!index.contains("/sitemap-old.xml"));

    assert_eq!(get(&app, "/sitemap-new.xml").await.status, StatusCode::OK);
    assert_eq!(get(&app, "/sitemap-old.xml").await.status, StatusCode::NOT_FOUND);
    assert!(!engine.cache().contains("/sitemap-old.xml"));
}

#[tokio::test]
async fn test_serving_child_refreshes_owner_in_background() {
    let round = Arc::new(AtomicUsize::new(0));
    let r = round.clone();
    let engine = engine();
    engine
        .register([SitemapIndexOptions::new(
            "/sitemapindex.xml",
            ChildSource::from_fn(move || {
                let first = r.fetch_add(1, Ordering::SeqCst) == 0;
                async move {
                    let mut children = vec![child("/sitemap-foo.xml", &["/foo"])];
                    if !first {
                        children.push(child("/sitemap-bar.xml", &["/bar"]));
                    }
                    Ok::<_, BoxError>(children)
                }
            }),
        )
        .with_cache_time(Duration::from_millis(20))])
        .await
        .unwrap();
    let app = app(engine.clone());

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(get(&app, "/sitemap-foo.xml").await.status, StatusCode::OK);

    let cache = engine.cache().clone();
    assert!(common::eventually(|| cache.contains("/sitemap-bar.xml")).await);
    assert_eq!(round.load(Ordering::SeqCst), 2);
}
