//! Config-driven registration and reloads.

use axum::http::StatusCode;
use std::io::Write;

use sitemap_server::config::{load_config, parse_config};
use sitemap_server::{build_router, EngineSettings, SitemapEngine};

mod common;

use common::get;

const CONFIG: &str = r#"
[server]
base = "/"

[[sitemaps]]
path = "/sitemap.xml"
hostname = "https://example.com/"
routes = ["/a", { url = "/b", priority = 0.5, changefreq = "daily" }]
gzip = true

[[sitemaps]]
path = "/sitemapindex.xml"
hostname = "https://example.com/"

[[sitemaps.sitemaps]]
path = "/sitemap-foo.xml"
routes = ["/foo/1"]
"#;

#[tokio::test]
async fn test_config_file_drives_router() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("routes.txt"), "# products\n/p/1\n/p/2\n\n/p/3\n").unwrap();
    let path = dir.path().join("sitemaps.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"
[[sitemaps]]
path = "/sitemap-products.xml"
hostname = "https://example.com/"
routes_file = "routes.txt"
"#
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    let engine = SitemapEngine::new(EngineSettings::from_config(&config));
    engine.register(config.sitemap_options()).await.unwrap();
    let app = build_router(&config, engine);

    let res = get(&app, "/sitemap-products.xml").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.url_count(), 3);
    assert!(res.text().contains("<loc>https://example.com/p/3</loc>"));
    assert!(res.header("x-request-id").is_some());

    assert_eq!(get(&app, "/missing").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_config_tree_served() {
    let config = parse_config(CONFIG).unwrap();
    let engine = SitemapEngine::new(EngineSettings::from_config(&config));
    engine.register(config.sitemap_options()).await.unwrap();
    let app = build_router(&config, engine);

    let leaf = get(&app, "/sitemap.xml").await.text();
    assert!(leaf.contains("<priority>0.5</priority>"));
    assert!(leaf.contains("<changefreq>daily</changefreq>"));
    assert_eq!(get(&app, "/sitemap.xml.gz").await.status, StatusCode::OK);

    let index = get(&app, "/sitemapindex.xml").await.text();
    assert!(index.contains("<loc>https://example.com/sitemap-foo.xml</loc>"));
    assert_eq!(get(&app, "/sitemap-foo.xml").await.url_count(), 1);
}

#[tokio::test]
async fn test_reregistration_is_idempotent() {
    let config = parse_config(CONFIG).unwrap();
    let engine = SitemapEngine::new(EngineSettings::from_config(&config));
    let app = build_router(&config, engine.clone());

    engine.register(config.sitemap_options()).await.unwrap();
    let paths = engine.cache().paths();
    let first = get(&app, "/sitemap.xml").await;

    engine.register(config.sitemap_options()).await.unwrap();
    assert_eq!(engine.cache().paths(), paths);
    let second = get(&app, "/sitemap.xml").await;
    assert_eq!(first.body, second.body);
    assert_eq!(first.header("etag"), second.header("etag"));
}

#[tokio::test]
async fn test_reload_drops_removed_sitemaps() {
    let config = parse_config(CONFIG).unwrap();
    let engine = SitemapEngine::new(EngineSettings::from_config(&config));
    engine.register(config.sitemap_options()).await.unwrap();
    let app = build_router(&config, engine.clone());
    assert_eq!(get(&app, "/sitemap-foo.xml").await.status, StatusCode::OK);

    let reduced = parse_config(
        r#"
[[sitemaps]]
path = "/sitemap.xml"
routes = ["/only"]
"#,
    )
    .unwrap();
    engine.reload(reduced.sitemap_options()).await.unwrap();

    assert_eq!(engine.cache().paths(), vec!["/sitemap.xml"]);
    assert_eq!(get(&app, "/sitemapindex.xml").await.status, StatusCode::NOT_FOUND);
    assert_eq!(get(&app, "/sitemap-foo.xml").await.status, StatusCode::NOT_FOUND);
    assert_eq!(get(&app, "/sitemap.xml").await.url_count(), 1);
}

#[tokio::test]
async fn test_reload_swaps_static_index_children() {
    let config = parse_config(CONFIG).unwrap();
    let engine = SitemapEngine::new(EngineSettings::from_config(&config));
    engine.register(config.sitemap_options()).await.unwrap();
    let app = build_router(&config, engine.clone());
    assert_eq!(get(&app, "/sitemap-foo.xml").await.status, StatusCode::OK);

    let updated = parse_config(&CONFIG.replace("/sitemap-foo.xml", "/sitemap-bar.xml")).unwrap();
    engine.reload(updated.sitemap_options()).await.unwrap();

    assert!(!engine.cache().contains("/sitemap-foo.xml"));
    assert_eq!(get(&app, "/sitemap-foo.xml").await.status, StatusCode::NOT_FOUND);
    assert_eq!(get(&app, "/sitemap-bar.xml").await.url_count(), 1);

    let index = get(&app, "/sitemapindex.xml").await.text();
    assert!(index.contains("<loc>https://example.com/sitemap-bar.xml</loc>"));
    assert!(!index.contains("sitemap-foo.xml"));
}
