//! Cached sitemap and sitemap-index serving engine.
//!
//! Sitemaps are registered on a [`SitemapEngine`] from code or from a TOML
//! config file, and served by an Axum middleware that builds `sitemap.xml`
//! (and `sitemap.xml.gz`) documents from TTL-cached route lists.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod sitemap;

pub use config::schema::ServerConfig;
pub use engine::{EngineSettings, SitemapEngine};
pub use error::{BoxError, SitemapError, SitemapResult};
pub use http::{build_router, sitemap_middleware, HttpServer};
pub use lifecycle::Shutdown;
pub use sitemap::{
    ChildSource, DocumentBuilder, EtagOptions, EtagSetting, Route, RouteSource, RouteSpec,
    SitemapIndexOptions, SitemapNodeOptions, SitemapOptions,
};
