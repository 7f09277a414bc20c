//! Route and child-sitemap sources.
//!
//! Static lists and async suppliers are folded into one abstraction at the
//! boundary, so the caches only ever call `fetch()`.

use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::BoxError;
use crate::sitemap::options::SitemapNodeOptions;
use crate::sitemap::route::{Route, RouteSpec};

/// An asynchronous producer of route specifications.
pub trait RouteSupplier: Send + Sync {
    fn fetch(&self) -> BoxFuture<'static, Result<Vec<RouteSpec>, BoxError>>;
}

impl<F, Fut> RouteSupplier for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<RouteSpec>, BoxError>> + Send + 'static,
{
    fn fetch(&self) -> BoxFuture<'static, Result<Vec<RouteSpec>, BoxError>> {
        Box::pin((self)())
    }
}

/// An asynchronous producer of child sitemap options for an index.
pub trait ChildSupplier: Send + Sync {
    fn fetch(&self) -> BoxFuture<'static, Result<Vec<SitemapNodeOptions>, BoxError>>;
}

impl<F, Fut> ChildSupplier for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<SitemapNodeOptions>, BoxError>> + Send + 'static,
{
    fn fetch(&self) -> BoxFuture<'static, Result<Vec<SitemapNodeOptions>, BoxError>> {
        Box::pin((self)())
    }
}

/// Where a leaf sitemap gets its routes from.
#[derive(Clone)]
pub enum RouteSource {
    Static(Arc<[RouteSpec]>),
    Supplier(Arc<dyn RouteSupplier>),
}

impl RouteSource {
    pub fn from_static<I, R>(routes: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RouteSpec>,
    {
        RouteSource::Static(routes.into_iter().map(Into::into).collect())
    }

    pub fn from_fn<F, Fut>(supplier: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<RouteSpec>, BoxError>> + Send + 'static,
    {
        RouteSource::Supplier(Arc::new(supplier))
    }

    /// Routes read from a text file (one URL per line) on every rebuild.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        RouteSource::Supplier(Arc::new(FileRoutes { path: path.into() }))
    }

    pub async fn fetch(&self) -> Result<Vec<RouteSpec>, BoxError> {
        match self {
            RouteSource::Static(routes) => Ok(routes.to_vec()),
            RouteSource::Supplier(supplier) => supplier.fetch().await,
        }
    }
}

impl Default for RouteSource {
    fn default() -> Self {
        RouteSource::Static(Arc::from(Vec::new()))
    }
}

impl fmt::Debug for RouteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteSource::Static(routes) => f.debug_tuple("Static").field(&routes.len()).finish(),
            RouteSource::Supplier(_) => f.write_str("Supplier(..)"),
        }
    }
}

/// Where a sitemap index gets its child sitemaps from.
#[derive(Clone)]
pub enum ChildSource {
    Static(Arc<[SitemapNodeOptions]>),
    Supplier(Arc<dyn ChildSupplier>),
}

impl ChildSource {
    pub fn from_static(children: Vec<SitemapNodeOptions>) -> Self {
        ChildSource::Static(children.into())
    }

    pub fn from_fn<F, Fut>(supplier: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<SitemapNodeOptions>, BoxError>> + Send + 'static,
    {
        ChildSource::Supplier(Arc::new(supplier))
    }

    pub async fn fetch(&self) -> Result<Vec<SitemapNodeOptions>, BoxError> {
        match self {
            ChildSource::Static(children) => Ok(children.to_vec()),
            ChildSource::Supplier(supplier) => supplier.fetch().await,
        }
    }
}

impl fmt::Debug for ChildSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildSource::Static(children) => {
                f.debug_tuple("Static").field(&children.len()).finish()
            }
            ChildSource::Supplier(_) => f.write_str("Supplier(..)"),
        }
    }
}

/// Input handed to a route filter.
pub struct FilterContext<'a> {
    /// Path of the sitemap being rebuilt.
    pub path: &'a str,
    pub routes: Vec<Route>,
}

/// Post-fetch filter applied before routes are cached.
pub type RouteFilter = Arc<dyn Fn(FilterContext<'_>) -> Vec<Route> + Send + Sync>;

/// Reads routes from a plain text file.
struct FileRoutes {
    path: PathBuf,
}

impl RouteSupplier for FileRoutes {
    fn fetch(&self) -> BoxFuture<'static, Result<Vec<RouteSpec>, BoxError>> {
        let path = self.path.clone();
        Box::pin(async move {
            let content = tokio::fs::read_to_string(&path).await?;
            Ok::<_, BoxError>(parse_route_lines(&content))
        })
    }
}

fn parse_route_lines(content: &str) -> Vec<RouteSpec> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(RouteSpec::from)
        .collect()
}
