//! Sitemap options and their normalized descriptors.
//!
//! # Data Flow
//! ```text
//! SitemapNodeOptions (user / config supplied, fields optional)
//!     → normalize(parent)   defaults + inheritance from the parent index
//!     → SitemapNode::{Leaf, Index} (immutable, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - Leaf vs index is decided once, by the variant, never re-inferred
//! - Child sitemaps inherit hostname, gzip, ETag and stylesheet settings
//!   from their direct parent index unless they set their own
//! - Descriptors are immutable; a changed configuration produces new ones

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{SitemapError, SitemapResult};
use crate::sitemap::route::{Route, RouteDefaults};
use crate::sitemap::source::{ChildSource, FilterContext, RouteFilter, RouteSource};

/// Default TTL of a cached route list or child list.
pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(15 * 60);

/// Namespace attribute written on the root element.
pub const DEFAULT_XML_NS: &str = r#"xmlns="http://www.sitemaps.org/schemas/sitemap/0.9""#;

pub const DEFAULT_SITEMAP_PATH: &str = "/sitemap.xml";
pub const DEFAULT_SITEMAP_INDEX_PATH: &str = "/sitemapindex.xml";

/// Custom ETag function. The returned string is used verbatim as the header.
pub type EtagHasher = Arc<dyn Fn(&[u8]) -> String + Send + Sync>;

/// ETag strategy for a sitemap endpoint.
#[derive(Clone, Default)]
pub struct EtagOptions {
    /// Emit weak validators (`W/"..."`).
    pub weak: bool,
    pub hash: Option<EtagHasher>,
}

impl fmt::Debug for EtagOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EtagOptions")
            .field("weak", &self.weak)
            .field("hash", &self.hash.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Explicit ETag choice; absent means "inherit or default".
#[derive(Clone, Debug)]
pub enum EtagSetting {
    Disabled,
    Enabled(EtagOptions),
}

impl EtagSetting {
    fn into_options(self) -> Option<EtagOptions> {
        match self {
            EtagSetting::Disabled => None,
            EtagSetting::Enabled(options) => Some(options),
        }
    }
}

/// Options for a leaf sitemap as supplied by the host.
#[derive(Clone, Default)]
pub struct SitemapOptions {
    /// Served path, e.g. `/sitemap.xml`. Required for child sitemaps.
    pub path: Option<String>,
    pub hostname: Option<String>,
    pub routes: RouteSource,
    /// Glob patterns removed from the route list.
    pub exclude: Vec<String>,
    pub filter: Option<RouteFilter>,
    pub defaults: Option<RouteDefaults>,
    pub trailing_slash: Option<bool>,
    pub xml_ns: Option<String>,
    pub xsl_url: Option<String>,
    /// Lastmod advertised for this sitemap in its parent index.
    pub lastmod: Option<String>,
    pub cache_time: Option<Duration>,
    pub gzip: Option<bool>,
    pub etag: Option<EtagSetting>,
}

impl SitemapOptions {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn with_routes(mut self, routes: RouteSource) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = Some(gzip);
        self
    }

    pub fn with_cache_time(mut self, ttl: Duration) -> Self {
        self.cache_time = Some(ttl);
        self
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(FilterContext<'_>) -> Vec<Route> + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_etag(mut self, etag: EtagSetting) -> Self {
        self.etag = Some(etag);
        self
    }
}

/// Options for a sitemap index as supplied by the host.
#[derive(Clone)]
pub struct SitemapIndexOptions {
    pub path: Option<String>,
    pub hostname: Option<String>,
    pub sitemaps: ChildSource,
    pub lastmod: Option<String>,
    pub xml_ns: Option<String>,
    pub xsl_url: Option<String>,
    pub cache_time: Option<Duration>,
    pub gzip: Option<bool>,
    pub etag: Option<EtagSetting>,
}

impl SitemapIndexOptions {
    pub fn new(path: impl Into<String>, sitemaps: ChildSource) -> Self {
        Self {
            path: Some(path.into()),
            hostname: None,
            sitemaps,
            lastmod: None,
            xml_ns: None,
            xsl_url: None,
            cache_time: None,
            gzip: None,
            etag: None,
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = Some(gzip);
        self
    }

    pub fn with_cache_time(mut self, ttl: Duration) -> Self {
        self.cache_time = Some(ttl);
        self
    }
}

/// A configuration tree node: either a leaf sitemap or an index.
#[derive(Clone)]
pub enum SitemapNodeOptions {
    Leaf(SitemapOptions),
    Index(SitemapIndexOptions),
}

impl From<SitemapOptions> for SitemapNodeOptions {
    fn from(options: SitemapOptions) -> Self {
        SitemapNodeOptions::Leaf(options)
    }
}

impl From<SitemapIndexOptions> for SitemapNodeOptions {
    fn from(options: SitemapIndexOptions) -> Self {
        SitemapNodeOptions::Index(options)
    }
}

/// Normalized, immutable options of a leaf sitemap.
pub struct SitemapDescriptor {
    pub path: String,
    pub hostname: Option<String>,
    pub routes: RouteSource,
    pub exclude: Option<GlobSet>,
    pub filter: Option<RouteFilter>,
    pub defaults: RouteDefaults,
    pub trailing_slash: bool,
    pub xml_ns: String,
    pub xsl_url: Option<String>,
    pub lastmod: Option<String>,
    pub cache_time: Duration,
    pub gzip: bool,
    pub etag: Option<EtagOptions>,
}

impl SitemapDescriptor {
    /// Fetch, normalize, exclude and filter the routes of this sitemap.
    pub async fn load_routes(&self) -> SitemapResult<Vec<Route>> {
        let specs = self
            .routes
            .fetch()
            .await
            .map_err(|e| SitemapError::supplier(&self.path, e))?;

        let mut routes: Vec<Route> = specs
            .into_iter()
            .map(|spec| Route::from_spec(spec, &self.defaults, self.trailing_slash))
            .collect();

        if let Some(exclude) = &self.exclude {
            routes.retain(|route| !is_excluded(exclude, &route.url));
        }

        if let Some(filter) = &self.filter {
            routes = filter(FilterContext {
                path: &self.path,
                routes,
            });
        }

        Ok(routes)
    }
}

impl fmt::Debug for SitemapDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SitemapDescriptor")
            .field("path", &self.path)
            .field("hostname", &self.hostname)
            .field("routes", &self.routes)
            .field("cache_time", &self.cache_time)
            .field("gzip", &self.gzip)
            .field("etag", &self.etag)
            .finish_non_exhaustive()
    }
}

/// Normalized, immutable options of a sitemap index.
#[derive(Debug)]
pub struct SitemapIndexDescriptor {
    pub path: String,
    pub hostname: Option<String>,
    pub sitemaps: ChildSource,
    pub lastmod: Option<String>,
    pub xml_ns: String,
    pub xsl_url: Option<String>,
    pub cache_time: Duration,
    pub gzip: bool,
    pub etag: Option<EtagOptions>,
}

impl SitemapIndexDescriptor {
    /// Fetch the child list from its source, once per call.
    pub async fn load_children(&self) -> SitemapResult<Vec<SitemapNodeOptions>> {
        self.sitemaps
            .fetch()
            .await
            .map_err(|e| SitemapError::supplier(&self.path, e))
    }

    /// Normalize child options against this index.
    pub fn normalize_children(
        &self,
        children: &[SitemapNodeOptions],
    ) -> SitemapResult<Vec<SitemapNode>> {
        children
            .iter()
            .cloned()
            .map(|child| SitemapNode::normalize(child, Some(self)))
            .collect()
    }
}

/// A normalized configuration tree node.
#[derive(Debug, Clone)]
pub enum SitemapNode {
    Leaf(Arc<SitemapDescriptor>),
    Index(Arc<SitemapIndexDescriptor>),
}

impl SitemapNode {
    pub fn path(&self) -> &str {
        match self {
            SitemapNode::Leaf(leaf) => &leaf.path,
            SitemapNode::Index(index) => &index.path,
        }
    }

    pub fn gzip(&self) -> bool {
        match self {
            SitemapNode::Leaf(leaf) => leaf.gzip,
            SitemapNode::Index(index) => index.gzip,
        }
    }

    pub fn hostname(&self) -> Option<&str> {
        match self {
            SitemapNode::Leaf(leaf) => leaf.hostname.as_deref(),
            SitemapNode::Index(index) => index.hostname.as_deref(),
        }
    }

    pub fn lastmod(&self) -> Option<&str> {
        match self {
            SitemapNode::Leaf(leaf) => leaf.lastmod.as_deref(),
            SitemapNode::Index(index) => index.lastmod.as_deref(),
        }
    }

    /// Apply defaults, inheriting from `parent` when the node is a child.
    pub fn normalize(
        options: SitemapNodeOptions,
        parent: Option<&SitemapIndexDescriptor>,
    ) -> SitemapResult<Self> {
        match options {
            SitemapNodeOptions::Leaf(leaf) => {
                normalize_sitemap(leaf, parent).map(|d| SitemapNode::Leaf(Arc::new(d)))
            }
            SitemapNodeOptions::Index(index) => {
                normalize_index(index, parent).map(|d| SitemapNode::Index(Arc::new(d)))
            }
        }
    }
}

fn normalize_sitemap(
    options: SitemapOptions,
    parent: Option<&SitemapIndexDescriptor>,
) -> SitemapResult<SitemapDescriptor> {
    let path = normalize_path(options.path, DEFAULT_SITEMAP_PATH, parent.is_some())?;
    let exclude = compile_exclude(&path, &options.exclude)?;

    Ok(SitemapDescriptor {
        hostname: options
            .hostname
            .or_else(|| parent.and_then(|p| p.hostname.clone())),
        routes: options.routes,
        exclude,
        filter: options.filter,
        defaults: options.defaults.unwrap_or_default(),
        trailing_slash: options.trailing_slash.unwrap_or(false),
        xml_ns: options
            .xml_ns
            .or_else(|| parent.map(|p| p.xml_ns.clone()))
            .unwrap_or_else(|| DEFAULT_XML_NS.to_string()),
        xsl_url: options
            .xsl_url
            .or_else(|| parent.and_then(|p| p.xsl_url.clone())),
        lastmod: options.lastmod,
        cache_time: options.cache_time.unwrap_or(DEFAULT_CACHE_TIME),
        gzip: options.gzip.or(parent.map(|p| p.gzip)).unwrap_or(false),
        etag: resolve_etag(options.etag, parent),
        path,
    })
}

fn normalize_index(
    options: SitemapIndexOptions,
    parent: Option<&SitemapIndexDescriptor>,
) -> SitemapResult<SitemapIndexDescriptor> {
    let path = normalize_path(options.path, DEFAULT_SITEMAP_INDEX_PATH, parent.is_some())?;

    Ok(SitemapIndexDescriptor {
        hostname: options
            .hostname
            .or_else(|| parent.and_then(|p| p.hostname.clone())),
        sitemaps: options.sitemaps,
        lastmod: options.lastmod,
        xml_ns: options
            .xml_ns
            .or_else(|| parent.map(|p| p.xml_ns.clone()))
            .unwrap_or_else(|| DEFAULT_XML_NS.to_string()),
        xsl_url: options
            .xsl_url
            .or_else(|| parent.and_then(|p| p.xsl_url.clone())),
        cache_time: options.cache_time.unwrap_or(DEFAULT_CACHE_TIME),
        gzip: options.gzip.or(parent.map(|p| p.gzip)).unwrap_or(false),
        etag: resolve_etag(options.etag, parent),
        path,
    })
}

fn normalize_path(path: Option<String>, default: &str, is_child: bool) -> SitemapResult<String> {
    let path = match path {
        Some(path) => path,
        None if is_child => {
            return Err(SitemapError::Config(
                "child sitemaps must declare a path".to_string(),
            ))
        }
        None => default.to_string(),
    };

    let path = if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    };

    if !path.ends_with(".xml") {
        return Err(SitemapError::Config(format!(
            "sitemap path {} must end with .xml",
            path
        )));
    }
    Ok(path)
}

fn resolve_etag(
    setting: Option<EtagSetting>,
    parent: Option<&SitemapIndexDescriptor>,
) -> Option<EtagOptions> {
    match (setting, parent) {
        (Some(setting), _) => setting.into_options(),
        (None, Some(parent)) => parent.etag.clone(),
        (None, None) => Some(EtagOptions::default()),
    }
}

fn compile_exclude(path: &str, patterns: &[String]) -> SitemapResult<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            SitemapError::Config(format!("{}: invalid exclude pattern {}: {}", path, pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|e| SitemapError::Config(format!("{}: {}", path, e)))
}

fn is_excluded(exclude: &GlobSet, url: &str) -> bool {
    if exclude.is_match(url) {
        return true;
    }
    // `/admin` should also exclude `/admin/` under the trailing-slash policy.
    match url.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => exclude.is_match(trimmed),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(path: &str, routes: &[&str]) -> SitemapNodeOptions {
        SitemapOptions::new(path)
            .with_routes(RouteSource::from_static(routes.iter().copied()))
            .into()
    }

    #[test]
    fn test_top_level_defaults() {
        let node = SitemapNode::normalize(SitemapOptions::default().into(), None).unwrap();
        let SitemapNode::Leaf(leaf) = node else {
            panic!("expected a leaf");
        };
        assert_eq!(leaf.path, DEFAULT_SITEMAP_PATH);
        assert_eq!(leaf.cache_time, DEFAULT_CACHE_TIME);
        assert_eq!(leaf.xml_ns, DEFAULT_XML_NS);
        assert!(!leaf.gzip);
        assert!(leaf.etag.is_some());
    }

    #[test]
    fn test_path_rules() {
        let node = SitemapNode::normalize(leaf("sitemap-a.xml", &[]), None).unwrap();
        assert_eq!(node.path(), "/sitemap-a.xml");

        let err = SitemapNode::normalize(leaf("/sitemap.txt", &[]), None);
        assert!(matches!(err, Err(SitemapError::Config(_))));
    }

    #[test]
    fn test_child_inherits_from_index() {
        let index = SitemapIndexDescriptor {
            path: "/sitemapindex.xml".into(),
            hostname: Some("https://example.com/".into()),
            sitemaps: ChildSource::from_static(Vec::new()),
            lastmod: None,
            xml_ns: DEFAULT_XML_NS.into(),
            xsl_url: Some("/sitemap.xsl".into()),
            cache_time: DEFAULT_CACHE_TIME,
            gzip: true,
            etag: None,
        };

        let child = SitemapNode::normalize(leaf("/sitemap-foo.xml", &["a"]), Some(&index)).unwrap();
        let SitemapNode::Leaf(child) = child else {
            panic!("expected a leaf");
        };
        assert_eq!(child.hostname.as_deref(), Some("https://example.com/"));
        assert!(child.gzip);
        assert!(child.etag.is_none());
        assert_eq!(child.xsl_url.as_deref(), Some("/sitemap.xsl"));

        let own = SitemapOptions::new("/sitemap-bar.xml")
            .with_hostname("https://yolo.com/")
            .with_gzip(false);
        let SitemapNode::Leaf(own) = SitemapNode::normalize(own.into(), Some(&index)).unwrap() else {
            panic!("expected a leaf");
        };
        assert_eq!(own.hostname.as_deref(), Some("https://yolo.com/"));
        assert!(!own.gzip);
    }

    #[test]
    fn test_child_without_path_rejected() {
        let index = SitemapIndexDescriptor {
            path: "/sitemapindex.xml".into(),
            hostname: None,
            sitemaps: ChildSource::from_static(Vec::new()),
            lastmod: None,
            xml_ns: DEFAULT_XML_NS.into(),
            xsl_url: None,
            cache_time: DEFAULT_CACHE_TIME,
            gzip: false,
            etag: None,
        };
        let result = SitemapNode::normalize(SitemapOptions::default().into(), Some(&index));
        assert!(matches!(result, Err(SitemapError::Config(_))));
    }

    #[tokio::test]
    async fn test_load_routes_applies_exclude_then_filter() {
        let options = SitemapOptions {
            path: Some("/sitemap.xml".into()),
            routes: RouteSource::from_static(["1/", "child/1", "exclude", "filtered", "test"]),
            exclude: vec!["/exclude".into()],
            trailing_slash: Some(true),
            ..Default::default()
        }
        .with_filter(|ctx| {
            ctx.routes
                .into_iter()
                .filter(|route| route.url != "/filtered/")
                .collect()
        });

        let SitemapNode::Leaf(leaf) = SitemapNode::normalize(options.into(), None).unwrap() else {
            panic!("expected a leaf");
        };
        let routes = leaf.load_routes().await.unwrap();
        let urls: Vec<_> = routes.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["/1/", "/child/1/", "/test/"]);
    }

    #[test]
    fn test_invalid_exclude_glob_rejected() {
        let options = SitemapOptions {
            exclude: vec!["/a/[".into()],
            ..Default::default()
        };
        assert!(SitemapNode::normalize(options.into(), None).is_err());
    }
}
