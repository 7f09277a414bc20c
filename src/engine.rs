//! Sitemap engine: cache, resolver and refresh worker behind one handle.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::SitemapCache;
use crate::config::ServerConfig;
use crate::error::SitemapResult;
use crate::registry::{RefreshQueue, RefreshWorker, Resolver};
use crate::sitemap::{DocumentBuilder, SitemapNodeOptions, XmlDocumentBuilder};

/// Default ceiling for serving a stale entry after failed rebuilds.
pub const DEFAULT_MAX_STALE: Duration = Duration::from_secs(24 * 60 * 60);

/// Engine-wide settings.
#[derive(Clone)]
pub struct EngineSettings {
    /// Router base prefixed to every `<loc>` path.
    pub base: String,
    pub max_stale: Option<Duration>,
    pub builder: Arc<dyn DocumentBuilder>,
}

impl EngineSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            base: config.server.base.clone(),
            max_stale: Some(Duration::from_secs(config.cache.max_stale_secs)),
            ..Self::default()
        }
    }

    pub fn with_builder(mut self, builder: impl DocumentBuilder + 'static) -> Self {
        self.builder = Arc::new(builder);
        self
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            base: "/".to_string(),
            max_stale: Some(DEFAULT_MAX_STALE),
            builder: Arc::new(XmlDocumentBuilder),
        }
    }
}

impl fmt::Debug for EngineSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSettings")
            .field("base", &self.base)
            .field("max_stale", &self.max_stale)
            .finish_non_exhaustive()
    }
}

struct EngineInner {
    settings: EngineSettings,
    cache: Arc<SitemapCache>,
    resolver: Arc<Resolver>,
    refresh: RefreshQueue,
}

/// Cheap-to-clone handle shared by the HTTP layer and the host application.
///
/// Several engines may coexist; each owns its own path table. Dropping the
/// last handle stops the refresh worker.
#[derive(Clone)]
pub struct SitemapEngine {
    inner: Arc<EngineInner>,
}

impl SitemapEngine {
    /// Create an engine and spawn its refresh worker. Requires a Tokio runtime.
    pub fn new(settings: EngineSettings) -> Self {
        let cache = Arc::new(SitemapCache::new(settings.max_stale));
        let resolver = Arc::new(Resolver::new(cache.clone()));
        let (refresh, rx) = RefreshQueue::new();

        let worker = RefreshWorker::new(resolver.clone(), &refresh, rx);
        tokio::spawn(worker.run());

        Self {
            inner: Arc::new(EngineInner {
                settings,
                cache,
                resolver,
                refresh,
            }),
        }
    }

    /// Register sitemaps and sitemap indexes, keeping existing registrations.
    pub async fn register<I>(&self, nodes: I) -> SitemapResult<()>
    where
        I: IntoIterator,
        I::Item: Into<SitemapNodeOptions>,
    {
        let nodes = nodes.into_iter().map(Into::into).collect();
        let paths = self.inner.resolver.register_all(nodes).await?;
        tracing::info!(paths = ?paths, registered = self.inner.cache.len(), "Sitemaps registered");
        Ok(())
    }

    /// Replace every registration with `nodes`.
    pub async fn reload<I>(&self, nodes: I) -> SitemapResult<()>
    where
        I: IntoIterator,
        I::Item: Into<SitemapNodeOptions>,
    {
        let nodes = nodes.into_iter().map(Into::into).collect();
        self.inner.resolver.reload(nodes).await
    }

    pub fn cache(&self) -> &Arc<SitemapCache> {
        &self.inner.cache
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.inner.resolver
    }

    pub fn refresh_queue(&self) -> &RefreshQueue {
        &self.inner.refresh
    }

    pub fn builder(&self) -> &dyn DocumentBuilder {
        self.inner.settings.builder.as_ref()
    }

    pub fn base(&self) -> &str {
        &self.inner.settings.base
    }
}

impl fmt::Debug for SitemapEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SitemapEngine")
            .field("settings", &self.inner.settings)
            .field("paths", &self.inner.cache.paths())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sitemap::{RouteSource, SitemapOptions};

    #[tokio::test]
    async fn test_engines_do_not_share_paths() {
        let first = SitemapEngine::new(EngineSettings::default());
        let second = SitemapEngine::new(EngineSettings::default());

        first
            .register([SitemapOptions::new("/sitemap.xml").with_routes(RouteSource::from_static(["/a"]))])
            .await
            .unwrap();

        assert!(first.cache().contains("/sitemap.xml"));
        assert!(second.cache().is_empty());
    }

    #[tokio::test]
    async fn test_register_is_additive_reload_is_not() {
        let engine = SitemapEngine::new(EngineSettings::default());
        engine.register([SitemapOptions::new("/a.xml")]).await.unwrap();
        engine.register([SitemapOptions::new("/b.xml")]).await.unwrap();
        assert_eq!(engine.cache().paths(), vec!["/a.xml", "/b.xml"]);

        engine.reload([SitemapOptions::new("/b.xml")]).await.unwrap();
        assert_eq!(engine.cache().paths(), vec!["/b.xml"]);
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = ServerConfig::default();
        config.server.base = "/app/".to_string();
        config.cache.max_stale_secs = 60;

        let settings = EngineSettings::from_config(&config);
        assert_eq!(settings.base, "/app/");
        assert_eq!(settings.max_stale, Some(Duration::from_secs(60)));
    }
}
