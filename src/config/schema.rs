//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the sitemap
//! server. All types derive Serde traits for deserialization from TOML files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sitemap::{
    ChildSource, EtagOptions, EtagSetting, RouteDefaults, RouteSource, RouteSpec,
    SitemapIndexOptions, SitemapNodeOptions, SitemapOptions,
};

/// Root configuration for the sitemap server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Request handling settings.
    pub server: ServerSettings,

    /// Cache policy shared by every sitemap.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Top-level sitemaps and sitemap indexes.
    pub sitemaps: Vec<SitemapConfig>,
}

impl ServerConfig {
    /// Engine registration input for every configured top-level node.
    pub fn sitemap_options(&self) -> Vec<SitemapNodeOptions> {
        self.sitemaps.iter().map(SitemapConfig::to_options).collect()
    }

    /// Resolve relative `routes_file` entries against `base_dir`.
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        fn resolve(sitemap: &mut SitemapConfig, base_dir: &Path) {
            if let Some(file) = sitemap.routes_file.as_mut() {
                if file.is_relative() {
                    *file = base_dir.join(&*file);
                }
            }
            for child in sitemap.sitemaps.iter_mut().flatten() {
                resolve(child, base_dir);
            }
        }

        for sitemap in &mut self.sitemaps {
            resolve(sitemap, base_dir);
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Request handling settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Router base prefixed to every `<loc>` path.
    pub base: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base: "/".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Cache policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long past its TTL a last-good entry may be served while rebuilds fail.
    pub max_stale_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_stale_secs: 24 * 60 * 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Fallback log level when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics listener address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// ETag settings of one sitemap.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EtagConfig {
    pub enabled: bool,
    pub weak: bool,
}

impl Default for EtagConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weak: false,
        }
    }
}

impl From<&EtagConfig> for EtagSetting {
    fn from(config: &EtagConfig) -> Self {
        if config.enabled {
            EtagSetting::Enabled(EtagOptions {
                weak: config.weak,
                hash: None,
            })
        } else {
            EtagSetting::Disabled
        }
    }
}

/// One configured sitemap. The presence of `sitemaps` makes it an index.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SitemapConfig {
    /// Serving path, e.g. `/sitemap.xml`. Optional at the top level only.
    pub path: Option<String>,

    /// Origin prefixed to every `<loc>`; the request host is used otherwise.
    pub hostname: Option<String>,

    pub routes: Vec<RouteSpec>,

    /// File with one route per line, re-read on every rebuild.
    pub routes_file: Option<PathBuf>,

    /// Glob patterns of routes to leave out.
    pub exclude: Vec<String>,

    pub gzip: Option<bool>,

    pub cache_time_secs: Option<u64>,

    pub trailing_slash: Option<bool>,

    pub defaults: Option<RouteDefaults>,

    pub lastmod: Option<String>,

    pub xml_ns: Option<String>,

    pub xsl_url: Option<String>,

    pub etag: Option<EtagConfig>,

    /// Child sitemaps of an index.
    pub sitemaps: Option<Vec<SitemapConfig>>,
}

impl SitemapConfig {
    pub fn is_index(&self) -> bool {
        self.sitemaps.is_some()
    }

    pub fn to_options(&self) -> SitemapNodeOptions {
        let cache_time = self.cache_time_secs.map(Duration::from_secs);
        let etag = self.etag.as_ref().map(EtagSetting::from);

        match &self.sitemaps {
            Some(children) => SitemapIndexOptions {
                path: self.path.clone(),
                hostname: self.hostname.clone(),
                sitemaps: ChildSource::from_static(
                    children.iter().map(SitemapConfig::to_options).collect(),
                ),
                lastmod: self.lastmod.clone(),
                xml_ns: self.xml_ns.clone(),
                xsl_url: self.xsl_url.clone(),
                cache_time,
                gzip: self.gzip,
                etag,
            }
            .into(),
            None => {
                let routes = match &self.routes_file {
                    Some(file) => RouteSource::from_file(file.clone()),
                    None => RouteSource::from_static(self.routes.iter().cloned()),
                };
                SitemapOptions {
                    path: self.path.clone(),
                    hostname: self.hostname.clone(),
                    routes,
                    exclude: self.exclude.clone(),
                    filter: None,
                    defaults: self.defaults.clone(),
                    trailing_slash: self.trailing_slash,
                    xml_ns: self.xml_ns.clone(),
                    xsl_url: self.xsl_url.clone(),
                    lastmod: self.lastmod.clone(),
                    cache_time,
                    gzip: self.gzip,
                    etag,
                }
                .into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[server]
base = "/app/"

[[sitemaps]]
path = "/sitemap.xml"
hostname = "https://example.com/"
routes = ["/a", { url = "/b", priority = 0.5 }]
gzip = true
etag = { enabled = false }

[[sitemaps]]
path = "/sitemapindex.xml"

[[sitemaps.sitemaps]]
path = "/sitemap-foo.xml"
routes_file = "foo.txt"
"#;

    #[test]
    fn test_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.server.base, "/");
        assert_eq!(config.cache.max_stale_secs, 86_400);
        assert!(!config.observability.metrics_enabled);
        assert!(config.sitemaps.is_empty());
    }

    #[test]
    fn test_nested_sitemaps_become_index() {
        let config: ServerConfig = toml::from_str(CONFIG).unwrap();
        assert_eq!(config.server.base, "/app/");

        let leaf = &config.sitemaps[0];
        assert!(!leaf.is_index());
        assert_eq!(leaf.routes.len(), 2);
        assert!(matches!(
            leaf.to_options(),
            SitemapNodeOptions::Leaf(SitemapOptions {
                gzip: Some(true),
                etag: Some(EtagSetting::Disabled),
                ..
            })
        ));

        let index = &config.sitemaps[1];
        assert!(index.is_index());
        assert!(matches!(index.to_options(), SitemapNodeOptions::Index(_)));
    }

    #[test]
    fn test_resolve_relative_routes_file() {
        let mut config: ServerConfig = toml::from_str(CONFIG).unwrap();
        config.resolve_paths(Path::new("/etc/sitemaps"));

        let child = &config.sitemaps[1].sitemaps.as_ref().unwrap()[0];
        assert_eq!(
            child.routes_file.as_deref(),
            Some(Path::new("/etc/sitemaps/foo.txt"))
        );
    }
}
