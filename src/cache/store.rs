//! Path table of all registered sitemap caches.
//!
//! # Responsibilities
//! - Own one cache slot per registered path
//! - Replace slots atomically on re-registration
//! - Match request paths to slots (plain, `.gz`, invalid extension)
//!
//! # Design Decisions
//! - One explicit service object per engine, no process-wide singleton
//! - A path is either a leaf or an index; inserting one kind drops the other

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::index::IndexCache;
use crate::cache::routes::RouteCache;
use crate::observability::metrics;

const GZIP_SUFFIX: &str = ".gz";

/// Result of matching a request path against the registered sitemaps.
#[derive(Debug, Clone)]
pub enum PathMatch {
    Leaf { cache: Arc<RouteCache>, gzip: bool },
    Index { cache: Arc<IndexCache>, gzip: bool },
    /// Under a registered sitemap stem but not a servable extension.
    InvalidExtension,
    Unmatched,
}

/// Cache service shared by the resolver and the request handler.
#[derive(Debug, Default)]
pub struct SitemapCache {
    leaves: DashMap<String, Arc<RouteCache>>,
    indexes: DashMap<String, Arc<IndexCache>>,
    /// How long past expiry a last-good entry may be served on rebuild failure.
    max_stale: Option<Duration>,
}

impl SitemapCache {
    pub fn new(max_stale: Option<Duration>) -> Self {
        Self {
            leaves: DashMap::new(),
            indexes: DashMap::new(),
            max_stale,
        }
    }

    pub fn max_stale(&self) -> Option<Duration> {
        self.max_stale
    }

    pub fn leaf(&self, path: &str) -> Option<Arc<RouteCache>> {
        self.leaves.get(path).map(|r| r.value().clone())
    }

    pub fn index(&self, path: &str) -> Option<Arc<IndexCache>> {
        self.indexes.get(path).map(|r| r.value().clone())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.leaves.contains_key(path) || self.indexes.contains_key(path)
    }

    /// Number of registered paths.
    pub fn len(&self) -> usize {
        self.leaves.len() + self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .leaves
            .iter()
            .map(|r| r.key().clone())
            .chain(self.indexes.iter().map(|r| r.key().clone()))
            .collect();
        paths.sort();
        paths
    }

    pub(crate) fn insert_leaf(&self, cache: Arc<RouteCache>) -> Option<Arc<RouteCache>> {
        let path = cache.path().to_string();
        self.indexes.remove(&path);
        let previous = self.leaves.insert(path, cache);
        metrics::record_registered_paths(self.len());
        previous
    }

    pub(crate) fn insert_index(&self, cache: Arc<IndexCache>) -> Option<Arc<IndexCache>> {
        let path = cache.path().to_string();
        self.leaves.remove(&path);
        let previous = self.indexes.insert(path, cache);
        metrics::record_registered_paths(self.len());
        previous
    }

    /// Remove a path, whatever its kind.
    pub(crate) fn remove(&self, path: &str) -> bool {
        let removed = self.leaves.remove(path).is_some() | self.indexes.remove(path).is_some();
        if removed {
            metrics::record_registered_paths(self.len());
        }
        removed
    }

    /// Keep only the paths accepted by `keep`; returns the removed paths.
    pub(crate) fn retain_paths(&self, keep: impl Fn(&str) -> bool) -> Vec<String> {
        let mut removed = Vec::new();
        self.leaves.retain(|path, _| {
            let retained = keep(path);
            if !retained {
                removed.push(path.clone());
            }
            retained
        });
        self.indexes.retain(|path, _| {
            let retained = keep(path);
            if !retained {
                removed.push(path.clone());
            }
            retained
        });
        metrics::record_registered_paths(self.len());
        removed
    }

    /// Resolve a request path to a registered sitemap.
    pub fn match_path(&self, request_path: &str) -> PathMatch {
        if let Some(document_path) = request_path.strip_suffix(GZIP_SUFFIX) {
            if let Some(cache) = self.leaf(document_path) {
                return if cache.descriptor().gzip {
                    PathMatch::Leaf { cache, gzip: true }
                } else {
                    PathMatch::InvalidExtension
                };
            }
            if let Some(cache) = self.index(document_path) {
                return if cache.descriptor().gzip {
                    PathMatch::Index { cache, gzip: true }
                } else {
                    PathMatch::InvalidExtension
                };
            }
        }

        if let Some(cache) = self.leaf(request_path) {
            return PathMatch::Leaf { cache, gzip: false };
        }
        if let Some(cache) = self.index(request_path) {
            return PathMatch::Index { cache, gzip: false };
        }

        if self.is_under_registered_stem(request_path) {
            PathMatch::InvalidExtension
        } else {
            PathMatch::Unmatched
        }
    }

    /// `/sitemap.txt` is under the stem of `/sitemap.xml`; `/sitemap-a.xml` is not.
    fn is_under_registered_stem(&self, request_path: &str) -> bool {
        let under = |path: &str| {
            path.strip_suffix(".xml")
                .and_then(|stem| request_path.strip_prefix(stem))
                .is_some_and(|rest| rest.starts_with('.'))
        };
        self.leaves.iter().any(|r| under(r.key())) || self.indexes.iter().any(|r| under(r.key()))
    }
}
