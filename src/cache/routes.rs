//! Route cache for a leaf sitemap.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::ttl::{CacheEntry, Lookup, TtlCell};
use crate::error::SitemapResult;
use crate::sitemap::{Route, SitemapDescriptor};

/// Routes and the options they were computed with, replaced as one unit.
#[derive(Debug)]
pub struct RouteSet {
    pub routes: Vec<Route>,
    pub options: Arc<SitemapDescriptor>,
}

pub type RouteEntry = CacheEntry<RouteSet>;

/// Cache slot of one registered leaf sitemap.
pub struct RouteCache {
    descriptor: Arc<SitemapDescriptor>,
    /// Path of the index that registered this sitemap, if any.
    owner: Option<String>,
    depth: usize,
    cell: Arc<TtlCell<RouteSet>>,
}

impl RouteCache {
    pub fn new(
        descriptor: Arc<SitemapDescriptor>,
        owner: Option<String>,
        depth: usize,
        max_stale: Option<Duration>,
    ) -> Self {
        let cell = TtlCell::new(descriptor.path.clone(), "leaf", descriptor.cache_time, max_stale);
        Self {
            descriptor,
            owner,
            depth,
            cell: Arc::new(cell),
        }
    }

    pub fn path(&self) -> &str {
        &self.descriptor.path
    }

    pub fn descriptor(&self) -> &Arc<SitemapDescriptor> {
        &self.descriptor
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Fresh routes, rebuilding from the route source when stale.
    pub async fn get(&self) -> SitemapResult<Lookup<RouteSet>> {
        let descriptor = self.descriptor.clone();
        self.cell
            .get_or_rebuild(move || async move {
                let routes = descriptor.load_routes().await?;
                Ok(RouteSet {
                    routes,
                    options: descriptor,
                })
            })
            .await
    }

    pub fn peek(&self) -> Option<Arc<RouteEntry>> {
        self.cell.peek()
    }

    /// Forget `entry` so the next lookup invokes the route source again.
    pub fn evict(&self, entry: &Arc<RouteEntry>) -> bool {
        let evicted = self.cell.evict(entry);
        if evicted {
            tracing::debug!(path = %self.path(), "Route cache evicted");
        }
        evicted
    }
}

impl std::fmt::Debug for RouteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteCache")
            .field("path", &self.descriptor.path)
            .field("owner", &self.owner)
            .field("depth", &self.depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sitemap::{RouteSource, RouteSpec, SitemapNode, SitemapOptions};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn route_cache(options: SitemapOptions) -> RouteCache {
        let SitemapNode::Leaf(descriptor) = SitemapNode::normalize(options.into(), None).unwrap()
        else {
            panic!("expected a leaf");
        };
        RouteCache::new(descriptor, None, 0, None)
    }

    #[tokio::test]
    async fn test_entry_pairs_routes_with_options() {
        let cache = route_cache(
            SitemapOptions::new("/sitemap.xml").with_routes(RouteSource::from_static(["a", "b"])),
        );
        let entry = cache.get().await.unwrap().into_entry();
        assert_eq!(entry.value.routes.len(), 2);
        assert!(Arc::ptr_eq(&entry.value.options, cache.descriptor()));
    }

    #[tokio::test]
    async fn test_evict_forces_supplier_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let cache = route_cache(SitemapOptions::new("/sitemap.xml").with_routes(
            RouteSource::from_fn(move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(Vec::<RouteSpec>::new())
                }
            }),
        ));

        let entry = cache.get().await.unwrap().into_entry();
        assert!(entry.value.routes.is_empty());
        cache.get().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(cache.evict(&entry));
        cache.get().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
