//! Registration of sitemap trees into the cache.
//!
//! # Responsibilities
//! - Normalize top-level nodes and create their cache slots
//! - Fetch each index's child list once and register the children from it
//! - Re-register children when an index rebuild produced a new generation
//! - Remove slots that are no longer reachable after a reload
//!
//! # Design Decisions
//! - An index only references leaf sitemaps; deeper nesting is logged, not rejected
//! - Nesting beyond `MAX_DEPTH` is rejected (self-referencing suppliers)
//! - A child slot is only removed by the index that registered it

use futures_util::future::{join_all, BoxFuture, FutureExt};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::cache::{AppliedChildren, IndexCache, IndexEntry, RouteCache, SitemapCache};
use crate::error::{SitemapError, SitemapResult};
use crate::sitemap::{
    ChildSource, SitemapDescriptor, SitemapIndexDescriptor, SitemapNode, SitemapNodeOptions,
};

/// Deepest nesting level accepted below a top-level node.
pub const MAX_DEPTH: usize = 8;

/// Builds and maintains the path table from sitemap trees.
#[derive(Debug)]
pub struct Resolver {
    cache: Arc<SitemapCache>,
    reload_lock: Mutex<()>,
}

impl Resolver {
    pub fn new(cache: Arc<SitemapCache>) -> Self {
        Self {
            cache,
            reload_lock: Mutex::new(()),
        }
    }

    pub fn cache(&self) -> &Arc<SitemapCache> {
        &self.cache
    }

    /// Register top-level nodes next to the ones already registered.
    pub async fn register_all(&self, nodes: Vec<SitemapNodeOptions>) -> SitemapResult<Vec<String>> {
        let _reload = self.reload_lock.lock().await;
        self.register_roots(nodes).await
    }

    /// Replace the registered tree with `nodes`.
    ///
    /// Paths not reachable from the new top-level nodes are removed.
    pub async fn reload(&self, nodes: Vec<SitemapNodeOptions>) -> SitemapResult<()> {
        let _reload = self.reload_lock.lock().await;
        let roots = self.register_roots(nodes).await?;
        let removed = self.retain_reachable(&roots);

        tracing::info!(
            registered = self.cache.len(),
            removed = removed.len(),
            "Sitemap tree reloaded"
        );
        Ok(())
    }

    async fn register_roots(&self, nodes: Vec<SitemapNodeOptions>) -> SitemapResult<Vec<String>> {
        // Normalize everything before touching the path table.
        let roots = nodes
            .into_iter()
            .map(|node| SitemapNode::normalize(node, None))
            .collect::<SitemapResult<Vec<_>>>()?;

        let paths: Vec<String> = roots.iter().map(|node| node.path().to_string()).collect();
        let results = join_all(roots.into_iter().map(|node| self.register(node, None, 0))).await;
        results.into_iter().collect::<SitemapResult<Vec<()>>>()?;
        Ok(paths)
    }

    /// Register one normalized node, recursing into index children.
    pub fn register<'a>(
        &'a self,
        node: SitemapNode,
        owner: Option<String>,
        depth: usize,
    ) -> BoxFuture<'a, SitemapResult<()>> {
        async move {
            if depth > MAX_DEPTH {
                return Err(SitemapError::TooDeep {
                    path: node.path().to_string(),
                    depth,
                });
            }
            if depth > 1 {
                tracing::warn!(
                    path = %node.path(),
                    depth,
                    "Sitemap nested more than one level below the top"
                );
            }

            match node {
                SitemapNode::Leaf(descriptor) => {
                    self.register_leaf(descriptor, owner, depth);
                    Ok(())
                }
                SitemapNode::Index(descriptor) => {
                    if depth >= 1 {
                        tracing::warn!(
                            path = %descriptor.path,
                            owner = ?owner,
                            "Sitemap index registered inside another index; indexes should only list sitemaps"
                        );
                    }
                    let index = self.register_index(descriptor, owner, depth)?;
                    self.sync_children(&index).await?;
                    Ok(())
                }
            }
        }
        .boxed()
    }

    fn register_leaf(
        &self,
        descriptor: Arc<SitemapDescriptor>,
        owner: Option<String>,
        depth: usize,
    ) -> Arc<RouteCache> {
        let cache = Arc::new(RouteCache::new(descriptor, owner, depth, self.cache.max_stale()));
        self.cache.insert_leaf(cache.clone());
        tracing::debug!(path = %cache.path(), owner = ?cache.owner(), depth, "Sitemap registered");
        cache
    }

    fn register_index(
        &self,
        descriptor: Arc<SitemapIndexDescriptor>,
        owner: Option<String>,
        depth: usize,
    ) -> SitemapResult<Arc<IndexCache>> {
        let index = Arc::new(IndexCache::new(descriptor, owner, depth, self.cache.max_stale()));

        // A re-registered top-level index keeps the child list its supplier
        // last produced. Static lists are taken from the new options.
        if depth == 0 && matches!(index.descriptor().sitemaps, ChildSource::Supplier(_)) {
            if let Some(previous) = self.cache.index(index.path()).and_then(|slot| slot.peek()) {
                index.seed_from(&previous)?;
            }
        }

        self.cache.insert_index(index.clone());
        tracing::debug!(path = %index.path(), owner = ?index.owner(), depth, "Sitemap index registered");
        Ok(index)
    }

    /// Resolve the child list of `index`, re-registering its children when
    /// the list was rebuilt since they were last registered.
    pub async fn sync_children(&self, index: &Arc<IndexCache>) -> SitemapResult<Arc<IndexEntry>> {
        let entry = index.get().await?.into_entry();
        self.apply_children(index, &entry).await?;
        Ok(entry)
    }

    async fn apply_children(&self, index: &Arc<IndexCache>, entry: &Arc<IndexEntry>) -> SitemapResult<()> {
        let _sync = index.lock_sync().await;

        if !self.is_current(index) {
            tracing::debug!(path = %index.path(), "Index slot replaced, skipping child sync");
            return Ok(());
        }

        let applied = index.applied();
        if applied.generation.is_some_and(|generation| generation >= entry.generation) {
            return Ok(());
        }

        let paths: Vec<String> = entry.value.paths().map(str::to_string).collect();
        let owner = index.path().to_string();
        let results = join_all(
            entry
                .value
                .sitemaps
                .iter()
                .cloned()
                .map(|child| self.register(child, Some(owner.clone()), index.depth() + 1)),
        )
        .await;

        let kept: HashSet<&str> = paths.iter().map(String::as_str).collect();
        for stale in applied.paths.iter().filter(|p| !kept.contains(p.as_str())) {
            self.deregister(stale, &owner);
        }

        results.into_iter().collect::<SitemapResult<Vec<()>>>()?;

        tracing::debug!(
            path = %owner,
            generation = entry.generation,
            children = paths.len(),
            "Index children registered"
        );
        index.set_applied(AppliedChildren {
            generation: Some(entry.generation),
            paths,
        });
        Ok(())
    }

    /// Bring an index up to date; leaves and unknown paths are ignored.
    pub async fn refresh(&self, path: &str) -> SitemapResult<()> {
        match self.cache.index(path) {
            Some(index) => self.sync_children(&index).await.map(|_| ()),
            None => Ok(()),
        }
    }

    fn is_current(&self, index: &Arc<IndexCache>) -> bool {
        self.cache
            .index(index.path())
            .is_some_and(|slot| Arc::ptr_eq(&slot, index))
    }

    /// Remove `path` if it was registered by `owner`, together with its own children.
    fn deregister(&self, path: &str, owner: &str) {
        if let Some(leaf) = self.cache.leaf(path) {
            if leaf.owner() == Some(owner) {
                self.cache.remove(path);
                tracing::debug!(path, owner, "Sitemap deregistered");
            }
            return;
        }

        if let Some(index) = self.cache.index(path) {
            if index.owner() == Some(owner) {
                self.cache.remove(path);
                tracing::debug!(path, owner, "Sitemap index deregistered");
                for child in &index.applied().paths {
                    self.deregister(child, path);
                }
            }
        }
    }

    /// Drop every slot not reachable from `roots` through registered children.
    fn retain_reachable(&self, roots: &[String]) -> Vec<String> {
        let mut reachable: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = roots.iter().cloned().collect();

        while let Some(path) = queue.pop_front() {
            if !reachable.insert(path.clone()) {
                continue;
            }
            if let Some(index) = self.cache.index(&path) {
                queue.extend(index.applied().paths.iter().cloned());
            }
        }

        let removed = self.cache.retain_paths(|path| reachable.contains(path));
        for path in &removed {
            tracing::info!(path = %path, "Sitemap no longer configured, removed");
        }
        removed
    }
}
