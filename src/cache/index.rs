//! Child-sitemap cache for a sitemap index.

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

use crate::cache::ttl::{CacheEntry, Lookup, TtlCell};
use crate::error::SitemapResult;
use crate::sitemap::{SitemapIndexDescriptor, SitemapNode, SitemapNodeOptions};

/// Child list of an index.
///
/// The raw options are kept next to the normalized nodes so the list can be
/// re-normalized against a new index descriptor without calling the supplier.
pub struct ChildSet {
    pub options: Vec<SitemapNodeOptions>,
    pub sitemaps: Vec<SitemapNode>,
}

impl ChildSet {
    pub fn new(
        options: Vec<SitemapNodeOptions>,
        descriptor: &SitemapIndexDescriptor,
    ) -> SitemapResult<Self> {
        let sitemaps = descriptor.normalize_children(&options)?;
        Ok(Self { options, sitemaps })
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.sitemaps.iter().map(SitemapNode::path)
    }
}

pub type IndexEntry = CacheEntry<ChildSet>;

/// Children registered from a given index generation.
#[derive(Debug, Default, Clone)]
pub struct AppliedChildren {
    /// Generation of the entry the children were registered from.
    pub generation: Option<u64>,
    pub paths: Vec<String>,
}

/// Cache slot of one registered sitemap index.
pub struct IndexCache {
    descriptor: Arc<SitemapIndexDescriptor>,
    owner: Option<String>,
    depth: usize,
    cell: Arc<TtlCell<ChildSet>>,
    sync_lock: Mutex<()>,
    applied: ArcSwap<AppliedChildren>,
}

impl IndexCache {
    pub fn new(
        descriptor: Arc<SitemapIndexDescriptor>,
        owner: Option<String>,
        depth: usize,
        max_stale: Option<Duration>,
    ) -> Self {
        let cell = TtlCell::new(descriptor.path.clone(), "index", descriptor.cache_time, max_stale);
        Self {
            descriptor,
            owner,
            depth,
            cell: Arc::new(cell),
            sync_lock: Mutex::new(()),
            applied: ArcSwap::from_pointee(AppliedChildren::default()),
        }
    }

    pub fn path(&self) -> &str {
        &self.descriptor.path
    }

    pub fn descriptor(&self) -> &Arc<SitemapIndexDescriptor> {
        &self.descriptor
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Fresh child list, fetching it from the child source when stale.
    pub async fn get(&self) -> SitemapResult<Lookup<ChildSet>> {
        let descriptor = self.descriptor.clone();
        self.cell
            .get_or_rebuild(move || async move {
                let options = descriptor.load_children().await?;
                ChildSet::new(options, &descriptor)
            })
            .await
    }

    pub fn peek(&self) -> Option<Arc<IndexEntry>> {
        self.cell.peek()
    }

    /// Carry a materialized child list over from a previous registration.
    ///
    /// The children are re-normalized against this descriptor; the entry keeps
    /// its age and generation so TTL accounting is unchanged.
    pub fn seed_from(&self, previous: &IndexEntry) -> SitemapResult<()> {
        let children = ChildSet::new(previous.value.options.clone(), &self.descriptor)?;
        self.cell.seed(Arc::new(CacheEntry {
            value: children,
            computed_at: previous.computed_at,
            generation: previous.generation,
        }));
        Ok(())
    }

    pub fn applied(&self) -> Arc<AppliedChildren> {
        self.applied.load_full()
    }

    pub(crate) fn set_applied(&self, applied: AppliedChildren) {
        self.applied.store(Arc::new(applied));
    }

    /// Serializes child re-registration for this index.
    pub(crate) async fn lock_sync(&self) -> MutexGuard<'_, ()> {
        self.sync_lock.lock().await
    }
}

impl std::fmt::Debug for IndexCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexCache")
            .field("path", &self.descriptor.path)
            .field("owner", &self.owner)
            .field("depth", &self.depth)
            .field("applied", &*self.applied.load_full())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sitemap::{ChildSource, SitemapIndexOptions, SitemapOptions};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn index_cache(options: SitemapIndexOptions) -> IndexCache {
        let SitemapNode::Index(descriptor) = SitemapNode::normalize(options.into(), None).unwrap()
        else {
            panic!("expected an index");
        };
        IndexCache::new(descriptor, None, 0, None)
    }

    #[tokio::test]
    async fn test_async_child_list_fetched_once_per_ttl() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let cache = index_cache(SitemapIndexOptions::new(
            "/sitemapindex.xml",
            ChildSource::from_fn(move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok(vec![
                        SitemapOptions::new("/sitemap-foo.xml").into(),
                        SitemapOptions::new("/sitemap-bar.xml").into(),
                    ])
                }
            }),
        ));

        let entry = cache.get().await.unwrap().into_entry();
        let paths: Vec<_> = entry.value.paths().collect();
        assert_eq!(paths, vec!["/sitemap-foo.xml", "/sitemap-bar.xml"]);

        cache.get().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_seed_renormalizes_against_new_descriptor() {
        let children: Vec<SitemapNodeOptions> = vec![SitemapOptions::new("/sitemap-foo.xml").into()];
        let old = index_cache(
            SitemapIndexOptions::new("/sitemapindex.xml", ChildSource::from_static(children.clone()))
                .with_hostname("https://old.example.com/"),
        );
        let entry = old.get().await.unwrap().into_entry();

        let new = index_cache(
            SitemapIndexOptions::new("/sitemapindex.xml", ChildSource::from_static(children))
                .with_hostname("https://new.example.com/"),
        );
        new.seed_from(&entry).unwrap();

        let seeded = new.peek().unwrap();
        assert_eq!(seeded.generation, entry.generation);
        assert_eq!(seeded.computed_at, entry.computed_at);
        assert_eq!(seeded.value.sitemaps[0].hostname(), Some("https://new.example.com/"));
    }
}
