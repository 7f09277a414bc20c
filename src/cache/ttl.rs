//! Lazily rebuilt TTL cell with single-flight regeneration.
//!
//! # Responsibilities
//! - Hold the last computed value of one sitemap path
//! - Decide staleness at read time (`computed_at + ttl`)
//! - Run at most one rebuild at a time; concurrent readers wait for it
//! - Keep serving the last-good value when a rebuild fails, up to `max_stale`
//!
//! # Design Decisions
//! - Entries are immutable and swapped whole through `ArcSwapOption`
//! - Rebuilds run in a spawned task, so a dropped request does not cancel them
//! - Waiters re-check freshness after acquiring the rebuild lock

use arc_swap::ArcSwapOption;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::{SitemapError, SitemapResult};
use crate::observability::metrics;

/// One computed value with its bookkeeping.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub value: T,
    pub computed_at: Instant,
    /// Incremented on every successful rebuild of the owning cell.
    pub generation: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, generation: u64) -> Self {
        Self {
            value,
            computed_at: Instant::now(),
            generation,
        }
    }

    pub fn age(&self) -> Duration {
        self.computed_at.elapsed()
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

/// Outcome of a cache lookup.
#[derive(Debug)]
pub enum Lookup<T> {
    /// Entry was within its TTL.
    Hit(Arc<CacheEntry<T>>),
    /// Entry was (re)computed for this lookup or by a rebuild it waited on.
    Rebuilt(Arc<CacheEntry<T>>),
    /// Rebuild failed; the last-good entry is served.
    Stale(Arc<CacheEntry<T>>),
}

impl<T> Lookup<T> {
    pub fn entry(&self) -> &Arc<CacheEntry<T>> {
        match self {
            Lookup::Hit(entry) | Lookup::Rebuilt(entry) | Lookup::Stale(entry) => entry,
        }
    }

    pub fn into_entry(self) -> Arc<CacheEntry<T>> {
        match self {
            Lookup::Hit(entry) | Lookup::Rebuilt(entry) | Lookup::Stale(entry) => entry,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            Lookup::Hit(_) => "hit",
            Lookup::Rebuilt(_) => "rebuilt",
            Lookup::Stale(_) => "stale",
        }
    }
}

/// TTL-bound cache slot for a single path.
pub struct TtlCell<T> {
    path: String,
    kind: &'static str,
    ttl: Duration,
    max_stale: Option<Duration>,
    current: ArcSwapOption<CacheEntry<T>>,
    rebuild_lock: Arc<Mutex<()>>,
    generation: AtomicU64,
}

impl<T> TtlCell<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(
        path: impl Into<String>,
        kind: &'static str,
        ttl: Duration,
        max_stale: Option<Duration>,
    ) -> Self {
        Self {
            path: path.into(),
            kind,
            ttl,
            max_stale,
            current: ArcSwapOption::empty(),
            rebuild_lock: Arc::new(Mutex::new(())),
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current entry regardless of freshness.
    pub fn peek(&self) -> Option<Arc<CacheEntry<T>>> {
        self.current.load_full()
    }

    fn fresh(&self) -> Option<Arc<CacheEntry<T>>> {
        self.current
            .load_full()
            .filter(|entry| entry.is_fresh(self.ttl))
    }

    /// Drop `entry` if it is still the current one.
    ///
    /// A concurrent rebuild that already replaced it is left untouched.
    pub fn evict(&self, entry: &Arc<CacheEntry<T>>) -> bool {
        let current = self.current.load();
        match &*current {
            Some(existing) if Arc::ptr_eq(existing, entry) => {
                let previous = self.current.compare_and_swap(&current, None);
                matches!(&*previous, Some(p) if Arc::ptr_eq(p, entry))
            }
            _ => false,
        }
    }

    /// Install an entry computed elsewhere, keeping generations monotonic.
    pub fn seed(&self, entry: Arc<CacheEntry<T>>) {
        self.generation.fetch_max(entry.generation, Ordering::SeqCst);
        self.current.store(Some(entry));
    }

    /// Return the fresh entry or rebuild it with `rebuild`.
    pub async fn get_or_rebuild<F, Fut>(self: &Arc<Self>, rebuild: F) -> SitemapResult<Lookup<T>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = SitemapResult<T>> + Send + 'static,
    {
        if let Some(entry) = self.fresh() {
            metrics::record_cache_lookup(self.kind, "hit");
            return Ok(Lookup::Hit(entry));
        }

        let cell = Arc::clone(self);
        let task = tokio::spawn(async move { cell.rebuild_exclusive(rebuild).await });

        let lookup = task.await.map_err(|e| SitemapError::Task {
            path: self.path.clone(),
            reason: e.to_string(),
        })??;

        metrics::record_cache_lookup(self.kind, lookup.outcome());
        Ok(lookup)
    }

    async fn rebuild_exclusive<F, Fut>(self: Arc<Self>, rebuild: F) -> SitemapResult<Lookup<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SitemapResult<T>>,
    {
        let _guard = self.rebuild_lock.clone().lock_owned().await;

        // Another caller may have finished a rebuild while we waited.
        if let Some(entry) = self.fresh() {
            return Ok(Lookup::Rebuilt(entry));
        }

        let started = Instant::now();
        match rebuild().await {
            Ok(value) => {
                let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                let entry = Arc::new(CacheEntry::new(value, generation));
                self.current.store(Some(entry.clone()));
                metrics::record_rebuild(self.kind, started.elapsed());
                tracing::debug!(
                    path = %self.path,
                    generation,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Cache entry rebuilt"
                );
                Ok(Lookup::Rebuilt(entry))
            }
            Err(error) => match self.current.load_full() {
                Some(last_good) if self.within_stale_ceiling(&last_good) => {
                    tracing::warn!(
                        path = %self.path,
                        error = %error,
                        age_secs = last_good.age().as_secs(),
                        "Rebuild failed, serving last-good entry"
                    );
                    Ok(Lookup::Stale(last_good))
                }
                _ => Err(error),
            },
        }
    }

    fn within_stale_ceiling(&self, entry: &CacheEntry<T>) -> bool {
        match self.max_stale {
            Some(ceiling) => entry.age() <= self.ttl.saturating_add(ceiling),
            None => true,
        }
    }
}
