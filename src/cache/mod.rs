//! Sitemap cache subsystem.
//!
//! # Data Flow
//! ```text
//! request path
//!     → store.rs (path → slot, plain / .gz / invalid extension)
//!     → routes.rs | index.rs (typed slot for a leaf or an index)
//!     → ttl.rs (fresh entry, or single-flight rebuild from the source)
//! ```
//!
//! # Design Decisions
//! - Staleness is evaluated lazily on read; no background timers
//! - An entry is replaced as a whole, never patched in place
//! - Failed rebuilds never clobber the last-good entry

pub mod index;
pub mod routes;
pub mod store;
pub mod ttl;

pub use index::{AppliedChildren, ChildSet, IndexCache, IndexEntry};
pub use routes::{RouteCache, RouteEntry, RouteSet};
pub use store::{PathMatch, SitemapCache};
pub use ttl::{CacheEntry, Lookup, TtlCell};
