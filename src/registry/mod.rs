//! Sitemap registration subsystem.
//!
//! # Data Flow
//! ```text
//! SitemapNodeOptions (code or config file)
//!     → resolver.rs (normalize, create slots, register index children)
//!     → SitemapCache
//!
//! After an index or one of its sitemaps was served:
//!     handler → refresh.rs (queue) → worker → resolver.refresh
//! ```

pub mod refresh;
pub mod resolver;

pub use refresh::{RefreshQueue, RefreshWorker};
pub use resolver::{Resolver, MAX_DEPTH};
