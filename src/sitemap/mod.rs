//! Sitemap domain model.
//!
//! # Data Flow
//! ```text
//! RouteSource / ChildSource (static list, closure, file)
//!     → options.rs (normalize descriptors, inherit from parent index)
//!     → route.rs (normalize routes, apply defaults)
//!     → builder.rs (XML / gzip bytes)
//! ```

pub mod builder;
pub mod options;
pub mod route;
pub mod source;

pub use builder::{gzip, DocumentBuilder, RequestContext, XmlDocumentBuilder};
pub use options::{
    EtagOptions, EtagSetting, SitemapDescriptor, SitemapIndexDescriptor, SitemapIndexOptions,
    SitemapNode, SitemapNodeOptions, SitemapOptions,
};
pub use route::{ChangeFreq, Route, RouteDefaults, RouteSpec};
pub use source::{ChildSource, FilterContext, RouteFilter, RouteSource};
