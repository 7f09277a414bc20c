//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → handler.rs (match sitemap path, cache lookup, build document)
//!     → freshness.rs (ETag, 304 decision)
//!     → response.rs (headers, body)
//!     → Send to client
//! ```

pub mod freshness;
pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use freshness::{generate_etag, Validation};
pub use handler::sitemap_middleware;
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{build_router, HttpServer};
