//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → sitemap_options() → SitemapEngine::register
//!
//! On change (--watch):
//!     watcher.rs detects change
//!     → loader.rs loads and validates the new file
//!     → SitemapEngine::reload replaces the registered tree
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - An invalid new file is logged and ignored; the running tree stays

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CacheConfig, EtagConfig, ListenerConfig, ObservabilityConfig, ServerConfig, ServerSettings,
    SitemapConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
