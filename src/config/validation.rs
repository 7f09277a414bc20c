//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check sitemap paths, hostnames, priorities and exclude globs
//! - Detect paths registered twice anywhere in the tree
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: ServerConfig → Result<(), Vec<ValidationError>>

use globset::Glob;
use std::collections::HashSet;
use std::net::SocketAddr;
use url::Url;

use crate::config::schema::{ServerConfig, SitemapConfig};
use crate::sitemap::options::{DEFAULT_SITEMAP_INDEX_PATH, DEFAULT_SITEMAP_PATH};
use crate::sitemap::{RouteDefaults, RouteSpec};

/// A semantic error in the configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("sitemap path {path:?} {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("sitemap path {0} is configured more than once")]
    DuplicatePath(String),

    #[error("{path}: child sitemaps of an index must declare a path")]
    MissingChildPath { path: String },

    #[error("{path}: hostname {hostname:?} is not an absolute URL")]
    InvalidHostname { path: String, hostname: String },

    #[error("{path}: priority {priority} is outside [0, 1]")]
    InvalidPriority { path: String, priority: f32 },

    #[error("{path}: cache_time_secs must be greater than zero")]
    ZeroCacheTime { path: String },

    #[error("{path}: invalid exclude pattern {pattern:?}: {reason}")]
    InvalidExclude {
        path: String,
        pattern: String,
        reason: String,
    },

    #[error("{path}: routes and routes_file are mutually exclusive")]
    ConflictingRoutes { path: String },
}

/// Validate `config`, collecting every error found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let mut seen = HashSet::new();
    for sitemap in &config.sitemaps {
        validate_sitemap(sitemap, None, &mut seen, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_sitemap(
    sitemap: &SitemapConfig,
    parent: Option<&str>,
    seen: &mut HashSet<String>,
    errors: &mut Vec<ValidationError>,
) {
    let path = match (&sitemap.path, parent) {
        (Some(path), _) => path.clone(),
        (None, Some(parent)) => {
            errors.push(ValidationError::MissingChildPath {
                path: parent.to_string(),
            });
            return;
        }
        (None, None) if sitemap.is_index() => DEFAULT_SITEMAP_INDEX_PATH.to_string(),
        (None, None) => DEFAULT_SITEMAP_PATH.to_string(),
    };

    if !path.starts_with('/') {
        errors.push(ValidationError::InvalidPath {
            path: path.clone(),
            reason: "must start with /",
        });
    }
    if !path.ends_with(".xml") {
        errors.push(ValidationError::InvalidPath {
            path: path.clone(),
            reason: "must end with .xml",
        });
    }
    if !seen.insert(path.clone()) {
        errors.push(ValidationError::DuplicatePath(path.clone()));
    }

    if let Some(hostname) = &sitemap.hostname {
        if !matches!(Url::parse(hostname), Ok(url) if url.has_host()) {
            errors.push(ValidationError::InvalidHostname {
                path: path.clone(),
                hostname: hostname.clone(),
            });
        }
    }

    if sitemap.cache_time_secs == Some(0) {
        errors.push(ValidationError::ZeroCacheTime { path: path.clone() });
    }

    for priority in priorities(&sitemap.routes, sitemap.defaults.as_ref()) {
        if !(0.0..=1.0).contains(&priority) {
            errors.push(ValidationError::InvalidPriority {
                path: path.clone(),
                priority,
            });
        }
    }

    for pattern in &sitemap.exclude {
        if let Err(e) = Glob::new(pattern) {
            errors.push(ValidationError::InvalidExclude {
                path: path.clone(),
                pattern: pattern.clone(),
                reason: e.to_string(),
            });
        }
    }

    if !sitemap.routes.is_empty() && sitemap.routes_file.is_some() {
        errors.push(ValidationError::ConflictingRoutes { path: path.clone() });
    }

    for child in sitemap.sitemaps.iter().flatten() {
        validate_sitemap(child, Some(&path), seen, errors);
    }
}

fn priorities<'a>(
    routes: &'a [RouteSpec],
    defaults: Option<&'a RouteDefaults>,
) -> impl Iterator<Item = f32> + 'a {
    let route_priorities = routes.iter().filter_map(|route| match route {
        RouteSpec::Detailed { priority, .. } => *priority,
        RouteSpec::Url(_) => None,
    });
    defaults
        .and_then(|d| d.priority)
        .into_iter()
        .chain(route_priorities)
}
