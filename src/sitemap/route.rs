//! Route specifications and their normalized form.
//!
//! # Responsibilities
//! - Accept routes as bare URLs or as objects with metadata
//! - Apply per-sitemap defaults (changefreq, priority, lastmod)
//! - Apply the trailing-slash policy and enforce a leading slash

use serde::{Deserialize, Serialize};
use std::fmt;

/// How frequently a page is likely to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFreq {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFreq {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeFreq::Always => "always",
            ChangeFreq::Hourly => "hourly",
            ChangeFreq::Daily => "daily",
            ChangeFreq::Weekly => "weekly",
            ChangeFreq::Monthly => "monthly",
            ChangeFreq::Yearly => "yearly",
            ChangeFreq::Never => "never",
        }
    }
}

impl fmt::Display for ChangeFreq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A route as handed over by a supplier: a URL or a URL with metadata.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RouteSpec {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        lastmod: Option<String>,
        #[serde(default)]
        changefreq: Option<ChangeFreq>,
        #[serde(default)]
        priority: Option<f32>,
    },
}

impl RouteSpec {
    pub fn url(&self) -> &str {
        match self {
            RouteSpec::Url(url) => url,
            RouteSpec::Detailed { url, .. } => url,
        }
    }
}

impl From<&str> for RouteSpec {
    fn from(url: &str) -> Self {
        RouteSpec::Url(url.to_string())
    }
}

impl From<String> for RouteSpec {
    fn from(url: String) -> Self {
        RouteSpec::Url(url)
    }
}

impl From<Route> for RouteSpec {
    fn from(route: Route) -> Self {
        RouteSpec::Detailed {
            url: route.url,
            lastmod: route.lastmod,
            changefreq: route.changefreq,
            priority: route.priority,
        }
    }
}

/// Per-entry defaults applied to routes that omit a field.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteDefaults {
    pub lastmod: Option<String>,
    pub changefreq: Option<ChangeFreq>,
    pub priority: Option<f32>,
}

/// A normalized route, ready to be serialized into a `<url>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub url: String,
    pub lastmod: Option<String>,
    pub changefreq: Option<ChangeFreq>,
    pub priority: Option<f32>,
}

impl Route {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            lastmod: None,
            changefreq: None,
            priority: None,
        }
    }

    /// Normalize a supplier route against the sitemap defaults.
    pub fn from_spec(spec: RouteSpec, defaults: &RouteDefaults, trailing_slash: bool) -> Self {
        let (url, lastmod, changefreq, priority) = match spec {
            RouteSpec::Url(url) => (url, None, None, None),
            RouteSpec::Detailed {
                url,
                lastmod,
                changefreq,
                priority,
            } => (url, lastmod, changefreq, priority),
        };

        Self {
            url: normalize_url(&url, trailing_slash),
            lastmod: lastmod.or_else(|| defaults.lastmod.clone()),
            changefreq: changefreq.or(defaults.changefreq),
            priority: priority.or(defaults.priority),
        }
    }

    /// Whether the URL already carries a scheme and host.
    pub fn is_absolute(&self) -> bool {
        is_absolute_url(&self.url)
    }
}

pub(crate) fn is_absolute_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn normalize_url(url: &str, trailing_slash: bool) -> String {
    let url = url.trim();
    if is_absolute_url(url) {
        return url.to_string();
    }

    let mut normalized = if url.starts_with('/') {
        url.to_string()
    } else {
        format!("/{}", url)
    };

    // Query strings and fragments keep their position after the path.
    if trailing_slash {
        let split_at = normalized.find(['?', '#']).unwrap_or(normalized.len());
        if !normalized[..split_at].ends_with('/') {
            normalized.insert(split_at, '/');
        }
    }
    normalized
}
