//! ETag generation and conditional-request validation.
//!
//! # Responsibilities
//! - Derive an ETag from the exact response bytes
//! - Decide between 304 and a full response from the request headers
//!
//! # Design Decisions
//! - No `Last-Modified` is emitted, so `If-Modified-Since` never makes a
//!   response fresh on its own
//! - `If-None-Match` uses weak comparison

use axum::http::{header, HeaderMap, HeaderValue};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::sitemap::EtagOptions;

/// Outcome of validating a response body against a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// The client copy is current; respond 304 with this ETag.
    NotModified(HeaderValue),
    /// Send the body, with an ETag when one is configured.
    Serve(Option<HeaderValue>),
}

/// ETag of `body`: the custom hash verbatim when configured, else
/// `"<length in hex>-<first 27 chars of base64(sha256)>"`, `W/`-prefixed when weak.
pub fn generate_etag(body: &[u8], options: &EtagOptions) -> String {
    if let Some(hash) = &options.hash {
        return hash(body);
    }

    let digest = STANDARD.encode(Sha256::digest(body));
    let tag = format!("\"{:x}-{}\"", body.len(), &digest[..27]);
    if options.weak {
        format!("W/{}", tag)
    } else {
        tag
    }
}

/// Validate `body` against the conditional headers of a request.
pub fn validate(body: &[u8], options: Option<&EtagOptions>, headers: &HeaderMap) -> Validation {
    let Some(options) = options else {
        return Validation::Serve(None);
    };

    let etag = generate_etag(body, options);
    let Ok(value) = HeaderValue::from_str(&etag) else {
        tracing::warn!(etag = %etag, "ETag is not a valid header value, omitting it");
        return Validation::Serve(None);
    };

    if is_fresh(headers, &etag) {
        Validation::NotModified(value)
    } else {
        Validation::Serve(Some(value))
    }
}

/// Whether the client's cached copy identified by the request headers is current.
pub fn is_fresh(headers: &HeaderMap, etag: &str) -> bool {
    let none_match = header_str(headers, header::IF_NONE_MATCH);
    let modified_since = header_str(headers, header::IF_MODIFIED_SINCE);

    if none_match.is_none() && modified_since.is_none() {
        return false;
    }

    if header_str(headers, header::CACHE_CONTROL).is_some_and(has_no_cache) {
        return false;
    }

    if let Some(none_match) = none_match.filter(|v| v.trim() != "*") {
        let matched = none_match
            .split(',')
            .map(str::trim)
            .any(|candidate| weak_eq(candidate, etag));
        if !matched {
            return false;
        }
    }

    // Without a Last-Modified header the date condition can never hold.
    modified_since.is_none()
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn has_no_cache(cache_control: &str) -> bool {
    cache_control
        .split(',')
        .any(|directive| directive.trim().eq_ignore_ascii_case("no-cache"))
}

fn weak_eq(a: &str, b: &str) -> bool {
    let strip = |tag: &str| tag.strip_prefix("W/").unwrap_or(tag).to_string();
    strip(a) == strip(b)
}
