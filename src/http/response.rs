//! Sitemap response construction.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

pub const CONTENT_TYPE_XML: &str = "application/xml";
pub const CONTENT_TYPE_GZIP: &str = "application/gzip";

/// 200 response carrying a sitemap document.
///
/// For HEAD requests the headers are kept and the body is dropped.
pub fn document(body: Vec<u8>, content_type: &'static str, etag: Option<HeaderValue>, head: bool) -> Response {
    let length = body.len();
    let body = if head { Body::empty() } else { Body::from(body) };

    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    if let Some(etag) = etag {
        headers.insert(header::ETAG, etag);
    }
    response
}

/// 304 response for a client holding the current document.
pub fn not_modified(etag: HeaderValue) -> Response {
    (StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response()
}

pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}
