//! XML document builder.
//!
//! # Responsibilities
//! - Serialize a route list into a `<urlset>` document
//! - Serialize a child list into a `<sitemapindex>` document
//! - Resolve absolute `<loc>` values from hostname, router base and path
//! - Gzip-compress documents for the `.gz` endpoints
//!
//! # Design Decisions
//! - The builder is a trait so hosts can plug their own serializer
//! - Documents depend on the request host when no hostname is configured,
//!   so they are built per request and never cached as bytes

use axum::http::{header, HeaderMap};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fmt::Write as _;
use std::io::Write;

use crate::error::SitemapResult;
use crate::sitemap::options::{SitemapDescriptor, SitemapIndexDescriptor, SitemapNode};
use crate::sitemap::route::Route;

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Request details a document may depend on.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// `Host` header of the incoming request.
    pub host: Option<String>,
    /// Scheme reported by a fronting proxy, `http` otherwise.
    pub scheme: Option<String>,
}

impl RequestContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            host: read(header::HOST.as_str()),
            scheme: read(FORWARDED_PROTO),
        }
    }

    /// Origin derived from the request, used when no hostname is configured.
    fn origin(&self) -> String {
        let scheme = self.scheme.as_deref().unwrap_or("http");
        let host = self.host.as_deref().unwrap_or("localhost");
        format!("{}://{}", scheme, host)
    }
}

/// Produces sitemap and sitemap-index documents.
pub trait DocumentBuilder: Send + Sync {
    fn build_sitemap(
        &self,
        options: &SitemapDescriptor,
        routes: &[Route],
        base: &str,
        request: &RequestContext,
    ) -> SitemapResult<Vec<u8>>;

    fn build_sitemap_index(
        &self,
        options: &SitemapIndexDescriptor,
        sitemaps: &[SitemapNode],
        base: &str,
        request: &RequestContext,
    ) -> SitemapResult<Vec<u8>>;
}

/// Default sitemaps.org serializer.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlDocumentBuilder;

impl DocumentBuilder for XmlDocumentBuilder {
    fn build_sitemap(
        &self,
        options: &SitemapDescriptor,
        routes: &[Route],
        base: &str,
        request: &RequestContext,
    ) -> SitemapResult<Vec<u8>> {
        let origin = options
            .hostname
            .clone()
            .unwrap_or_else(|| request.origin());

        let mut xml = String::with_capacity(128 + routes.len() * 96);
        write_prolog(&mut xml, options.xsl_url.as_deref());
        let _ = writeln!(xml, "<urlset {}>", options.xml_ns);

        for route in routes {
            let loc = if route.is_absolute() {
                route.url.clone()
            } else {
                join_location(&origin, base, &route.url)
            };

            xml.push_str("  <url>\n");
            let _ = writeln!(xml, "    <loc>{}</loc>", escape(&loc));
            if let Some(lastmod) = &route.lastmod {
                let _ = writeln!(xml, "    <lastmod>{}</lastmod>", escape(lastmod));
            }
            if let Some(changefreq) = route.changefreq {
                let _ = writeln!(xml, "    <changefreq>{}</changefreq>", changefreq);
            }
            if let Some(priority) = route.priority {
                let _ = writeln!(xml, "    <priority>{}</priority>", format_priority(priority));
            }
            xml.push_str("  </url>\n");
        }

        xml.push_str("</urlset>\n");
        Ok(xml.into_bytes())
    }

    fn build_sitemap_index(
        &self,
        options: &SitemapIndexDescriptor,
        sitemaps: &[SitemapNode],
        base: &str,
        request: &RequestContext,
    ) -> SitemapResult<Vec<u8>> {
        let fallback_origin = request.origin();

        let mut xml = String::with_capacity(128 + sitemaps.len() * 96);
        write_prolog(&mut xml, options.xsl_url.as_deref());
        let _ = writeln!(xml, "<sitemapindex {}>", options.xml_ns);

        for sitemap in sitemaps {
            let origin = sitemap
                .hostname()
                .or(options.hostname.as_deref())
                .unwrap_or(fallback_origin.as_str());
            let path = if sitemap.gzip() {
                format!("{}.gz", sitemap.path())
            } else {
                sitemap.path().to_string()
            };

            xml.push_str("  <sitemap>\n");
            let _ = writeln!(
                xml,
                "    <loc>{}</loc>",
                escape(&join_location(origin, base, &path))
            );
            if let Some(lastmod) = sitemap.lastmod().or(options.lastmod.as_deref()) {
                let _ = writeln!(xml, "    <lastmod>{}</lastmod>", escape(lastmod));
            }
            xml.push_str("  </sitemap>\n");
        }

        xml.push_str("</sitemapindex>\n");
        Ok(xml.into_bytes())
    }
}

/// Gzip-compress a document. Output is deterministic for identical input.
pub fn gzip(document: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(document.len() / 4), Compression::default());
    encoder.write_all(document)?;
    encoder.finish()
}

fn write_prolog(xml: &mut String, xsl_url: Option<&str>) {
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    if let Some(xsl) = xsl_url {
        let _ = writeln!(
            xml,
            "<?xml-stylesheet type=\"text/xsl\" href=\"{}\"?>",
            escape(xsl)
        );
    }
}

/// `origin` + router `base` + `path`, with exactly one slash at each seam.
/// Priorities keep their given precision; whole numbers get one decimal.
fn format_priority(priority: f32) -> String {
    if priority.fract() == 0.0 {
        format!("{priority:.1}")
    } else {
        priority.to_string()
    }
}

fn join_location(origin: &str, base: &str, path: &str) -> String {
    let origin = origin.trim_end_matches('/');
    let base = base.trim_matches('/');
    let path = path.trim_start_matches('/');

    if base.is_empty() {
        format!("{}/{}", origin, path)
    } else {
        format!("{}/{}/{}", origin, base, path)
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
