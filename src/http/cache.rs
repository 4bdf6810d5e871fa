//! HTTP cache control module
//!
//! Provides `ETag` generation and the cache headers attached to 200, 206 and
//! 304 responses.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hyper::header::{HeaderName, CACHE_CONTROL, ETAG, EXPIRES, LAST_MODIFIED, PRAGMA};

/// Generate an unquoted `ETag` from content using fast hashing
///
/// # Arguments
/// * `content` - Resource content
///
/// # Returns
/// Hex digest, e.g., `abc123def`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    let v = hasher.finish();
    format!("{v:x}")
}

/// Cache control policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Public cache with specified max-age (seconds)
    Public(u64),
    /// Cacheable, but must be revalidated with the validators every time
    Revalidate,
    /// No validators available, nothing may be stored
    NoStore,
}

impl CachePolicy {
    /// Pick the policy for a resource
    ///
    /// A positive max-age always wins; otherwise the policy depends on whether
    /// the resource has a last-modified time or an entity tag.
    pub fn select(max_age: Option<i64>, has_validators: bool) -> Self {
        match max_age.and_then(|age| u64::try_from(age).ok()) {
            Some(age) if age > 0 => Self::Public(age),
            _ if has_validators => Self::Revalidate,
            _ => Self::NoStore,
        }
    }

    /// Convert to Cache-Control header value
    pub fn to_header_value(self) -> String {
        match self {
            Self::Public(max_age) => format!("public, max-age={max_age}"),
            Self::Revalidate => "public, max-age=0, no-cache".to_string(),
            Self::NoStore => "private, max-age=0, no-cache, no-store".to_string(),
        }
    }

    /// Pragma header for HTTP/1.0 caches
    pub const fn pragma(self) -> Option<&'static str> {
        match self {
            Self::Public(_) => None,
            Self::Revalidate | Self::NoStore => Some("no-cache"),
        }
    }
}

/// Last second `httpdate` can represent (9999-12-31T23:59:59Z)
const MAX_HTTP_DATE: u64 = 253_402_300_799;

/// Format a Unix timestamp as an HTTP date
///
/// Times outside 1970..=9999 are clamped to the representable range.
pub fn format_http_date(timestamp: i64) -> String {
    let secs = u64::try_from(timestamp).unwrap_or(0).min(MAX_HTTP_DATE);
    httpdate::fmt_http_date(UNIX_EPOCH + Duration::from_secs(secs))
}

/// Quote a header parameter, escaping quotes and backslashes
pub fn quote_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '\'') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Build the cache headers for a response
///
/// # Arguments
/// * `last_modified` - Resource modification time, `0` or `None` if unknown
/// * `etag` - Unquoted entity tag, empty or `None` if unknown
/// * `max_age` - Freshness lifetime in seconds
/// * `now` - Current time, used for `Expires`
///
/// # Examples
/// ```
/// use std::time::UNIX_EPOCH;
/// use file_response::http::cache::cache_headers;
///
/// let headers = cache_headers(Some(1), Some("foo"), None, UNIX_EPOCH);
/// assert_eq!(headers[0].1, "public, max-age=0, no-cache");
/// assert_eq!(headers[2].1, "Thu, 01 Jan 1970 00:00:01 GMT");
/// assert_eq!(headers[3].1, "\"foo\"");
/// ```
pub fn cache_headers(
    last_modified: Option<i64>,
    etag: Option<&str>,
    max_age: Option<i64>,
    now: SystemTime,
) -> Vec<(HeaderName, String)> {
    let last_modified = last_modified.filter(|&t| t != 0);
    let etag = etag.filter(|t| !t.is_empty());
    let policy = CachePolicy::select(max_age, last_modified.is_some() || etag.is_some());

    let mut headers = Vec::with_capacity(4);
    if let CachePolicy::Public(age) = policy {
        let expires = now
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs())
            .saturating_add(age);
        headers.push((EXPIRES, format_http_date(i64::try_from(expires).unwrap_or(i64::MAX))));
    }
    headers.push((CACHE_CONTROL, policy.to_header_value()));
    if let Some(pragma) = policy.pragma() {
        headers.push((PRAGMA, pragma.to_string()));
    }
    if let Some(timestamp) = last_modified {
        headers.push((LAST_MODIFIED, format_http_date(timestamp)));
    }
    if let Some(etag) = etag {
        headers.push((ETAG, quote_string(etag)));
    }
    headers
}
