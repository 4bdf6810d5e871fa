//! Request header lookup
//!
//! The conditional evaluator and the range parser only ever read the request
//! through [`RequestHeaders`], so they work the same on a live `hyper` request
//! and on an in-memory [`HeaderSet`].

use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Request};

/// Read-only, case-insensitive view of the request headers
pub trait RequestHeaders {
    /// Value of the header, `None` if absent or not valid visible ASCII
    fn get(&self, name: &str) -> Option<&str>;

    /// Whether the header is present at all (an empty value still counts)
    fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Request method, if known
    fn method(&self) -> Option<&str>;
}

/// In-memory header set with an optional request method
///
/// # Examples
/// ```
/// use file_response::http::headers::{HeaderSet, RequestHeaders};
///
/// let headers = HeaderSet::from_pairs([("If-None-Match", "\"foo\"")]);
/// assert_eq!(headers.get("if-none-match"), Some("\"foo\""));
/// assert!(!headers.has("range"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct HeaderSet {
    headers: HeaderMap,
    method: Option<Method>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a header set from name/value pairs, skipping invalid entries
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut set = Self::new();
        for (name, value) in pairs {
            set.insert(name, value);
        }
        set
    }

    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Insert a header, returning false if the name or value is not valid HTTP
    pub fn insert(&mut self, name: &str, value: &str) -> bool {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) else {
            return false;
        };
        self.headers.insert(name, value);
        true
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = Some(method);
    }

    pub const fn header_map(&self) -> &HeaderMap {
        &self.headers
    }
}

impl From<HeaderMap> for HeaderSet {
    fn from(headers: HeaderMap) -> Self {
        Self {
            headers,
            method: None,
        }
    }
}

impl RequestHeaders for HeaderSet {
    fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn has(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    fn method(&self) -> Option<&str> {
        self.method.as_ref().map(Method::as_str)
    }
}

impl RequestHeaders for HeaderMap {
    fn get(&self, name: &str) -> Option<&str> {
        Self::get(self, name).and_then(|v| v.to_str().ok())
    }

    fn has(&self, name: &str) -> bool {
        self.contains_key(name)
    }

    fn method(&self) -> Option<&str> {
        None
    }
}

impl<B> RequestHeaders for Request<B> {
    fn get(&self, name: &str) -> Option<&str> {
        self.headers().get(name).and_then(|v| v.to_str().ok())
    }

    fn has(&self, name: &str) -> bool {
        self.headers().contains_key(name)
    }

    fn method(&self) -> Option<&str> {
        Some(Self::method(self).as_str())
    }
}
