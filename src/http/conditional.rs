//! Conditional request evaluation
//!
//! Decides between 200, 206, 304 and 412 from the `If-*` request headers and
//! the validators of the resource being served.

use hyper::StatusCode;

use crate::error::{Error, Result};
use crate::http::headers::RequestHeaders;
use crate::http::matcher::{self, is_single_etag, match_etag};

const IF_MODIFIED_SINCE: &str = "if-modified-since";
const IF_NONE_MATCH: &str = "if-none-match";
const IF_UNMODIFIED_SINCE: &str = "if-unmodified-since";
const IF_MATCH: &str = "if-match";
const IF_RANGE: &str = "if-range";
const RANGE: &str = "range";

/// Outcome of conditional evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    PartialContent,
    NotModified,
    PreconditionFailed,
}

impl Verdict {
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::Ok => StatusCode::OK,
            Self::PartialContent => StatusCode::PARTIAL_CONTENT,
            Self::NotModified => StatusCode::NOT_MODIFIED,
            Self::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
        }
    }
}

/// Resource identity used for validation
///
/// A last-modified time of `0` and an empty entity tag count as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Validators<'a> {
    pub last_modified: Option<i64>,
    pub etag: Option<&'a str>,
}

impl<'a> Validators<'a> {
    pub const fn new(last_modified: Option<i64>, etag: Option<&'a str>) -> Self {
        Self {
            last_modified,
            etag,
        }
    }

    /// Build validators from any timestamp representation
    pub fn with_timestamp(
        last_modified: impl matcher::IntoTimestamp,
        etag: Option<&'a str>,
    ) -> Result<Self> {
        Ok(Self::new(Some(last_modified.into_timestamp()?), etag))
    }

    /// Known, non-zero modification time
    pub fn modified(&self) -> Option<i64> {
        self.last_modified.filter(|&t| t != 0)
    }

    /// Known, non-empty entity tag
    pub fn tag(&self) -> Option<&'a str> {
        self.etag.filter(|t| !t.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.modified().is_none() && self.tag().is_none()
    }

    fn require(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::invalid_argument(
                "either an entity tag or a last modified date is required",
            ));
        }
        Ok(())
    }

    /// An `If-Range` date against an unknown modification time counts as modified
    fn modified_since(&self, header_value: &str) -> Result<bool> {
        self.modified()
            .map_or(Ok(true), |t| matcher::modified_since(t, header_value))
    }
}

/// Conditional request evaluator over a set of request headers
///
/// # Examples
/// ```
/// use file_response::http::conditional::{ConditionalGet, Validators, Verdict};
/// use file_response::http::headers::HeaderSet;
/// use hyper::Method;
///
/// let headers = HeaderSet::from_pairs([("If-None-Match", "\"foo\"")]).with_method(Method::GET);
/// let verdict = ConditionalGet::new(&headers)
///     .response_status(&Validators::new(None, Some("foo")))
///     .unwrap();
/// assert_eq!(verdict, Verdict::NotModified);
/// ```
pub struct ConditionalGet<'h, H: ?Sized> {
    headers: &'h H,
}

impl<'h, H: RequestHeaders + ?Sized> ConditionalGet<'h, H> {
    pub const fn new(headers: &'h H) -> Self {
        Self { headers }
    }

    /// Classify the request into one of the four verdicts
    pub fn response_status(&self, validators: &Validators<'_>) -> Result<Verdict> {
        if self.check_cache(validators)? {
            return Ok(if self.headers.has(IF_NONE_MATCH) && !self.is_safe_method() {
                Verdict::PreconditionFailed
            } else {
                Verdict::NotModified
            });
        }

        if !self.check_conditions(validators)? {
            return Ok(Verdict::PreconditionFailed);
        }

        if self.headers.has(IF_RANGE) && !self.check_range(validators)? {
            return Ok(Verdict::Ok);
        }

        Ok(if self.headers.has(RANGE) {
            Verdict::PartialContent
        } else {
            Verdict::Ok
        })
    }

    /// Whether the client's cached copy is still valid
    ///
    /// Uses `If-Modified-Since` and `If-None-Match`; false when neither is sent.
    pub fn check_cache(&self, validators: &Validators<'_>) -> Result<bool> {
        self.match_conditionals(validators, IF_MODIFIED_SINCE, IF_NONE_MATCH, false)
    }

    /// Whether the request preconditions hold
    ///
    /// Uses `If-Unmodified-Since` and `If-Match`; true when neither is sent.
    pub fn check_conditions(&self, validators: &Validators<'_>) -> Result<bool> {
        self.match_conditionals(validators, IF_UNMODIFIED_SINCE, IF_MATCH, true)
    }

    /// Whether the `If-Range` validator still allows a partial response
    ///
    /// False unless both `Range` and `If-Range` are present.
    pub fn check_range(&self, validators: &Validators<'_>) -> Result<bool> {
        validators.require()?;

        if !self.headers.has(RANGE) {
            return Ok(false);
        }
        let Some(value) = self.value(IF_RANGE) else {
            return Ok(false);
        };

        if is_single_etag(value) {
            return Ok(validators.tag().is_some() && match_etag(validators.tag(), value));
        }

        Ok(!validators.modified_since(value)?)
    }

    fn match_conditionals(
        &self,
        validators: &Validators<'_>,
        time_header: &str,
        tag_header: &str,
        default: bool,
    ) -> Result<bool> {
        validators.require()?;

        if !self.headers.has(time_header) && !self.headers.has(tag_header) {
            return Ok(default);
        }
        self.check_conflict()?;

        // An entity tag alone decides when the modification time is unknown
        if let (Some(last_modified), Some(value)) = (validators.modified(), self.value(time_header)) {
            if matcher::modified_since(last_modified, value)? {
                return Ok(false);
            }
        }

        if let Some(value) = self.value(tag_header) {
            if !match_etag(validators.tag(), value) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Header value, with unreadable bytes read as an empty (malformed) value
    fn value(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .or_else(|| self.headers.has(name).then_some(""))
    }

    /// Cache-direction and precondition-direction headers cannot be combined
    fn check_conflict(&self) -> Result<()> {
        let has = |name| self.headers.has(name);
        if (has(IF_MODIFIED_SINCE) || has(IF_NONE_MATCH)) && (has(IF_UNMODIFIED_SINCE) || has(IF_MATCH)) {
            return Err(Error::undefined_result(
                "undefined combination of conditional headers",
            ));
        }
        Ok(())
    }

    fn is_safe_method(&self) -> bool {
        self.headers
            .method()
            .is_some_and(|m| m.eq_ignore_ascii_case("GET") || m.eq_ignore_ascii_case("HEAD"))
    }
}
