//! HTTP response orchestration module
//!
//! Evaluates the conditional headers of a request against a resource and
//! writes the matching 200, 206, 304, 412 or 416 response through a
//! [`ResponseWriter`].

use std::io::Write;
use std::time::SystemTime;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    HeaderName, HeaderValue, ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE,
    CONTENT_TYPE, RANGE,
};
use hyper::{HeaderMap, Response, StatusCode};

use super::cache::{cache_headers, quote_string};
use super::conditional::{ConditionalGet, Validators, Verdict};
use super::headers::RequestHeaders;
use super::multipart::{BoundaryGenerator, MultipartPlan, RandomBoundary};
use super::range::{parse_range_header, ByteRange, RangeParseResult};
use crate::error::{Error, Result};
use crate::logger;
use crate::resource::{with_session, Resource};

/// Sink for one HTTP response
pub trait ResponseWriter {
    /// Whether status and headers can no longer be changed
    fn headers_sent(&self) -> bool;

    fn set_status(&mut self, status: StatusCode);

    /// Set a header, replacing any previous value
    fn set_header(&mut self, name: HeaderName, value: &str);

    /// Body sink; taking it commits status and headers
    fn body(&mut self) -> &mut dyn Write;
}

/// Response collected in memory, convertible into a hyper response
#[derive(Debug, Default)]
pub struct BufferedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    committed: bool,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as a string, `None` if absent or not visible ASCII
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Build the hyper response
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let status = self.status;
        let mut builder = Response::builder().status(status);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers);
        }
        builder
            .body(Full::new(Bytes::from(self.body)))
            .unwrap_or_else(|e| {
                log_build_error(status, &e);
                Response::new(Full::new(Bytes::new()))
            })
    }
}

impl ResponseWriter for BufferedResponse {
    fn headers_sent(&self) -> bool {
        self.committed
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn set_header(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(e) => logger::log_warning(&format!("Dropping {name} header {value:?}: {e}")),
        }
    }

    fn body(&mut self) -> &mut dyn Write {
        self.committed = true;
        &mut self.body
    }
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
}

/// Serves a resource for one request
///
/// # Examples
/// ```
/// use file_response::http::headers::HeaderSet;
/// use file_response::http::response::{BufferedResponse, ResponseHandler};
/// use file_response::resource::{MemoryResource, Metadata};
/// use hyper::{Method, StatusCode};
///
/// let resource = MemoryResource::new("0123456789")
///     .with_metadata(Metadata::new().with_name("digits.txt"));
/// let headers = HeaderSet::from_pairs([("Range", "bytes=2-4")]).with_method(Method::GET);
///
/// let mut response = BufferedResponse::new();
/// let status = ResponseHandler::new(&headers).send(&resource, &mut response, true)?;
/// assert_eq!(status, StatusCode::PARTIAL_CONTENT);
/// assert_eq!(response.body_bytes(), b"234");
/// # Ok::<(), file_response::Error>(())
/// ```
pub struct ResponseHandler<'h, H: ?Sized> {
    headers: &'h H,
    boundary: Box<dyn BoundaryGenerator>,
    now: Option<SystemTime>,
}

impl<'h, H: RequestHeaders + ?Sized> ResponseHandler<'h, H> {
    pub fn new(headers: &'h H) -> Self {
        Self {
            headers,
            boundary: Box::new(RandomBoundary::new()),
            now: None,
        }
    }

    /// Use `generator` for multipart boundaries
    #[must_use]
    pub fn with_boundary(mut self, generator: impl BoundaryGenerator + 'static) -> Self {
        self.boundary = Box::new(generator);
        self
    }

    /// Fix the time used for `Expires`
    #[must_use]
    pub fn with_clock(mut self, now: SystemTime) -> Self {
        self.now = Some(now);
        self
    }

    /// Write the response for `resource` and return its status
    ///
    /// With `attach`, full responses carry `Content-Disposition: attachment`.
    /// Conflicting conditional headers fail with [`Error::UndefinedResult`]
    /// before anything is written.
    pub fn send<R: Resource + ?Sized>(
        &mut self,
        resource: &R,
        writer: &mut dyn ResponseWriter,
        attach: bool,
    ) -> Result<StatusCode> {
        if writer.headers_sent() {
            return Err(Error::HeadersSent);
        }

        let etag = resource.etag();
        let validators = Validators::new(resource.last_modified(), etag.as_deref());
        if validators.is_empty() {
            return if self.headers.has(RANGE.as_str()) {
                self.send_partial(resource, writer)
            } else {
                self.send_normal(resource, writer, attach)
            };
        }

        let verdict = ConditionalGet::new(self.headers).response_status(&validators)?;
        logger::log_debug(&format!("Conditional request verdict: {verdict:?}"));
        match verdict {
            Verdict::Ok => self.send_normal(resource, writer, attach),
            Verdict::PartialContent => self.send_partial(resource, writer),
            Verdict::NotModified => Ok(self.send_not_modified(resource, writer)),
            Verdict::PreconditionFailed => {
                writer.set_status(StatusCode::PRECONDITION_FAILED);
                Ok(StatusCode::PRECONDITION_FAILED)
            }
        }
    }

    fn is_head(&self) -> bool {
        self.headers
            .method()
            .is_some_and(|m| m.eq_ignore_ascii_case("HEAD"))
    }

    fn set_cache_headers<R: Resource + ?Sized>(&self, resource: &R, writer: &mut dyn ResponseWriter) {
        let headers = cache_headers(
            resource.last_modified(),
            resource.etag().as_deref(),
            resource.max_age(),
            self.now.unwrap_or_else(SystemTime::now),
        );
        for (name, value) in headers {
            writer.set_header(name, &value);
        }
    }

    fn send_normal<R: Resource + ?Sized>(
        &self,
        resource: &R,
        writer: &mut dyn ResponseWriter,
        attach: bool,
    ) -> Result<StatusCode> {
        writer.set_status(StatusCode::OK);
        writer.set_header(ACCEPT_RANGES, "bytes");
        writer.set_header(CONTENT_TYPE, &resource.content_type());
        writer.set_header(CONTENT_LENGTH, &resource.length().to_string());
        if attach {
            if let Some(name) = resource.name().filter(|n| !n.is_empty()) {
                writer.set_header(
                    CONTENT_DISPOSITION,
                    &format!("attachment; filename={}", quote_string(&name)),
                );
            }
        }
        self.set_cache_headers(resource, writer);

        if !self.is_head() {
            resource.output(writer.body())?;
        }
        Ok(StatusCode::OK)
    }

    fn send_not_modified<R: Resource + ?Sized>(
        &self,
        resource: &R,
        writer: &mut dyn ResponseWriter,
    ) -> StatusCode {
        writer.set_status(StatusCode::NOT_MODIFIED);
        self.set_cache_headers(resource, writer);
        StatusCode::NOT_MODIFIED
    }

    fn send_partial<R: Resource + ?Sized>(
        &mut self,
        resource: &R,
        writer: &mut dyn ResponseWriter,
    ) -> Result<StatusCode> {
        let length = resource.length();
        let header = self.headers.get(RANGE.as_str());

        match parse_range_header(header, length) {
            RangeParseResult::None => {
                logger::log_debug(&format!("Ignoring malformed Range header {header:?}"));
                self.send_normal(resource, writer, false)
            }
            RangeParseResult::NotSatisfiable => {
                writer.set_status(StatusCode::RANGE_NOT_SATISFIABLE);
                writer.set_header(CONTENT_RANGE, &format!("bytes */{length}"));
                Ok(StatusCode::RANGE_NOT_SATISFIABLE)
            }
            RangeParseResult::Satisfiable(set) => match set.ranges() {
                [range] if !set.is_multipart() => self.send_single(resource, writer, *range),
                ranges => self.send_multipart(resource, writer, ranges),
            },
        }
    }

    fn send_single<R: Resource + ?Sized>(
        &self,
        resource: &R,
        writer: &mut dyn ResponseWriter,
        range: ByteRange,
    ) -> Result<StatusCode> {
        writer.set_status(StatusCode::PARTIAL_CONTENT);
        writer.set_header(ACCEPT_RANGES, "bytes");
        writer.set_header(CONTENT_TYPE, &resource.content_type());
        writer.set_header(CONTENT_LENGTH, &range.len().to_string());
        writer.set_header(
            CONTENT_RANGE,
            &format!("bytes {}-{}/{}", range.start, range.end, resource.length()),
        );
        self.set_cache_headers(resource, writer);

        if !self.is_head() {
            let out = writer.body();
            with_session(resource, |session| {
                session.output_bytes(range.start, range.end, out)
            })?;
        }
        Ok(StatusCode::PARTIAL_CONTENT)
    }

    fn send_multipart<R: Resource + ?Sized>(
        &mut self,
        resource: &R,
        writer: &mut dyn ResponseWriter,
        ranges: &[ByteRange],
    ) -> Result<StatusCode> {
        let plan = MultipartPlan::new(
            ranges,
            &resource.content_type(),
            resource.length(),
            self.boundary.generate(),
        );

        writer.set_status(StatusCode::PARTIAL_CONTENT);
        writer.set_header(ACCEPT_RANGES, "bytes");
        writer.set_header(CONTENT_TYPE, &plan.content_type());
        writer.set_header(CONTENT_LENGTH, &plan.content_length().to_string());
        self.set_cache_headers(resource, writer);

        if !self.is_head() {
            plan.write_to(resource, writer.body())?;
        }
        Ok(StatusCode::PARTIAL_CONTENT)
    }
}
