//! Servable resources
//!
//! A resource knows its length and validators and can copy any byte span of
//! itself to a sink. Byte output always happens inside a session: one
//! [`ByteSession`] may serve several spans (a multipart response) and is
//! closed explicitly on every exit path by [`with_session`].

mod file;
mod memory;

pub use file::{FileResource, DEFAULT_CHUNK_SIZE};
pub use memory::MemoryResource;

use std::borrow::Cow;
use std::io::{self, Write};
use std::path::Path;
use std::time::SystemTime;

use crate::error::Result;
use crate::http::matcher::IntoTimestamp;
use crate::http::mime;

/// Open handle used to copy byte spans out of a resource
pub trait ByteSession {
    /// Write exactly `end - start + 1` bytes starting at `start`
    fn output_bytes(&mut self, start: u64, end: u64, out: &mut dyn Write) -> io::Result<()>;

    /// Release the underlying handle
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Response metadata shared by all resource kinds
///
/// Unset fields fall back to defaults chosen by the resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    name: Option<String>,
    content_type: Option<String>,
    last_modified: Option<i64>,
    etag: Option<String>,
    max_age: Option<i64>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// File name offered in `Content-Disposition`, also used for MIME lookup
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_last_modified(mut self, timestamp: impl IntoTimestamp) -> Result<Self> {
        self.last_modified = Some(timestamp.into_timestamp()?);
        Ok(self)
    }

    /// Unquoted entity tag; an empty tag disables tag validation
    #[must_use]
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    #[must_use]
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Set max-age so that the response expires at `timestamp`
    pub fn with_expires(self, timestamp: impl IntoTimestamp) -> Result<Self> {
        self.with_expires_at(timestamp, SystemTime::now())
    }

    fn with_expires_at(mut self, timestamp: impl IntoTimestamp, now: SystemTime) -> Result<Self> {
        let expires = timestamp.into_timestamp()?;
        self.max_age = Some(expires.saturating_sub(now.into_timestamp()?));
        Ok(self)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub const fn last_modified(&self) -> Option<i64> {
        self.last_modified
    }

    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub const fn max_age(&self) -> Option<i64> {
        self.max_age
    }
}

/// A static resource that can be served whole or in byte ranges
pub trait Resource {
    fn metadata(&self) -> &Metadata;

    /// Total length in bytes
    fn length(&self) -> u64;

    /// Start a byte output session
    fn open(&self) -> io::Result<Box<dyn ByteSession + '_>>;

    fn name(&self) -> Option<Cow<'_, str>> {
        self.metadata().name().map(Cow::Borrowed)
    }

    /// Explicit content type, else looked up from the name's extension
    fn content_type(&self) -> Cow<'_, str> {
        if let Some(content_type) = self.metadata().content_type() {
            return Cow::Borrowed(content_type);
        }
        let name = self.name();
        let extension = name
            .as_deref()
            .and_then(|n| Path::new(n).extension())
            .and_then(|e| e.to_str());
        Cow::Borrowed(mime::get_content_type(extension))
    }

    fn last_modified(&self) -> Option<i64> {
        self.metadata().last_modified()
    }

    fn etag(&self) -> Option<Cow<'_, str>> {
        self.metadata().etag().map(Cow::Borrowed)
    }

    fn max_age(&self) -> Option<i64> {
        self.metadata().max_age()
    }

    /// Write the whole resource
    fn output(&self, out: &mut dyn Write) -> io::Result<()> {
        let Some(end) = self.length().checked_sub(1) else {
            return Ok(());
        };
        with_session(self, |session| session.output_bytes(0, end, out))
    }
}

/// Run `f` inside a session, closing it whether `f` succeeds or fails
///
/// An error from `f` takes precedence over an error from closing.
pub fn with_session<R, T, F>(resource: &R, f: F) -> io::Result<T>
where
    R: Resource + ?Sized,
    F: FnOnce(&mut dyn ByteSession) -> io::Result<T>,
{
    let mut session = resource.open()?;
    let result = f(session.as_mut());
    let closed = session.close();
    let value = result?;
    closed?;
    Ok(value)
}

/// Check a span against a resource length before reading it
pub(crate) fn check_span(start: u64, end: u64, length: u64) -> io::Result<()> {
    if start > end || end >= length {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("byte span {start}-{end} is outside of 0-{length}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::{Duration, UNIX_EPOCH};

    /// Resource whose sessions fail on demand and count closes
    struct Flaky {
        metadata: Metadata,
        fail_read: bool,
        closed: Cell<usize>,
    }

    struct FlakySession<'a> {
        owner: &'a Flaky,
    }

    impl ByteSession for FlakySession<'_> {
        fn output_bytes(&mut self, start: u64, end: u64, out: &mut dyn Write) -> io::Result<()> {
            if self.owner.fail_read {
                return Err(io::Error::new(io::ErrorKind::Other, "read failed"));
            }
            for _ in start..=end {
                out.write_all(b"x")?;
            }
            Ok(())
        }

        fn close(self: Box<Self>) -> io::Result<()> {
            self.owner.closed.set(self.owner.closed.get() + 1);
            Ok(())
        }
    }

    impl Resource for Flaky {
        fn metadata(&self) -> &Metadata {
            &self.metadata
        }

        fn length(&self) -> u64 {
            4
        }

        fn open(&self) -> io::Result<Box<dyn ByteSession + '_>> {
            Ok(Box::new(FlakySession { owner: self }))
        }
    }

    fn flaky(fail_read: bool) -> Flaky {
        Flaky {
            metadata: Metadata::new(),
            fail_read,
            closed: Cell::new(0),
        }
    }

    #[test]
    fn test_session_closed_on_success() {
        let resource = flaky(false);
        let mut out = Vec::new();
        resource.output(&mut out).unwrap();
        assert_eq!(out, b"xxxx");
        assert_eq!(resource.closed.get(), 1);
    }

    #[test]
    fn test_session_closed_on_error() {
        let resource = flaky(true);
        let mut out = Vec::new();
        let err = resource.output(&mut out).unwrap_err();
        assert_eq!(err.to_string(), "read failed");
        assert_eq!(resource.closed.get(), 1);
    }

    #[test]
    fn test_content_type_from_name() {
        let mut resource = flaky(false);
        assert_eq!(resource.content_type(), "application/octet-stream");

        resource.metadata = Metadata::new().with_name("movie.mp4");
        assert_eq!(resource.content_type(), "video/mp4");

        resource.metadata = Metadata::new()
            .with_name("movie.mp4")
            .with_content_type("application/x-custom");
        assert_eq!(resource.content_type(), "application/x-custom");
    }

    #[test]
    fn test_metadata_builder() {
        let metadata = Metadata::new()
            .with_etag("abc")
            .with_max_age(60)
            .with_last_modified(UNIX_EPOCH + Duration::from_secs(5))
            .unwrap();
        assert_eq!(metadata.etag(), Some("abc"));
        assert_eq!(metadata.max_age(), Some(60));
        assert_eq!(metadata.last_modified(), Some(5));
        assert!(Metadata::new().with_last_modified("soon").is_err());
    }

    #[test]
    fn test_expires_sets_max_age() {
        let now = UNIX_EPOCH + Duration::from_secs(1000);
        let metadata = Metadata::new().with_expires_at(1600_i64, now).unwrap();
        assert_eq!(metadata.max_age(), Some(600));
    }

    #[test]
    fn test_check_span() {
        assert!(check_span(0, 9, 10).is_ok());
        assert!(check_span(0, 10, 10).is_err());
        assert!(check_span(5, 4, 10).is_err());
    }
}
