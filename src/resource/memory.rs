//! In-memory resource

use std::borrow::Cow;
use std::io::{self, Write};

use hyper::body::Bytes;

use super::{check_span, ByteSession, Metadata, Resource};
use crate::http::cache::generate_etag;

/// Content held in memory
///
/// The default entity tag is a digest of the content.
///
/// # Examples
/// ```
/// use file_response::resource::{MemoryResource, Metadata, Resource};
///
/// let resource = MemoryResource::new("hello world")
///     .with_metadata(Metadata::new().with_name("hello.txt"));
/// assert_eq!(resource.length(), 11);
/// assert_eq!(resource.content_type(), "text/plain");
/// ```
#[derive(Debug, Clone)]
pub struct MemoryResource {
    content: Bytes,
    metadata: Metadata,
    default_etag: String,
}

impl MemoryResource {
    pub fn new(content: impl Into<Bytes>) -> Self {
        let content = content.into();
        let default_etag = generate_etag(&content);
        Self {
            content,
            metadata: Metadata::new(),
            default_etag,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }
}

impl Resource for MemoryResource {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn length(&self) -> u64 {
        self.content.len() as u64
    }

    fn open(&self) -> io::Result<Box<dyn ByteSession + '_>> {
        Ok(Box::new(MemorySession {
            content: &self.content,
        }))
    }

    fn etag(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(
            self.metadata.etag().unwrap_or(&self.default_etag),
        ))
    }
}

struct MemorySession<'a> {
    content: &'a [u8],
}

impl ByteSession for MemorySession<'_> {
    fn output_bytes(&mut self, start: u64, end: u64, out: &mut dyn Write) -> io::Result<()> {
        check_span(start, end, self.content.len() as u64)?;
        let to_index = |pos: u64| {
            usize::try_from(pos).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
        };
        out.write_all(&self.content[to_index(start)?..=to_index(end)?])
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}
