//! Filesystem-backed resource

use std::borrow::Cow;
use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File};
use std::hash::Hasher;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{check_span, ByteSession, Metadata, Resource};
use crate::error::{Error, Result};
use crate::http::matcher::IntoTimestamp;

/// Read buffer size used when copying file bytes
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// A regular file served from disk
///
/// Size and modification time are captured when the resource is created.
/// Unless overridden, the entity tag is `{size:x}-{mtime:x}`, or a digest of
/// the file content when [`FileResource::with_content_tag`] is enabled.
///
/// # Examples
/// ```no_run
/// use file_response::resource::{FileResource, Metadata, Resource};
///
/// let resource = FileResource::new("/srv/video.mp4")?
///     .with_metadata(Metadata::new().with_max_age(3600));
/// assert_eq!(resource.content_type(), "video/mp4");
/// # Ok::<(), file_response::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileResource {
    path: PathBuf,
    metadata: Metadata,
    length: u64,
    modified: Option<i64>,
    default_etag: String,
    chunk_size: usize,
}

impl FileResource {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stat = match fs::metadata(path) {
            Ok(stat) if stat.is_file() => stat,
            _ => return Err(Error::invalid_argument(format!("file not found: {}", path.display()))),
        };

        let length = stat.len();
        let modified = stat.modified().ok().and_then(|t| t.into_timestamp().ok());

        Ok(Self {
            path: path.to_path_buf(),
            metadata: Metadata::new(),
            length,
            modified,
            default_etag: format!("{:x}-{:x}", length, modified.unwrap_or(0)),
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Replace the response metadata; unset fields keep their file defaults
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Derive the default entity tag from the file content
    ///
    /// Reads the whole file once.
    pub fn with_content_tag(mut self, enabled: bool) -> Result<Self> {
        if enabled {
            self.default_etag = content_digest(&self.path, self.chunk_size)?;
        }
        Ok(self)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn content_digest(path: &Path, chunk_size: usize) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = DefaultHasher::new();
    let mut buffer = vec![0; chunk_size];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.write(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finish()))
}

impl Resource for FileResource {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn open(&self) -> io::Result<Box<dyn ByteSession + '_>> {
        Ok(Box::new(FileSession {
            file: File::open(&self.path)?,
            length: self.length,
            buffer: vec![0; self.chunk_size],
        }))
    }

    /// Explicit name, else the file's base name
    fn name(&self) -> Option<Cow<'_, str>> {
        self.metadata
            .name()
            .map(Cow::Borrowed)
            .or_else(|| self.path.file_name().map(|n| n.to_string_lossy()))
    }

    fn last_modified(&self) -> Option<i64> {
        self.metadata.last_modified().or(self.modified)
    }

    fn etag(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(
            self.metadata.etag().unwrap_or(&self.default_etag),
        ))
    }
}

struct FileSession {
    file: File,
    length: u64,
    buffer: Vec<u8>,
}

impl ByteSession for FileSession {
    fn output_bytes(&mut self, start: u64, end: u64, out: &mut dyn Write) -> io::Result<()> {
        check_span(start, end, self.length)?;
        self.file.seek(SeekFrom::Start(start))?;

        let mut remaining = end - start + 1;
        while remaining > 0 {
            let want = usize::try_from(remaining).map_or(self.buffer.len(), |r| r.min(self.buffer.len()));
            let read = self.file.read(&mut self.buffer[..want])?;
            if read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("file ended {remaining} bytes before byte {end}"),
                ));
            }
            out.write_all(&self.buffer[..read])?;
            remaining -= read as u64;
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        drop(self.file);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::with_session;
    use tempfile::TempDir;

    fn fixture(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    fn digits() -> Vec<u8> {
        (0..100).flat_map(|i| format!("{i:02}").into_bytes()).collect()
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = FileResource::new(dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        // Directories are not servable either
        let err = FileResource::new(dir.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_defaults() {
        let dir = TempDir::new().unwrap();
        let path = fixture(&dir, "content.txt", &digits());
        let resource = FileResource::new(&path).unwrap();

        assert_eq!(resource.length(), 200);
        assert_eq!(resource.name().as_deref(), Some("content.txt"));
        assert_eq!(resource.content_type(), "text/plain");

        let mtime = resource.last_modified().unwrap();
        assert!(mtime > 0);
        assert_eq!(resource.etag().unwrap(), format!("c8-{mtime:x}"));
    }

    #[test]
    fn test_metadata_overrides() {
        let dir = TempDir::new().unwrap();
        let path = fixture(&dir, "content.txt", b"abc");
        let resource = FileResource::new(&path).unwrap().with_metadata(
            Metadata::new()
                .with_name("report.pdf")
                .with_etag("")
                .with_last_modified(0_i64)
                .unwrap(),
        );

        assert_eq!(resource.name().as_deref(), Some("report.pdf"));
        assert_eq!(resource.content_type(), "application/pdf");
        assert_eq!(resource.etag().unwrap(), "");
        assert_eq!(resource.last_modified(), Some(0));
    }

    #[test]
    fn test_content_tag() {
        let dir = TempDir::new().unwrap();
        let a = fixture(&dir, "a.bin", b"same bytes");
        let b = fixture(&dir, "b.bin", b"same bytes");
        let c = fixture(&dir, "c.bin", b"other bytes");

        let tag = |path: &Path| {
            FileResource::new(path)
                .unwrap()
                .with_chunk_size(3)
                .with_content_tag(true)
                .unwrap()
                .etag()
                .unwrap()
                .into_owned()
        };
        assert_eq!(tag(&a), tag(&b));
        assert_ne!(tag(&a), tag(&c));

        // Explicit tags still win
        let resource = FileResource::new(&a)
            .unwrap()
            .with_content_tag(true)
            .unwrap()
            .with_metadata(Metadata::new().with_etag("fixed"));
        assert_eq!(resource.etag().unwrap(), "fixed");
    }

    #[test]
    fn test_output_spans_in_one_session() {
        let dir = TempDir::new().unwrap();
        let path = fixture(&dir, "content.txt", &digits());
        let resource = FileResource::new(&path).unwrap().with_chunk_size(4);

        let mut out = Vec::new();
        with_session(&resource, |session| {
            session.output_bytes(10, 19, &mut out)?;
            session.output_bytes(188, 199, &mut out)?;
            session.output_bytes(0, 0, &mut out)
        })
        .unwrap();
        assert_eq!(out, b"05060708099495969798990");
    }

    #[test]
    fn test_output_whole_file() {
        let dir = TempDir::new().unwrap();
        let path = fixture(&dir, "content.txt", &digits());
        let resource = FileResource::new(&path).unwrap();

        let mut out = Vec::new();
        resource.output(&mut out).unwrap();
        assert_eq!(out, digits());

        let empty = FileResource::new(fixture(&dir, "empty.txt", b"")).unwrap();
        let mut out = Vec::new();
        empty.output(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_span_outside_file() {
        let dir = TempDir::new().unwrap();
        let path = fixture(&dir, "content.txt", b"abc");
        let resource = FileResource::new(&path).unwrap();

        let mut out = Vec::new();
        let err = with_session(&resource, |session| session.output_bytes(1, 3, &mut out)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(out.is_empty());
    }

    #[test]
    fn test_truncated_file() {
        let dir = TempDir::new().unwrap();
        let path = fixture(&dir, "content.txt", &digits());
        let resource = FileResource::new(&path).unwrap();
        File::create(&path).unwrap().write_all(b"short").unwrap();

        let mut out = Vec::new();
        let err = resource.output(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(out, b"short");
    }
}
