//! `multipart/byteranges` body construction
//!
//! A [`MultipartPlan`] is computed up front so the exact `Content-Length`
//! is known before any byte is written.

use std::fmt;
use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use tinyrand::{RandRange, Seeded, Wyrand};

use super::range::{coalesce_ranges, ByteRange};
use crate::resource::{with_session, Resource};

/// Source of multipart boundary strings
pub trait BoundaryGenerator {
    fn generate(&mut self) -> String;
}

const BOUNDARY_ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const BOUNDARY_RANDOM_LEN: usize = 31;

/// Boundaries of the form `b` followed by 31 random alphanumerics
pub struct RandomBoundary {
    rand: Wyrand,
}

impl fmt::Debug for RandomBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomBoundary").finish_non_exhaustive()
    }
}

impl RandomBoundary {
    /// Seeded from the current time
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Self::with_seed(seed as u64)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rand: Wyrand::seed(seed),
        }
    }
}

impl Default for RandomBoundary {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundaryGenerator for RandomBoundary {
    fn generate(&mut self) -> String {
        let mut boundary = String::with_capacity(BOUNDARY_RANDOM_LEN + 1);
        boundary.push('b');
        for _ in 0..BOUNDARY_RANDOM_LEN {
            let index = self.rand.next_range(0..BOUNDARY_ALPHABET.len() as u16);
            boundary.push(char::from(BOUNDARY_ALPHABET[usize::from(index)]));
        }
        boundary
    }
}

/// Always yields the same boundary
#[derive(Debug, Clone)]
pub struct FixedBoundary(pub String);

impl BoundaryGenerator for FixedBoundary {
    fn generate(&mut self) -> String {
        self.0.clone()
    }
}

#[derive(Debug, Clone)]
struct Part {
    range: ByteRange,
    separator: String,
}

/// Layout of a `multipart/byteranges` body
#[derive(Debug, Clone)]
pub struct MultipartPlan {
    boundary: String,
    parts: Vec<Part>,
    terminator: String,
}

fn separator(boundary: &str, content_type: &str, range: ByteRange, length: u64) -> String {
    format!(
        "\r\n--{boundary}\r\nContent-Type: {content_type}\r\nContent-Range: bytes {}-{}/{length}\r\n\r\n",
        range.start, range.end
    )
}

impl MultipartPlan {
    /// Plan the parts for `ranges` of a resource of `length` bytes
    ///
    /// Ranges closer together than the shortest possible part header are
    /// merged first, so merging never makes the body longer.
    pub fn new(ranges: &[ByteRange], content_type: &str, length: u64, boundary: String) -> Self {
        let gap = separator(&boundary, content_type, ByteRange::new(0, 0), length).len() as u64;
        let parts = coalesce_ranges(ranges, gap)
            .into_iter()
            .map(|range| Part {
                range,
                separator: separator(&boundary, content_type, range, length),
            })
            .collect();
        let terminator = format!("\r\n--{boundary}--\r\n");

        Self {
            boundary,
            parts,
            terminator,
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Spans that will be written, after merging
    pub fn ranges(&self) -> impl Iterator<Item = ByteRange> + '_ {
        self.parts.iter().map(|part| part.range)
    }

    /// Value for the response `Content-Type` header
    pub fn content_type(&self) -> String {
        format!("multipart/byteranges; boundary={}", self.boundary)
    }

    /// Exact number of body bytes [`MultipartPlan::write_to`] produces
    pub fn content_length(&self) -> u64 {
        self.parts
            .iter()
            .map(|part| part.separator.len() as u64 + part.range.len())
            .sum::<u64>()
            + self.terminator.len() as u64
    }

    /// Write every part through one session, then the closing delimiter
    pub fn write_to<R: Resource + ?Sized>(&self, resource: &R, out: &mut dyn Write) -> io::Result<()> {
        with_session(resource, |session| {
            for part in &self.parts {
                out.write_all(part.separator.as_bytes())?;
                session.output_bytes(part.range.start, part.range.end, out)?;
            }
            Ok(())
        })?;
        out.write_all(self.terminator.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{MemoryResource, Metadata};

    const BOUNDARY: &str = "bAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    fn digits() -> MemoryResource {
        let content: String = (0..100).map(|i| format!("{i:02}")).collect();
        MemoryResource::new(content).with_metadata(Metadata::new().with_name("content.txt"))
    }

    fn plan(ranges: &[ByteRange]) -> MultipartPlan {
        MultipartPlan::new(ranges, "text/plain", 200, BOUNDARY.to_string())
    }

    fn render(plan: &MultipartPlan) -> String {
        let mut out = Vec::new();
        plan.write_to(&digits(), &mut out).unwrap();
        assert_eq!(out.len() as u64, plan.content_length());
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_random_boundary() {
        let mut generator = RandomBoundary::with_seed(42);
        let first = generator.generate();
        let second = generator.generate();

        assert_eq!(first.len(), 32);
        assert!(first.starts_with('b'));
        assert!(first.bytes().all(|b| b.is_ascii_alphanumeric()));
        assert_ne!(first, second);
        assert_eq!(RandomBoundary::with_seed(42).generate(), first);
    }

    #[test]
    fn test_single_part() {
        let plan = plan(&[ByteRange::new(10, 19)]);
        assert_eq!(plan.content_length(), 148);
        assert_eq!(
            render(&plan),
            format!(
                "\r\n--{BOUNDARY}\r\nContent-Type: text/plain\r\nContent-Range: bytes 10-19/200\r\n\r\n\
                 0506070809\r\n--{BOUNDARY}--\r\n"
            )
        );
        assert_eq!(
            plan.content_type(),
            format!("multipart/byteranges; boundary={BOUNDARY}")
        );
    }

    #[test]
    fn test_close_ranges_are_merged() {
        let plan = plan(&[ByteRange::new(25, 29), ByteRange::new(10, 19)]);
        assert_eq!(plan.ranges().collect::<Vec<_>>(), [ByteRange::new(10, 29)]);
        assert_eq!(plan.content_length(), 158);
        assert!(render(&plan).contains("Content-Range: bytes 10-29/200\r\n\r\n05060708091011121314\r\n"));
    }

    #[test]
    fn test_distant_ranges_keep_order() {
        let plan = plan(&[ByteRange::new(190, 199), ByteRange::new(0, 9)]);
        assert_eq!(plan.content_length(), 256);

        let body = render(&plan);
        let first = body.find("bytes 190-199/200").unwrap();
        let second = body.find("bytes 0-9/200").unwrap();
        assert!(first < second);
        assert!(body.ends_with(&format!("0001020304\r\n--{BOUNDARY}--\r\n")));
    }

    #[test]
    fn test_merge_threshold() {
        // Part header for 0-0 is 96 bytes with this boundary and type
        let merged = plan(&[ByteRange::new(0, 9), ByteRange::new(105, 110)]);
        assert_eq!(merged.ranges().collect::<Vec<_>>(), [ByteRange::new(0, 110)]);
        assert_eq!(merged.content_length(), 249);

        let split = plan(&[ByteRange::new(0, 9), ByteRange::new(106, 110)]);
        assert_eq!(
            split.ranges().collect::<Vec<_>>(),
            [ByteRange::new(0, 9), ByteRange::new(106, 110)]
        );
        assert_eq!(split.content_length(), 251);
    }

    #[test]
    fn test_gap_is_rendered_part_header() {
        // 107 is 98 bytes past the end of 0-9, two more than the 0-0 header
        let split = plan(&[ByteRange::new(0, 9), ByteRange::new(107, 110)]);
        assert_eq!(split.ranges().count(), 2);
        assert_eq!(split.content_length(), 250);
        assert_eq!(render(&split).len(), 250);
    }

    #[test]
    fn test_random_boundary_debug() {
        assert_eq!(format!("{:?}", RandomBoundary::with_seed(7)), "RandomBoundary { .. }");
    }
}
