//! HTTP Range request parsing module
//!
//! Range header parsing for partial content responses, including multiple
//! ranges and coalescing of nearby spans.

const UNIT_PREFIX: &str = "bytes=";

/// Inclusive byte span resolved against a resource length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte position
    pub start: u64,
    /// Last byte position (inclusive)
    pub end: u64,
}

impl ByteRange {
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered
    #[allow(clippy::len_without_is_empty)]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Whether the gap between the two spans is wider than `gap` bytes
    pub const fn is_separate(&self, other: &Self, gap: u64) -> bool {
        self.end.saturating_add(gap) < other.start || self.start > other.end.saturating_add(gap)
    }

    fn merge(&mut self, other: &Self) {
        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);
    }
}

/// Satisfiable ranges of one request, in header order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<ByteRange>,
    multipart: bool,
}

impl RangeSet {
    pub fn ranges(&self) -> &[ByteRange] {
        &self.ranges
    }

    pub fn into_ranges(self) -> Vec<ByteRange> {
        self.ranges
    }

    /// Whether the header listed more than one range
    ///
    /// Decided before unsatisfiable ranges are dropped, so a single surviving
    /// span may still be sent as `multipart/byteranges`.
    pub const fn is_multipart(&self) -> bool {
        self.multipart
    }

    /// Merge spans that lie within `gap` bytes of each other
    #[must_use]
    pub fn coalesce(self, gap: u64) -> Self {
        Self {
            ranges: coalesce_ranges(&self.ranges, gap),
            multipart: self.multipart,
        }
    }
}

/// Range header parse result
#[derive(Debug, PartialEq, Eq)]
pub enum RangeParseResult {
    /// At least one range can be served
    Satisfiable(RangeSet),
    /// Well-formed, but no range overlaps the resource - should return 416
    NotSatisfiable,
    /// No Range header or malformed (ignore, return full content)
    None,
}

/// One `first-last` spec before it is resolved against a length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeSpec {
    /// `-N`: the final bytes
    Suffix(u64),
    /// `N-`: from a position to the end
    From(u64),
    /// `N-M`
    Bounded(u64, u64),
}

impl RangeSpec {
    /// Resolve against `length`; `Err` if the bounds are inverted
    fn resolve(self, length: u64) -> Result<Option<ByteRange>, ()> {
        if let Self::Bounded(first, last) = self {
            if first > last {
                return Err(());
            }
        }

        let Some(max) = length.checked_sub(1) else {
            return Ok(None);
        };

        let (start, end) = match self {
            Self::Suffix(suffix) => (max.saturating_sub(suffix), max),
            Self::From(start) => (start, max),
            Self::Bounded(first, last) => (first, last.min(max)),
        };

        Ok((start <= end).then_some(ByteRange { start, end }))
    }
}

const fn is_lws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Digits of a range position; empty is `Some(None)`, overflow saturates
fn parse_position(digits: &str) -> Option<Option<u64>> {
    if digits.is_empty() {
        return Some(None);
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(Some(digits.parse().unwrap_or(u64::MAX)))
}

fn parse_spec(spec: &str) -> Option<RangeSpec> {
    let (first, last) = spec.trim_matches(is_lws).split_once('-')?;
    match (parse_position(first)?, parse_position(last)?) {
        (None, Some(suffix)) => Some(RangeSpec::Suffix(suffix)),
        (Some(start), None) => Some(RangeSpec::From(start)),
        (Some(start), Some(end)) => Some(RangeSpec::Bounded(start, end)),
        (None, None) => None,
    }
}

/// Parse HTTP Range header (bytes unit, one or more ranges)
///
/// Supported formats, separated by commas:
/// - `start-end` - Specific range, end clamped to the last byte
/// - `start-` - From start to end
/// - `-suffix` - Final bytes
///
/// A malformed header, a bare `-`, or any range whose end precedes its start
/// rejects the whole header. Ranges starting past the end are dropped.
///
/// # Arguments
/// * `range_header` - Value of Range header
/// * `file_size` - Total resource size
///
/// # Examples
/// ```
/// use file_response::http::range::{parse_range_header, ByteRange, RangeParseResult};
///
/// // Fixed range
/// match parse_range_header(Some("bytes=10-19"), 200) {
///     RangeParseResult::Satisfiable(set) => assert_eq!(set.ranges(), [ByteRange::new(10, 19)]),
///     _ => panic!("Expected Satisfiable"),
/// }
///
/// // No Range header
/// let result = parse_range_header(None, 200);
/// assert!(matches!(result, RangeParseResult::None));
/// ```
pub fn parse_range_header(range_header: Option<&str>, file_size: u64) -> RangeParseResult {
    let Some(header) = range_header else {
        return RangeParseResult::None;
    };

    let Some(specs) = header.strip_prefix(UNIT_PREFIX) else {
        return RangeParseResult::None; // Not bytes unit, ignore
    };

    let Some(specs) = specs.split(',').map(parse_spec).collect::<Option<Vec<_>>>() else {
        return RangeParseResult::None;
    };

    let mut ranges = Vec::with_capacity(specs.len());
    for spec in &specs {
        match spec.resolve(file_size) {
            Ok(Some(range)) => ranges.push(range),
            Ok(None) => {}
            Err(()) => return RangeParseResult::None,
        }
    }

    if ranges.is_empty() {
        return RangeParseResult::NotSatisfiable;
    }

    RangeParseResult::Satisfiable(RangeSet {
        ranges,
        multipart: specs.len() > 1,
    })
}

/// Merge ranges whose gap is at most `gap` bytes
///
/// Each range is folded into the first accepted span it is not separate from;
/// output keeps the order in which spans were first accepted.
pub fn coalesce_ranges(ranges: &[ByteRange], gap: u64) -> Vec<ByteRange> {
    let mut accepted: Vec<ByteRange> = Vec::with_capacity(ranges.len());

    for range in ranges {
        match accepted
            .iter_mut()
            .find(|scope| !range.is_separate(scope, gap))
        {
            Some(scope) => scope.merge(range),
            None => accepted.push(*range),
        }
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn satisfiable(header: &str, size: u64) -> RangeSet {
        match parse_range_header(Some(header), size) {
            RangeParseResult::Satisfiable(set) => set,
            other => panic!("Expected Satisfiable for {header:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_no_range() {
        assert_eq!(parse_range_header(None, 100), RangeParseResult::None);
    }

    #[test]
    fn test_standard_range() {
        let set = satisfiable("bytes=10-19", 200);
        assert_eq!(set.ranges(), [ByteRange::new(10, 19)]);
        assert_eq!(set.ranges()[0].len(), 10);
        assert!(!set.is_multipart());
    }

    #[test]
    fn test_suffix_range() {
        let set = satisfiable("bytes=-11", 200);
        assert_eq!(set.ranges(), [ByteRange::new(188, 199)]);
    }

    #[test]
    fn test_suffix_larger_than_file() {
        let set = satisfiable("bytes=-500", 200);
        assert_eq!(set.ranges(), [ByteRange::new(0, 199)]);
    }

    #[test]
    fn test_open_range() {
        let set = satisfiable("bytes=190-", 200);
        assert_eq!(set.ranges(), [ByteRange::new(190, 199)]);
    }

    #[test]
    fn test_end_clamped() {
        let set = satisfiable("bytes=150-1000", 200);
        assert_eq!(set.ranges(), [ByteRange::new(150, 199)]);
    }

    #[test]
    fn test_not_satisfiable() {
        assert_eq!(
            parse_range_header(Some("bytes=1000-2000"), 200),
            RangeParseResult::NotSatisfiable
        );
        assert_eq!(
            parse_range_header(Some("bytes=200-"), 200),
            RangeParseResult::NotSatisfiable
        );
        assert_eq!(
            parse_range_header(Some("bytes=0-10"), 0),
            RangeParseResult::NotSatisfiable
        );
    }

    #[test]
    fn test_invalid_format() {
        for header in [
            "foobar",
            "bytes=",
            "bytes=-",
            "bytes=-,-",
            "bytes=a-b",
            "bytes=1-2-3",
            "bytes=0-9,,20-29",
            "bytes=+1-2",
            "Bytes=0-9",
            "items=0-9",
        ] {
            assert_eq!(
                parse_range_header(Some(header), 100),
                RangeParseResult::None,
                "{header:?}"
            );
        }
    }

    #[test]
    fn test_inverted_range_rejects_header() {
        assert_eq!(parse_range_header(Some("bytes=1-0"), 100), RangeParseResult::None);
        assert_eq!(
            parse_range_header(Some("bytes=0-9,30-20"), 100),
            RangeParseResult::None
        );
        assert_eq!(
            parse_range_header(Some("bytes=5000-6000,30-20"), 100),
            RangeParseResult::None
        );
    }

    #[test]
    fn test_whitespace() {
        let set = satisfiable("bytes= 0-9 ,\t20-29 ", 100);
        assert_eq!(set.ranges(), [ByteRange::new(0, 9), ByteRange::new(20, 29)]);
        assert_eq!(parse_range_header(Some("bytes=0 - 9"), 100), RangeParseResult::None);
    }

    #[test]
    fn test_multipart_flag_survives_dropping() {
        let set = satisfiable("bytes=10-19,1000-2000", 200);
        assert_eq!(set.ranges(), [ByteRange::new(10, 19)]);
        assert!(set.is_multipart());
    }

    #[test]
    fn test_overflowing_positions_saturate() {
        let set = satisfiable("bytes=-99999999999999999999999", 10);
        assert_eq!(set.ranges(), [ByteRange::new(0, 9)]);
        assert_eq!(
            parse_range_header(Some("bytes=99999999999999999999999-"), 10),
            RangeParseResult::NotSatisfiable
        );
    }

    #[test]
    fn test_coalescing() {
        let merged = coalesce_ranges(&[ByteRange::new(25, 29), ByteRange::new(10, 19)], 98);
        assert_eq!(merged, [ByteRange::new(10, 29)]);
    }

    #[test]
    fn test_coalescing_keeps_first_seen_order() {
        let ranges = [ByteRange::new(190, 199), ByteRange::new(0, 9)];
        assert_eq!(coalesce_ranges(&ranges, 98), ranges);
    }

    #[test]
    fn test_coalescing_gap_boundary() {
        let a = ByteRange::new(0, 9);
        let b = ByteRange::new(15, 20);
        // Separate while end + gap stays below the next start
        assert_eq!(coalesce_ranges(&[a, b], 5), [a, b]);
        assert_eq!(coalesce_ranges(&[a, b], 6), [ByteRange::new(0, 20)]);
        assert!(a.is_separate(&b, 5));
        assert!(!b.is_separate(&a, 6));
    }

    #[test]
    fn test_coalescing_folds_into_first_match() {
        let ranges = [
            ByteRange::new(0, 10),
            ByteRange::new(100, 110),
            ByteRange::new(50, 60),
        ];
        assert_eq!(
            coalesce_ranges(&ranges, 45),
            [ByteRange::new(0, 60), ByteRange::new(100, 110)]
        );
    }

    #[test]
    fn test_range_set_coalesce() {
        let set = satisfiable("bytes=0-4,2-8,50-60", 100).coalesce(0);
        assert!(set.is_multipart());
        assert_eq!(set.into_ranges(), [ByteRange::new(0, 8), ByteRange::new(50, 60)]);
    }
}
