//! Validator matching
//!
//! Entity-tag list matching and last-modified comparison, shared by the
//! cache, precondition and `If-Range` checks.

use std::borrow::Cow;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, TimeZone};

use crate::error::{Error, Result};

/// A value that can be read as a Unix timestamp in seconds
pub trait IntoTimestamp {
    fn into_timestamp(self) -> Result<i64>;
}

impl IntoTimestamp for i64 {
    fn into_timestamp(self) -> Result<i64> {
        Ok(self)
    }
}

impl IntoTimestamp for i32 {
    fn into_timestamp(self) -> Result<i64> {
        Ok(i64::from(self))
    }
}

impl IntoTimestamp for u32 {
    fn into_timestamp(self) -> Result<i64> {
        Ok(i64::from(self))
    }
}

impl IntoTimestamp for u64 {
    fn into_timestamp(self) -> Result<i64> {
        i64::try_from(self)
            .map_err(|_| Error::invalid_argument(format!("timestamp {self} is out of range")))
    }
}

impl IntoTimestamp for SystemTime {
    fn into_timestamp(self) -> Result<i64> {
        let out_of_range = || Error::invalid_argument("system time is out of range");
        match self.duration_since(UNIX_EPOCH) {
            Ok(elapsed) => i64::try_from(elapsed.as_secs()).map_err(|_| out_of_range()),
            Err(before) => i64::try_from(before.duration().as_secs())
                .map(|secs| -secs)
                .map_err(|_| out_of_range()),
        }
    }
}

impl<Tz: TimeZone> IntoTimestamp for DateTime<Tz> {
    fn into_timestamp(self) -> Result<i64> {
        Ok(self.timestamp())
    }
}

impl IntoTimestamp for &str {
    fn into_timestamp(self) -> Result<i64> {
        self.trim()
            .parse()
            .map_err(|_| Error::invalid_argument(format!("'{self}' is not a timestamp")))
    }
}

impl IntoTimestamp for String {
    fn into_timestamp(self) -> Result<i64> {
        self.as_str().into_timestamp()
    }
}

/// Parse an HTTP date into a Unix timestamp
///
/// Accepts IMF-fixdate, RFC 850 and asctime forms, then falls back to RFC 2822.
pub fn parse_http_date(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(time) = httpdate::parse_http_date(value) {
        return time.into_timestamp().ok();
    }
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|date| date.timestamp())
}

/// Check whether the resource was modified after the date in `header_value`
///
/// A zero timestamp means the modification time is unknown and always counts
/// as modified, as does a header value that is not a date.
///
/// # Examples
/// ```
/// use file_response::http::matcher::modified_since;
///
/// let date = "Sun, 06 Nov 1994 08:49:38 GMT";
/// assert!(!modified_since(784_111_778_i64, date).unwrap());
/// assert!(modified_since(784_111_779_i64, date).unwrap());
/// assert!(modified_since(784_111_778_i64, "yesterday").unwrap());
/// ```
pub fn modified_since(last_modified: impl IntoTimestamp, header_value: &str) -> Result<bool> {
    let last_modified = last_modified.into_timestamp()?;
    if last_modified == 0 {
        return Ok(true);
    }

    Ok(parse_http_date(header_value).map_or(true, |since| last_modified > since))
}

/// Entity tag as written in a request header, escapes still in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityTag<'a> {
    weak: bool,
    opaque: &'a str,
}

impl<'a> EntityTag<'a> {
    pub const fn is_weak(&self) -> bool {
        self.weak
    }

    /// Raw quoted content without the surrounding quotes
    pub const fn opaque(&self) -> &'a str {
        self.opaque
    }

    /// Tag content with backslash escapes removed
    pub fn unescaped(&self) -> Cow<'a, str> {
        if !self.opaque.contains('\\') {
            return Cow::Borrowed(self.opaque);
        }

        let mut out = String::with_capacity(self.opaque.len());
        let mut chars = self.opaque.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                out.extend(chars.next());
            } else {
                out.push(c);
            }
        }
        Cow::Owned(out)
    }
}

const fn is_lws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Parse one `(W/)?"..."` tag at the start of `input`, returning the rest
fn parse_entity_tag(input: &str) -> Option<(EntityTag<'_>, &str)> {
    let (weak, rest) = match input.strip_prefix("W/") {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    let rest = rest.strip_prefix('"')?;
    let bytes = rest.as_bytes();

    let mut i = 0;
    loop {
        match *bytes.get(i)? {
            b'"' => break,
            b'\\' => {
                let escaped = rest[i + 1..].chars().next()?;
                if escaped == '\n' {
                    return None;
                }
                i += 1 + escaped.len_utf8();
            }
            _ => i += 1,
        }
    }

    // Empty quoted content is not a tag
    if i == 0 {
        return None;
    }

    Some((
        EntityTag {
            weak,
            opaque: &rest[..i],
        },
        &rest[i + 1..],
    ))
}

/// Parse a comma-separated entity tag list
///
/// Returns `None` if the value does not follow the list grammar; `*` is not a
/// list and is handled by [`match_etag`].
pub fn parse_tag_list(value: &str) -> Option<Vec<EntityTag<'_>>> {
    let mut rest = value.trim_start_matches(is_lws);
    let mut tags = Vec::new();

    loop {
        let (tag, tail) = parse_entity_tag(rest)?;
        tags.push(tag);

        let tail = tail.trim_start_matches(is_lws);
        if tail.is_empty() {
            return Some(tags);
        }
        rest = tail.strip_prefix(',')?.trim_start_matches(is_lws);
    }
}

/// Whether the whole value is exactly one quoted entity tag (weak or strong)
pub fn is_single_etag(value: &str) -> bool {
    matches!(parse_entity_tag(value), Some((_, "")))
}

/// Check if `tag` matches the entity tags listed in `header_value`
///
/// Weak tags in the header never match. `*` matches any non-empty tag, and a
/// value that is not a valid tag list matches nothing else.
///
/// # Examples
/// ```
/// use file_response::http::matcher::match_etag;
///
/// assert!(match_etag(Some("foo"), "\"bar\", \"foo\", \"baz\""));
/// assert!(match_etag(Some("foo"), "*"));
/// assert!(!match_etag(Some("foo"), "W/\"foo\""));
/// assert!(!match_etag(None, "*"));
/// ```
pub fn match_etag(tag: Option<&str>, header_value: &str) -> bool {
    let Some(tag) = tag.filter(|t| !t.is_empty()) else {
        return false;
    };

    match parse_tag_list(header_value) {
        Some(tags) => tags
            .iter()
            .filter(|t| !t.is_weak())
            .any(|t| t.unescaped() == tag),
        None => header_value == "*",
    }
}
