//! Canonical string construction for signed requests.
//!
//! The canonical string is the exact byte sequence handed to the sign oracle:
//!
//! ```text
//! Method\n
//! URL\n
//! ExpirationUnixSeconds\n
//! Canonical-Header-1: v1,v2\n
//! ...
//! Canonical-Header-N: v1
//! ```
//!
//! Header lines are rendered first and then sorted as whole lines, so the
//! result does not depend on how the headers were inserted or stored. The
//! expiration is reduced to whole Unix seconds because the same instant has
//! many equivalent RFC 3339 spellings.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use http::HeaderMap;

/// Build the canonical string for a signed request.
///
/// `method` and `url` are used byte-for-byte and must not be case-normalized
/// by the caller.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use http::{HeaderMap, HeaderValue, header::CONTENT_TYPE};
/// use signedrequest_auth::canonical::canonicalize;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
/// let expiration = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
///
/// assert_eq!(
///     canonicalize("PUT", "https://example.com/upload", expiration, &headers),
///     "PUT\nhttps://example.com/upload\n1893456000\nContent-Type: text/plain"
/// );
/// ```
#[must_use]
pub fn canonicalize(
    method: &str,
    url: &str,
    expiration: DateTime<Utc>,
    headers: &HeaderMap,
) -> String {
    let header_lines = build_canonical_header_lines(headers);

    let mut components: Vec<Cow<'_, str>> = Vec::with_capacity(3 + header_lines.len());
    components.push(Cow::Borrowed(method));
    components.push(Cow::Borrowed(url));
    components.push(Cow::Owned(expiration_seconds(expiration).to_string()));
    components.extend(header_lines.into_iter().map(Cow::Owned));

    components.join("\n")
}

/// Whole Unix seconds of `expiration`; the fractional part is dropped.
#[must_use]
pub fn expiration_seconds(expiration: DateTime<Utc>) -> i64 {
    expiration.timestamp()
}

/// Render one `"Name: v1,v2"` line per header and sort the lines.
///
/// Values of a multi-valued header keep their insertion order and are joined
/// with a single comma. Values that are not valid UTF-8 are rendered lossily.
///
/// # Examples
///
/// ```
/// use http::{HeaderMap, HeaderValue};
/// use signedrequest_auth::canonical::build_canonical_header_lines;
///
/// let mut headers = HeaderMap::new();
/// headers.append("x-b", HeaderValue::from_static("2"));
/// headers.append("x-a", HeaderValue::from_static("1"));
/// headers.append("x-a", HeaderValue::from_static("3"));
///
/// assert_eq!(build_canonical_header_lines(&headers), vec!["X-A: 1,3", "X-B: 2"]);
/// ```
#[must_use]
pub fn build_canonical_header_lines(headers: &HeaderMap) -> Vec<String> {
    let mut lines: Vec<String> = headers
        .keys()
        .map(|name| {
            let values: Vec<Cow<'_, str>> = headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()))
                .collect();
            format!(
                "{}: {}",
                canonical_header_name(name.as_str()),
                values.join(",")
            )
        })
        .collect();

    lines.sort_unstable();
    lines
}

/// Convert a header name to its conventional HTTP casing.
///
/// The first character and every character following a hyphen are
/// upper-cased, all others lower-cased. Names containing bytes outside the
/// HTTP token set are returned unchanged.
///
/// # Examples
///
/// ```
/// use signedrequest_auth::canonical::canonical_header_name;
///
/// assert_eq!(canonical_header_name("content-type"), "Content-Type");
/// assert_eq!(canonical_header_name("X-FORWARDED-FOR"), "X-Forwarded-For");
/// assert_eq!(canonical_header_name("bad header"), "bad header");
/// ```
#[must_use]
pub fn canonical_header_name(name: &str) -> String {
    if !name.bytes().all(is_token_byte) {
        return name.to_owned();
    }

    let mut upper_next = true;
    name.chars()
        .map(|ch| {
            let mapped = if upper_next {
                ch.to_ascii_uppercase()
            } else {
                ch.to_ascii_lowercase()
            };
            upper_next = ch == '-';
            mapped
        })
        .collect()
}

/// Whether `b` is a `tchar` per RFC 9110.
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}
