//! Percent-encoding for signed RPC requests.
//!
//! The identity service canonicalizes every query value with RFC 3986
//! encoding: only the unreserved characters `A-Z a-z 0-9 - _ . ~` pass
//! through, everything else (including `!`, `'`, `(`, `)` and `*`) becomes an
//! uppercase `%XX` escape of its UTF-8 bytes, and spaces become `%20`.
//!
//! Values that already contain escapes must not be escaped a second time: a
//! `%2F` that turns into `%252F` makes the client sign a different string
//! than the one the service reconstructs, and the request fails with a
//! signature mismatch. [`percent_encode_protecting_encoded`] guards against
//! that and is idempotent.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters that are escaped: everything except RFC 3986 unreserved.
const ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a single value.
///
/// An input that is exactly one escape triplet (`%2F`, `%e6`) is returned
/// unchanged. Any other `%` is escaped to `%25`; use
/// [`percent_encode_protecting_encoded`] for text that may embed escapes.
///
/// # Examples
///
/// ```
/// use oss_sts_broker::sts::encoding::percent_encode;
///
/// assert_eq!(percent_encode("a b*c!'()~"), "a%20b%2Ac%21%27%28%29~");
/// assert_eq!(percent_encode("%2F"), "%2F");
/// assert_eq!(percent_encode("/"), "%2F");
/// ```
#[must_use]
pub fn percent_encode(value: &str) -> String {
    if is_escape_triplet(value.as_bytes()) {
        return value.to_owned();
    }
    utf8_percent_encode(value, ENCODE_SET).to_string()
}

/// Percent-encode text while leaving existing `%XX` escapes untouched.
///
/// Every `%` followed by two hex digits is copied through verbatim (hex case
/// preserved); the text between escapes is encoded with [`percent_encode`]
/// rules. The result contains only unreserved characters and escape
/// triplets, so feeding it back in returns it unchanged.
///
/// # Examples
///
/// ```
/// use oss_sts_broker::sts::encoding::percent_encode_protecting_encoded;
///
/// let once = percent_encode_protecting_encoded("a=b%2Fc&d");
/// assert_eq!(once, "a%3Db%2Fc%26d");
/// assert_eq!(percent_encode_protecting_encoded(&once), once);
/// ```
#[must_use]
pub fn percent_encode_protecting_encoded(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + text.len() / 2);
    let mut run_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes.get(i..i + 3).is_some_and(is_escape_triplet) {
            // `%` and hex digits are ASCII, so both slice bounds sit on char boundaries.
            out.extend(utf8_percent_encode(&text[run_start..i], ENCODE_SET));
            out.push_str(&text[i..i + 3]);
            i += 3;
            run_start = i;
        } else {
            i += 1;
        }
    }
    out.extend(utf8_percent_encode(&text[run_start..], ENCODE_SET));

    out
}

fn is_escape_triplet(bytes: &[u8]) -> bool {
    matches!(bytes, [b'%', hi, lo] if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit())
}
