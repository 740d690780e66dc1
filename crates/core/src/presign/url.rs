//! Download URL composition.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left unescaped in a query value.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Characters left unescaped in a path segment. Only `/ ; , ?` and
/// non-unreserved bytes are escaped.
const PATH_SEGMENT: &AsciiSet = &UNRESERVED
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b':')
    .remove(b'=')
    .remove(b'@');

/// `{base}/{file_id}/download?token={token}` with both values escaped.
#[must_use]
pub fn download_url(base_url: &str, file_id: &str, token: &str) -> String {
    format!(
        "{}/{}/download?token={}",
        base_url.trim_end_matches('/'),
        utf8_percent_encode(file_id, PATH_SEGMENT),
        utf8_percent_encode(token, UNRESERVED),
    )
}
