//! HTTP cache validation module
//!
//! `Last-Modified` generation and `If-Modified-Since` handling.

use chrono::{DateTime, Utc};
use std::time::SystemTime;

/// IMF-fixdate, e.g. `Wed, 21 Oct 2015 07:28:00 GMT`
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a timestamp as an HTTP-date
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP-date, `None` if malformed
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Check whether a conditional GET can be answered with 304
///
/// `If-Modified-Since` is ignored when `If-None-Match` is present or the date is malformed.
/// The modification time is compared at whole-second precision, like the header itself.
pub fn is_not_modified(
    if_modified_since: Option<&str>,
    if_none_match: Option<&str>,
    modified: SystemTime,
) -> bool {
    if if_none_match.is_some() {
        return false;
    }
    let Some(since) = if_modified_since.and_then(parse_http_date) else {
        return false;
    };
    DateTime::<Utc>::from(modified).timestamp() <= since.timestamp()
}
