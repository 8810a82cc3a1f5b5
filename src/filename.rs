//! Candidate file names for classified media.
//!
//! Sources are tried in order: Content-Disposition, last URL path segment,
//! `filename` query parameter, `#filename=` fragment, then a timestamp.

use crate::registry::MAX_DUPLICATE_ATTEMPTS;
use percent_encoding::percent_decode_str;
use reqwest::Url;
use std::time::{SystemTime, UNIX_EPOCH};

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

/// Extensions that name a playlist rather than the media it points to.
const PLACEHOLDER_EXTENSIONS: [&str; 2] = ["m3u8", "m3u"];

/// Picks the file name for `url`, giving it `ext` unless it already has a
/// recognized extension of its own.
pub fn resolve_file_name(url: &Url, content_disposition: Option<&str>, ext: &str) -> String {
    let candidate = content_disposition
        .and_then(content_disposition_file_name)
        .or_else(|| path_file_name(url))
        .or_else(|| query_file_name(url))
        .or_else(|| fragment_file_name(url));

    match candidate {
        Some(name) => with_extension(&name, ext),
        None => timestamp_file_name(ext),
    }
}

/// Extracts the file name from a raw Content-Disposition header value.
///
/// `filename*=UTF-8'[lang]'...` wins over `filename=`.
pub fn content_disposition_file_name(header_value: &str) -> Option<String> {
    let mut plain = None;

    for param in header_value.split(';') {
        let Some((key, value)) = param.trim().split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        if key == "filename*" {
            // charset'language'percent-encoded-name
            let rest = value
                .split_once('\'')
                .filter(|(charset, _)| charset.eq_ignore_ascii_case("utf-8"))
                .and_then(|(_, tail)| tail.split_once('\''))
                .map(|(_language, encoded)| encoded);
            if let Some(rest) = rest {
                let decoded = sanitize(&percent_decode_str(rest).decode_utf8_lossy());
                if !decoded.is_empty() {
                    return Some(decoded);
                }
            }
        } else if key == "filename" {
            let unquoted = if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
                unescape_quoted(&value[1..value.len() - 1])
            } else {
                value.to_string()
            };
            let name = sanitize(&unquoted);
            if !name.is_empty() {
                plain = Some(name);
            }
        }
    }

    plain
}

/// Last non-empty segment of the URL path, percent-decoded.
pub fn path_file_name(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    non_empty(sanitize(&percent_decode_str(segment).decode_utf8_lossy()))
}

/// Value of the `filename` query parameter.
pub fn query_file_name(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "filename")
        .and_then(|(_, value)| non_empty(sanitize(&value)))
}

/// Name encoded in a `#filename=...` fragment.
pub fn fragment_file_name(url: &Url) -> Option<String> {
    let name = url.fragment()?.strip_prefix("filename=")?;
    non_empty(sanitize(&percent_decode_str(name).decode_utf8_lossy()))
}

/// Keeps a recognized extension verbatim, replaces a playlist extension and
/// appends `ext` otherwise.
///
/// The stem is shortened so that the name plus the largest duplicate suffix
/// the registry may add still fits in NAME_MAX bytes.
pub fn with_extension(name: &str, ext: &str) -> String {
    let (stem, ext) = match split_extension(name) {
        Some((stem, current)) if PLACEHOLDER_EXTENSIONS.contains(&current.to_ascii_lowercase().as_str()) => {
            (stem, ext)
        }
        Some((stem, current)) => (stem, current),
        None => (name, ext),
    };

    let suffix = format!(" ({})", MAX_DUPLICATE_ATTEMPTS - 1).len();
    let budget = NAME_MAX.saturating_sub(ext.len() + 1 + suffix);
    format!("{}.{ext}", truncate(stem, budget))
}

fn timestamp_file_name(ext: &str) -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("{secs}.{ext}")
}

/// Splits off a final `.ext` of 1-5 ASCII alphanumerics. A leading dot
/// (hidden file) is not an extension.
fn split_extension(name: &str) -> Option<(&str, &str)> {
    let dot = name.rfind('.')?;
    if dot == 0 {
        return None;
    }
    let ext = &name[dot + 1..];
    let recognized = (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric());
    recognized.then(|| (&name[..dot], ext))
}

/// Replaces path separators, NUL and control characters with `_`, trims
/// surrounding dots and whitespace. Length is capped later, once the
/// extension is known.
fn sanitize(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    replaced
        .trim_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

/// Longest prefix of `s` that is at most `max` bytes and ends on a char boundary.
fn truncate(s: &str, max: usize) -> &str {
    let mut take = s.len().min(max);
    while !s.is_char_boundary(take) {
        take -= 1;
    }
    &s[..take]
}

fn unescape_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next == '"' || next == '\\' {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}
