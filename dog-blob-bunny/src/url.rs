//! Key and URL policy.
//!
//! Pure functions only: nothing here touches the network.

use crate::{BlobError, BlobResult, DispositionType, UploadOptions};

/// Domain serving Bunny pull zones
pub const CDN_DOMAIN: &str = "b-cdn.net";

/// Characters replaced by `-` when sanitizing a filename
const UNSAFE_FILENAME_CHARS: &[char] = &[
    '\u{202E}', '%', '$', '|', ':', ';', '/', '\t', '\r', '\n', '\\',
];

/// Public URL for an object: `https://<zone>.b-cdn.net/<key>`
pub fn public_url(cdn_zone: &str, key: &str) -> String {
    format!("https://{}.{}/{}", cdn_zone, CDN_DOMAIN, encode_key(key))
}

/// Percent-encode each path segment of a key, keeping `/` separators
pub fn encode_key(key: &str) -> String {
    key.trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Canonical form of a key: no surrounding `/` and no `.` or `..` segments.
///
/// URL parsing resolves dot segments, so a key containing them could address the
/// zone root or another zone.
pub fn normalize_key(key: &str) -> BlobResult<&str> {
    let key = key.trim_matches('/');
    if key.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(BlobError::invalid(format!(
            "key {} must not contain . or .. segments",
            key
        )));
    }
    Ok(key)
}

/// Normalized key of a single object; never empty
pub fn object_key(key: &str) -> BlobResult<&str> {
    let key = normalize_key(key)?;
    if key.is_empty() {
        return Err(BlobError::invalid("object name must not be empty"));
    }
    Ok(key)
}

/// Derive the `Content-Disposition` header for an upload.
///
/// Only produced when both a filename and a disposition were supplied.
pub fn derive_content_disposition(options: &UploadOptions) -> Option<String> {
    match (&options.filename, options.disposition) {
        (Some(filename), Some(disposition)) => Some(content_disposition(disposition, filename)),
        _ => None,
    }
}

/// Format a `Content-Disposition` value with both an ASCII and an RFC 5987 filename
pub fn content_disposition(disposition: DispositionType, filename: &str) -> String {
    let filename = sanitize_filename(filename);
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect();

    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        disposition.as_str(),
        urlencoding::encode(&ascii),
        urlencoding::encode(&filename)
    )
}

/// Strip surrounding whitespace and neutralize path and control characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .trim()
        .chars()
        .map(|c| if UNSAFE_FILENAME_CHARS.contains(&c) { '-' } else { c })
        .collect()
}
