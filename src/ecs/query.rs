//! Query-string assembly.
//!
//! Parameters are always emitted sorted by key, so the same logical request
//! produces the same URL and therefore the same cache key.

use std::fmt::Display;

/// Percent-encodes `input` for use in a query string.
///
/// Bytes in `[A-Za-z0-9_.-]` pass through, space becomes `+`, everything else
/// becomes an uppercase `%XX` escape of its UTF-8 bytes.
pub fn url_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' | b'-' => out.push(byte as char),
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Builds a `?`-prefixed query string from key/value pairs.
pub fn assemble_query<I, K, V>(items: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Display,
    V: Display,
{
    let mut pairs: Vec<(String, String)> =
        items.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let joined = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, url_encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("?{}", joined)
}
