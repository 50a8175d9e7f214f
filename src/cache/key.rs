//! Cache key derivation and sanitization
//!
//! A logical key names one upstream request (`forecast?q=London&cnt=8`). The
//! storage id is the same string with filesystem-significant characters
//! replaced, so it can be used directly as a file name.

/// Characters that must not appear in a cache file name
const RESERVED_CHARS: [char; 5] = ['/', '\\', ':', '?', '&'];

/// Builds the logical cache key for an endpoint and its identifying parameters
///
/// The parameter names are part of the key, so `weather?q=id=5` (a city
/// literally called `id=5`) never collides with `weather?id=5`. Reserved
/// characters and `%` inside values are percent-escaped, so the only reserved
/// characters left in a key are its own `?` and `&` delimiters. `storage_id`
/// replacing them with `_` then cannot merge two keys built here, e.g.
/// `Frankfurt/Main` and `Frankfurt_Main` stay apart.
pub fn logical_key(endpoint: &str, params: &[(&str, String)]) -> String {
    let query = params
        .iter()
        .map(|(name, value)| format!("{}={}", name, escape_value(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", endpoint, query)
}

/// Maps a logical cache key to a filesystem-safe storage id
///
/// Not injective on arbitrary strings (`a/b` and `a_b` agree); keys from
/// `logical_key` never contain reserved characters outside delimiters.
pub fn storage_id(key: &str) -> String {
    key.chars()
        .map(|c| if RESERVED_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '%' || RESERVED_CHARS.contains(&c) {
            escaped.push_str(&format!("%{:02X}", c as u32));
        } else {
            escaped.push(c);
        }
    }
    escaped
}
