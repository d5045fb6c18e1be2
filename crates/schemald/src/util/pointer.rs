//! JSON Pointer (RFC 6901) construction for diagnostic paths.

/// Appends an object key to a pointer, escaping `~` and `/`.
pub fn push_key(base: &str, key: &str) -> String {
    let mut out = String::with_capacity(base.len() + key.len() + 1);
    out.push_str(base);
    out.push('/');
    for c in key.chars() {
        match c {
            '~' => out.push_str("~0"),
            '/' => out.push_str("~1"),
            _ => out.push(c),
        }
    }
    out
}

/// Appends an array index to a pointer.
pub fn push_index(base: &str, index: usize) -> String {
    format!("{}/{}", base, index)
}

/// Renders the document root, which RFC 6901 spells as the empty string,
/// readably for messages.
pub fn display(path: &str) -> &str {
    if path.is_empty() { "/" } else { path }
}
