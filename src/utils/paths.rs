//! Location helpers.
//!
//! Component specs mix relative paths with absolute or protocol-relative URLs.
//! Anything containing `//` counts as remote and is never rewritten.

/// Whether `path` points at a remote resource (`https://...`, `//cdn...`).
#[must_use]
pub fn is_remote(path: &str) -> bool {
    path.contains("//")
}

/// Join a relative path onto a base location with exactly one `/` between them.
#[must_use]
pub fn join_location(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Turn a protocol-relative URL into an `https:` URL.
#[must_use]
pub fn absolutize_url(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url.to_string()
    }
}
