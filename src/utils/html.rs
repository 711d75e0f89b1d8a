// src/utils/html.rs

use std::collections::HashSet;

/// Strips all markup from a plain-text field (student name, class name).
///
/// Uses an ammonia builder with an empty tag whitelist, so `<b>Ayu</b>` becomes
/// `Ayu` and `<script>` elements vanish together with their content.
pub fn strip_tags(input: &str) -> String {
    ammonia::Builder::empty()
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(input)
        .to_string()
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Response headers for serving untrusted student HTML.
/// The preview runs as an opaque origin with scripts disabled.
pub const PREVIEW_CSP: &str = "sandbox; script-src 'none'; object-src 'none'; base-uri 'none'";
