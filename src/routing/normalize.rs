//! Request path canonicalization.
//!
//! # Responsibilities
//! - Drop query string and fragment
//! - Percent-decode, falling back to the raw text on invalid UTF-8
//! - Collapse repeated slashes, force one leading slash, drop the trailing one
//!
//! # Design Decisions
//! - Pure and allocation-light; runs on every request
//! - `?`, `#` and any `%` that starts a valid escape are escaped again after
//!   decoding, so a second pass cannot reinterpret them (normalization is
//!   idempotent); a stray `%` is left as written

/// Canonicalize a raw request path.
///
/// Always returns an absolute path; the empty path becomes `/`.
pub fn normalize(raw: &str) -> String {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let path = &raw[..end];

    let decoded = match urlencoding::decode(path) {
        Ok(decoded) => escape_reserved(&decoded),
        Err(_) => path.to_string(),
    };

    let mut canonical = String::with_capacity(decoded.len() + 1);
    for segment in decoded.split('/').filter(|s| !s.is_empty()) {
        canonical.push('/');
        canonical.push_str(segment);
    }

    if canonical.is_empty() {
        canonical.push('/');
    }
    canonical
}

fn escape_reserved(decoded: &str) -> String {
    let mut out = String::with_capacity(decoded.len());
    for (i, c) in decoded.char_indices() {
        match c {
            '%' if starts_escape(&decoded[i + 1..]) => out.push_str("%25"),
            '?' => out.push_str("%3F"),
            '#' => out.push_str("%23"),
            _ => out.push(c),
        }
    }
    out
}

/// A `%` followed by two hex digits would be decoded by a later pass.
fn starts_escape(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_hexdigit() && bytes[1].is_ascii_hexdigit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_collapses_and_trims_slashes() {
        assert_eq!(normalize("/a//b/"), "/a/b");
        assert_eq!(normalize("//a///b//"), "/a/b");
        assert_eq!(normalize("a"), "/a");
    }

    #[test]
    fn test_strips_query_and_fragment() {
        assert_eq!(normalize("/a?x=1#y"), "/a");
        assert_eq!(normalize("/a#y?x=1"), "/a");
        assert_eq!(normalize("?only=query"), "/");
    }

    #[test]
    fn test_decodes_percent_escapes() {
        assert_eq!(normalize("/hello%20world"), "/hello world");
        assert_eq!(normalize("/caf%C3%A9"), "/café");
        assert_eq!(normalize("/a%2Fb"), "/a/b");
    }

    #[test]
    fn test_invalid_utf8_keeps_raw_text() {
        assert_eq!(normalize("/bad%FF/"), "/bad%FF");
    }

    #[test]
    fn test_empty_paths_become_root() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("///"), "/");
    }

    #[test]
    fn test_decoded_reserved_characters_stay_escaped() {
        assert_eq!(normalize("/a%3Fb"), "/a%3Fb");
        assert_eq!(normalize("/100%25"), "/100%25");
        assert_eq!(normalize(&normalize("/a%2541")), normalize("/a%2541"));
    }

    #[test]
    fn test_stray_percent_is_kept_as_written() {
        assert_eq!(normalize("/50%off"), "/50%off");
        assert_eq!(normalize("/%zz"), "/%zz");
        assert_eq!(normalize("/100%"), "/100%");
        assert_eq!(normalize("/50%off/%41"), "/50%off/A");
        assert_eq!(normalize(&normalize("/50%off")), "/50%off");
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(raw in "[a-zA-Z0-9/%?#. _-]{0,40}") {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once.clone());
            prop_assert!(once.starts_with('/'));
            prop_assert!(!once.contains("//"));
            prop_assert!(once == "/" || !once.ends_with('/'));
        }
    }
}
