//! Object key guard.
//!
//! A key is accepted only if it is already in canonical form: the sanitized
//! version must equal the input byte for byte. Keys are never corrected, so
//! the requested key and the stored key cannot disagree.

use thiserror::Error;

/// Longest key accepted (matches common object-store limits).
pub const MAX_KEY_LEN: usize = 1024;

/// Characters that are illegal in Windows file names.
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Why an object key was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("object key is empty")]
    Empty,

    #[error("object key exceeds {MAX_KEY_LEN} bytes")]
    TooLong,

    #[error("object key contains control characters")]
    ControlCharacter,

    #[error("object key contains a backslash")]
    Backslash,

    #[error("object key must not start with '/'")]
    Absolute,

    #[error("object key contains a parent-directory segment")]
    Traversal,

    #[error("object key contains reserved character '{0}'")]
    ReservedCharacter(char),

    #[error("object key contains a hidden path segment")]
    HiddenSegment,

    #[error("object key contains an empty path segment")]
    EmptySegment,
}

/// Best-effort cleanup of a raw key. Used only to detect non-canonical input.
pub fn sanitize_key(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '\\' { '/' } else { c })
        .filter(|c| !RESERVED_CHARS.contains(c))
        .collect();

    cleaned
        .split('/')
        .filter(|segment| !segment.is_empty() && !segment.starts_with('.'))
        .collect::<Vec<_>>()
        .join("/")
}

/// Validate an object key, returning it unchanged when it is canonical.
pub fn validate_object_key(raw: &str) -> Result<String, KeyError> {
    if raw.is_empty() {
        return Err(KeyError::Empty);
    }
    if raw.len() > MAX_KEY_LEN {
        return Err(KeyError::TooLong);
    }

    let sanitized = sanitize_key(raw);
    if sanitized != raw {
        return Err(first_violation(raw));
    }
    Ok(sanitized)
}

/// Name the first rule `raw` breaks, for the error message.
fn first_violation(raw: &str) -> KeyError {
    if raw.chars().any(char::is_control) {
        return KeyError::ControlCharacter;
    }
    if raw.contains('\\') {
        return KeyError::Backslash;
    }
    if raw.starts_with('/') {
        return KeyError::Absolute;
    }
    if raw.split('/').any(|segment| segment == "..") {
        return KeyError::Traversal;
    }
    if let Some(c) = raw.chars().find(|c| RESERVED_CHARS.contains(c)) {
        return KeyError::ReservedCharacter(c);
    }
    if raw.split('/').any(|segment| segment.starts_with('.')) {
        return KeyError::HiddenSegment;
    }
    if raw.split('/').any(str::is_empty) {
        return KeyError::EmptySegment;
    }
    KeyError::Empty
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_unsafe_keys() {
        assert_eq!(validate_object_key("../etc/passwd"), Err(KeyError::Traversal));
        assert_eq!(validate_object_key("/etc/passwd"), Err(KeyError::Absolute));
        assert_eq!(validate_object_key("a//b"), Err(KeyError::EmptySegment));
        assert_eq!(validate_object_key("a/.git/x"), Err(KeyError::HiddenSegment));
        assert_eq!(validate_object_key("a\\b"), Err(KeyError::Backslash));
        assert_eq!(validate_object_key("a/b/"), Err(KeyError::EmptySegment));
        assert_eq!(validate_object_key("a/./b"), Err(KeyError::HiddenSegment));
        assert_eq!(validate_object_key("file\0.txt"), Err(KeyError::ControlCharacter));
        assert_eq!(
            validate_object_key("report?.pdf"),
            Err(KeyError::ReservedCharacter('?'))
        );
    }

    #[test]
    fn test_rejects_empty_and_all_invalid() {
        assert_eq!(validate_object_key(""), Err(KeyError::Empty));
        assert_eq!(validate_object_key("../.."), Err(KeyError::Traversal));
        assert_eq!(validate_object_key("/"), Err(KeyError::Absolute));
    }

    #[test]
    fn test_rejects_overlong_keys() {
        let key = "a".repeat(MAX_KEY_LEN + 1);
        assert_eq!(validate_object_key(&key), Err(KeyError::TooLong));
    }

    #[test]
    fn test_accepts_canonical_keys_unchanged() {
        assert_eq!(validate_object_key("media/file.zip").unwrap(), "media/file.zip");
        assert_eq!(validate_object_key("a/b..c/d e.txt").unwrap(), "a/b..c/d e.txt");
        assert_eq!(validate_object_key("photo.jpg").unwrap(), "photo.jpg");
    }

    proptest! {
        #[test]
        fn prop_accepted_keys_are_fixed_points(raw in "[a-z./\\\\]{1,24}") {
            if let Ok(key) = validate_object_key(&raw) {
                prop_assert_eq!(&key, &raw);
                prop_assert_eq!(sanitize_key(&key), key.clone());
                prop_assert!(!key.split('/').any(|s| s == ".."));
            }
        }
    }
}
