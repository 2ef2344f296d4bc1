//! Identifier generation and validation.
//!
//! `session_id` is a short opaque 8-hex identifier; `unique_link` is a
//! 128-bit UUID. Both are validated at every ingress point (route segment
//! or request body) per the HTTP surface's input-validation policy.

use std::sync::OnceLock;

use regex::Regex;
use uuid::Uuid;

fn session_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-f0-9]{8}$").unwrap())
}

/// Generate a new short session identifier: the first 8 hex characters of a
/// UUIDv4. Collisions are handled by the store's `PRIMARY KEY` constraint —
/// callers should retry `create_session` on a (vanishingly rare) conflict.
pub fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Generate a new unique link: a full UUIDv4 string.
pub fn new_unique_link() -> String {
    Uuid::new_v4().to_string()
}

/// Validate a route-segment or body `session_id` against `^[a-f0-9]{8}$`.
pub fn is_valid_session_id(s: &str) -> bool {
    session_id_re().is_match(s)
}

/// Validate a `unique_link` value is UUID-formatted.
pub fn is_valid_unique_link(s: &str) -> bool {
    Uuid::parse_str(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_session_id_is_valid() {
        let id = new_session_id();
        assert_eq!(id.len(), 8);
        assert!(is_valid_session_id(&id));
    }

    #[test]
    fn generated_unique_link_is_valid() {
        let link = new_unique_link();
        assert!(is_valid_unique_link(&link));
    }

    #[test]
    fn rejects_uppercase_and_wrong_length() {
        assert!(!is_valid_session_id("ABCDEF01"));
        assert!(!is_valid_session_id("abcdef0"));
        assert!(!is_valid_session_id("abcdef012"));
        assert!(!is_valid_session_id("../../etc"));
    }

    #[test]
    fn rejects_non_uuid_link() {
        assert!(!is_valid_unique_link("not-a-uuid"));
    }
}
