//! Dialogue-marker cleaning and role-based recovery (§4.4). Pure, side-effect
//! free helpers; the caller persists whatever they choose to keep.

use std::sync::OnceLock;

use regex::Regex;

const MAX_LIST_ITEM_LEN: usize = 300;

const MARKERS: &[&str] = &[
    "Consultant:", "Client:", "ASSISTANT:", "USER:", "Консультант:", "Клиент:",
];

/// Strip leaked dialogue markers from a scalar field. If a marker sits at
/// position 0 and meaningful content follows, the content after the marker
/// is kept; otherwise the marker substring is simply removed in place.
pub fn clean_field(value: &str) -> String {
    let trimmed = value.trim();
    for marker in MARKERS {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            let rest = rest.trim();
            if !rest.is_empty() {
                return rest.to_string();
            }
            return String::new();
        }
    }
    let mut cleaned = trimmed.to_string();
    for marker in MARKERS {
        cleaned = cleaned.replace(marker, "");
    }
    cleaned.trim().to_string()
}

/// Clean every item of a list field, dropping items that either become
/// empty or are implausibly long (likely a copied dialogue turn).
pub fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| clean_field(v))
        .filter(|v| !v.is_empty() && v.chars().count() <= MAX_LIST_ITEM_LEN)
        .collect()
}

/// A recovered field value paired with a confidence score in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub value: String,
    pub confidence: f64,
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\+\d{1,3}[\s\-]?)?\(?\d{2,4}\)?[\s\-]?\d{3,4}[\s\-]?\d{2,4}(?:[\s\-]?\d{2,4})?")
            .expect("valid phone regex")
    })
}

/// Recover `company_name` from the most recent short, proper-noun-like user
/// turn. Only meaningful when the canonical field came back empty.
pub fn recover_company_name(dialogue: &[(String, String)]) -> Option<Recovered> {
    dialogue
        .iter()
        .rev()
        .filter(|(role, _)| role == "user")
        .map(|(_, content)| content.trim())
        .find(|content| {
            !content.is_empty()
                && content.chars().count() <= 40
                && content
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_uppercase() || c.is_alphabetic())
        })
        .map(|content| Recovered { value: content.to_string(), confidence: 0.5 })
}

/// Recover `contact_phone` via a phone-number regex scanned over every user
/// turn; the last match wins (most likely to be the final, corrected
/// number given during the call).
pub fn recover_contact_phone(dialogue: &[(String, String)]) -> Option<Recovered> {
    let mut last_match = None;
    for (role, content) in dialogue {
        if role != "user" {
            continue;
        }
        if let Some(m) = phone_re().find_iter(content).last() {
            last_match = Some(m.as_str().to_string());
        }
    }
    last_match.map(|value| Recovered { value, confidence: 0.7 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_marker_at_start_keeping_trailing_content() {
        assert_eq!(clean_field("Consultant: Acme Corp"), "Acme Corp");
    }

    #[test]
    fn marker_alone_yields_empty() {
        assert_eq!(clean_field("Client:"), "");
    }

    #[test]
    fn removes_embedded_marker() {
        assert!(!clean_field("Some text USER: noise").contains("USER:"));
    }

    #[test]
    fn clean_list_drops_overlong_items() {
        let long_item = "x".repeat(301);
        let items = vec!["short".to_string(), long_item, "".to_string()];
        let cleaned = clean_list(&items);
        assert_eq!(cleaned, vec!["short".to_string()]);
    }

    #[test]
    fn recovers_company_name_from_recent_user_turn() {
        let dialogue = vec![
            ("assistant".to_string(), "What's your company name?".to_string()),
            ("user".to_string(), "Acme Corp".to_string()),
        ];
        let recovered = recover_company_name(&dialogue).unwrap();
        assert_eq!(recovered.value, "Acme Corp");
        assert!(recovered.confidence > 0.0);
    }

    #[test]
    fn recovers_last_phone_match() {
        let dialogue = vec![
            ("user".to_string(), "call me at +1 234 567 89".to_string()),
            ("user".to_string(), "actually +1 234 567 90".to_string()),
        ];
        let recovered = recover_contact_phone(&dialogue).unwrap();
        assert!(recovered.value.contains("90"));
    }

    #[test]
    fn no_phone_present_returns_none() {
        let dialogue = vec![("user".to_string(), "no numbers here".to_string())];
        assert!(recover_contact_phone(&dialogue).is_none());
    }
}
