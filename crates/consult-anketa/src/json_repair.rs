//! JSON repair pipeline (§4.4). The LLM's response is rarely pure JSON: it
//! may be fenced, trailed by commentary, or sprinkled with smart quotes and
//! trailing commas. Repair proceeds through increasingly aggressive passes,
//! capped at [`MAX_ATTEMPTS`], rather than trying to parse everything in one
//! shot.

use consult_core::error::ConsultError;

pub const MAX_ATTEMPTS: u32 = 5;
const TRUNCATE_DIAGNOSTIC_CHARS: usize = 500;

/// Parse `text` into a `serde_json::Value`, repairing common LLM JSON
/// malformations along the way. Returns `JsonRepair` with the (truncated)
/// original text on unrecoverable failure.
pub fn repair_and_parse(text: &str) -> Result<serde_json::Value, ConsultError> {
    let mut candidate = text.to_string();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match serde_json::from_str::<serde_json::Value>(&candidate) {
            Ok(value) => return Ok(value),
            Err(_) if attempt >= MAX_ATTEMPTS => {
                let truncated: String = text.chars().take(TRUNCATE_DIAGNOSTIC_CHARS).collect();
                return Err(ConsultError::JsonRepair(truncated));
            }
            Err(_) => {
                candidate = match attempt {
                    1 => strip_code_fences(&candidate),
                    2 => extract_outer_braces(&candidate),
                    3 => normalize_quotes(&candidate),
                    4 => strip_trailing_commas(&candidate),
                    _ => candidate,
                };
            }
        }
    }
}

/// Strip ```json ... ``` or bare ``` ... ``` fences around the payload.
fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        if let Some(end) = rest.find("```") {
            return rest[..end].trim().to_string();
        }
        return rest.trim().to_string();
    }
    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(end) = rest.find("```") {
            return rest[..end].trim().to_string();
        }
        return rest.trim().to_string();
    }
    trimmed.to_string()
}

/// Locate the outermost `{...}` span by bracket balancing, discarding any
/// leading/trailing commentary.
fn extract_outer_braces(text: &str) -> String {
    let bytes = text.as_bytes();
    let Some(start) = bytes.iter().position(|&b| b == b'{') else {
        return text.to_string();
    };
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    let mut end = None;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    match end {
        Some(end) => text[start..=end].to_string(),
        None => text[start..].to_string(),
    }
}

/// Replace curly/smart quotes with straight ASCII quotes.
fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{00AB}' | '\u{00BB}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

/// Strip trailing commas before a closing `}` or `]`.
fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                i += 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pure_json_on_first_attempt() {
        let value = repair_and_parse(r#"{"a": 1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn strips_fenced_code_block() {
        let text = "```json\n{\"a\": 1}\n```";
        let value = repair_and_parse(text).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn recovers_json_fragment_amid_commentary() {
        let text = "Here is the result:\n{\"a\": 1}\nHope that helps!";
        let value = repair_and_parse(text).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn normalizes_smart_quotes() {
        let text = "{\u{201C}a\u{201D}: 1}";
        let value = repair_and_parse(text).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn strips_trailing_commas() {
        let text = r#"{"a": 1, "b": [1, 2,],}"#;
        let value = repair_and_parse(text).unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(value["b"][1], 2);
    }

    #[test]
    fn unrecoverable_text_fails_with_truncated_diagnostic() {
        let garbage = "not json at all".repeat(100);
        let err = repair_and_parse(&garbage).unwrap_err();
        match err {
            ConsultError::JsonRepair(snippet) => assert!(snippet.len() <= 500),
            _ => panic!("wrong error variant"),
        }
    }
}
