//! Extraction prompt construction (§4.5), grounded on the dialogue-to-JSON
//! prompt shape the original extractor sent the chat model.

use std::sync::OnceLock;

use regex::Regex;

use consult_store::DialogueTurn;
use consult_store::DocumentContext;

const MAX_DIALOGUE_TURNS: usize = 50;

const SCHEMA_TEMPLATE: &str = r#"{
  "company_name": "",
  "industry": "",
  "specialization": "",
  "website": null,
  "contact_name": "",
  "contact_role": "",
  "contact_phone": "",
  "business_description": "",
  "services": [],
  "client_types": [],
  "current_problems": [],
  "business_goals": [],
  "constraints": [],
  "agent_name": "",
  "agent_purpose": "",
  "agent_functions": [{"name": "", "description": "", "priority": "high|medium|low"}],
  "additional_functions": [{"name": "", "description": "", "priority": "high|medium|low"}],
  "typical_questions": [],
  "voice_gender": "female|male",
  "voice_tone": "professional|friendly|calm|...",
  "language": "",
  "call_direction": "inbound|outbound|both",
  "integrations": [{"name": "", "purpose": "", "required": true}]
}"#;

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\+(\d{1,3})").expect("valid phone regex"))
}

/// Best-effort country-code hint derived from the first phone number seen
/// in the dialogue, used to steer currency/locale phrasing in the prompt.
pub fn detect_country_hint(dialogue: &[DialogueTurn]) -> Option<String> {
    dialogue.iter().find_map(|turn| {
        phone_re()
            .captures(&turn.content)
            .map(|c| format!("+{}", &c[1]))
    })
}

fn format_dialogue(dialogue: &[DialogueTurn]) -> String {
    let start = dialogue.len().saturating_sub(MAX_DIALOGUE_TURNS);
    dialogue[start..]
        .iter()
        .map(|t| format!("{}: {}", t.role.to_uppercase(), t.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_documents(context: Option<&DocumentContext>) -> String {
    match context {
        None => String::new(),
        Some(ctx) => {
            let mut lines = vec![format!("DOCUMENT SUMMARY:\n{}", ctx.summary)];
            if !ctx.key_facts.is_empty() {
                lines.push(format!("Key facts: {}", ctx.key_facts.join("; ")));
            }
            if !ctx.services_mentioned.is_empty() {
                lines.push(format!("Services mentioned: {}", ctx.services_mentioned.join(", ")));
            }
            if !ctx.contacts.is_empty() {
                lines.push(format!("Contacts found: {}", ctx.contacts.join(", ")));
            }
            lines.join("\n")
        }
    }
}

/// Build the extraction prompt: dialogue (truncated to the last 50 turns),
/// formatted document summary, country hint, and the target JSON schema.
pub fn build_extraction_prompt(
    dialogue: &[DialogueTurn],
    document_context: Option<&DocumentContext>,
    country_hint: Option<&str>,
) -> String {
    let dialogue_text = format_dialogue(dialogue);
    let documents_text = format_documents(document_context);
    let hint_text = country_hint
        .map(|h| format!("Detected phone country code: {h}\n"))
        .unwrap_or_default();

    format!(
        "You are an expert at extracting structured data from voice consultations.\n\n\
TASK: Extract all available information from the consultation dialogue below into the JSON schema.\n\n\
RULES:\n\
1. Extract CONCRETE values. Do not copy whole dialogue sentences verbatim.\n\
2. Use short, clear list items.\n\
3. Leave a field empty (\"\" or []) when it is not explicitly mentioned.\n\
4. Field names must match the schema exactly.\n\
5. Return ONLY valid JSON, no commentary.\n\n\
---\nCONSULTATION DIALOGUE:\n{dialogue_text}\n---\n{hint_text}{documents_text}\n---\n\n\
JSON SCHEMA (fill every field):\n\n{SCHEMA_TEMPLATE}\n\nReturn ONLY the JSON:"
    )
}

/// Alternate prompt used when `consultation_type == \"interview\"` (§4.5):
/// centred on question/answer pairs and insights rather than a voice-agent
/// proposal.
pub fn build_interview_prompt(dialogue: &[DialogueTurn]) -> String {
    let dialogue_text = format_dialogue(dialogue);
    format!(
        "You are an expert interviewer summarizing a structured interview.\n\n\
TASK: Extract question/answer pairs and key insights from the interview dialogue below.\n\n\
RULES:\n\
1. Pair each question the interviewer asked with the interviewee's answer.\n\
2. Summarize insights as short, standalone bullet points.\n\
3. Return ONLY valid JSON, no commentary.\n\n\
---\nINTERVIEW DIALOGUE:\n{dialogue_text}\n---\n\n\
JSON SCHEMA:\n\n{{\n  \"company_name\": \"\",\n  \"industry\": \"\",\n  \"contact_name\": \"\",\n  \
\"qa_pairs\": [{{\"question\": \"\", \"answer\": \"\"}}],\n  \"insights\": [],\n  \"summary\": \"\"\n}}\n\n\
Return ONLY the JSON:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, content: &str) -> DialogueTurn {
        DialogueTurn {
            role: role.to_string(),
            content: content.to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            phase: String::new(),
        }
    }

    #[test]
    fn truncates_to_last_fifty_turns() {
        let dialogue: Vec<DialogueTurn> = (0..80).map(|i| turn("user", &i.to_string())).collect();
        let prompt = build_extraction_prompt(&dialogue, None, None);
        assert!(prompt.contains("79"));
        assert!(!prompt.contains("USER: 0\n"));
    }

    #[test]
    fn detects_country_hint_from_phone_number() {
        let dialogue = vec![turn("user", "call me at +44 20 1234 5678")];
        assert_eq!(detect_country_hint(&dialogue), Some("+44".to_string()));
    }

    #[test]
    fn no_phone_present_yields_no_hint() {
        let dialogue = vec![turn("user", "no numbers at all")];
        assert_eq!(detect_country_hint(&dialogue), None);
    }
}
