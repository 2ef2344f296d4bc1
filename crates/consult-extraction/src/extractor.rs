use tracing::{error, info};

use consult_anketa::json_repair::repair_and_parse;
use consult_anketa::{cleaner, AgentFunction, Anketa, Integration, InterviewAnketa, Priority};
use consult_store::{DialogueTurn, DocumentContext};

use crate::fallback::build_fallback_anketa;
use crate::llm::{ChatLlm, ChatMessage};
use crate::prompt::{build_extraction_prompt, build_interview_prompt, detect_country_hint};

const EXTRACTION_TEMPERATURE: f32 = 0.1;
const EXTRACTION_MAX_TOKENS: u32 = 4096;

/// Produces a canonical anketa from dialogue, optional document context,
/// and an optional prior anketa (§4.5). Holds no per-session state of its
/// own — all routing state lives in the orchestrator.
pub struct ExtractionCoordinator<L: ChatLlm> {
    llm: L,
}

impl<L: ChatLlm> ExtractionCoordinator<L> {
    pub fn new(llm: L) -> Self {
        Self { llm }
    }

    /// Extract a canonical [`Anketa`]. Never fails: on LLM or parse failure
    /// this returns a fallback anketa and logs the failure.
    pub async fn extract(
        &self,
        dialogue: &[DialogueTurn],
        duration_seconds: f64,
        document_context: Option<&DocumentContext>,
        prior: Option<&Anketa>,
    ) -> Anketa {
        let country_hint = detect_country_hint(dialogue);
        let prompt = build_extraction_prompt(dialogue, document_context, country_hint.as_deref());

        let response = match self
            .llm
            .chat(&[ChatMessage::user(prompt)], EXTRACTION_TEMPERATURE, EXTRACTION_MAX_TOKENS)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "chat LLM call failed during extraction");
                return build_fallback_anketa(dialogue, prior, duration_seconds);
            }
        };

        let value = match repair_and_parse(&response) {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "JSON repair failed during extraction");
                return build_fallback_anketa(dialogue, prior, duration_seconds);
            }
        };

        let mut anketa = build_anketa_from_json(&value, duration_seconds);
        fill_via_role_extraction(&mut anketa, dialogue);

        info!(
            company = %anketa.company_name,
            completion_rate = anketa.completion_rate(),
            "anketa extracted"
        );
        anketa
    }

    /// Interview-mode routing (§4.5): produces an [`InterviewAnketa`]
    /// instead, bypassing industry enrichment. Falls back to a minimal
    /// record (never null) on failure.
    pub async fn extract_interview(
        &self,
        dialogue: &[DialogueTurn],
        duration_seconds: f64,
    ) -> InterviewAnketa {
        let prompt = build_interview_prompt(dialogue);
        let response = match self
            .llm
            .chat(&[ChatMessage::user(prompt)], EXTRACTION_TEMPERATURE, EXTRACTION_MAX_TOKENS)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "chat LLM call failed during interview extraction");
                return InterviewAnketa { consultation_duration_seconds: duration_seconds, ..Default::default() };
            }
        };

        match repair_and_parse(&response) {
            Ok(value) => build_interview_anketa_from_json(&value, duration_seconds),
            Err(e) => {
                error!(error = %e, "JSON repair failed during interview extraction");
                InterviewAnketa { consultation_duration_seconds: duration_seconds, ..Default::default() }
            }
        }
    }
}

fn str_field(value: &serde_json::Value, key: &str) -> String {
    value.get(key).and_then(|v| v.as_str()).unwrap_or("").to_string()
}

fn list_field(value: &serde_json::Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).map(str::to_string).collect())
        .unwrap_or_default()
}

fn parse_priority(s: &str) -> Priority {
    match s {
        "high" => Priority::High,
        "low" => Priority::Low,
        _ => Priority::Medium,
    }
}

fn parse_agent_functions(value: &serde_json::Value, key: &str) -> Vec<AgentFunction> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|f| f.as_object())
                .map(|f| AgentFunction {
                    name: f.get("name").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                    description: f.get("description").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                    priority: parse_priority(f.get("priority").and_then(|v| v.as_str()).unwrap_or("medium")),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_integrations(value: &serde_json::Value) -> Vec<Integration> {
    value
        .get("integrations")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|i| i.as_object())
                .map(|i| Integration {
                    name: i.get("name").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                    purpose: i.get("purpose").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                    required: i.get("required").and_then(|v| v.as_bool()).unwrap_or(true),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Map the flat extraction JSON onto the typed anketa schema, applying
/// dialogue-marker cleaning and the `voice_gender`/`voice_tone`/
/// `call_direction` defaults when the LLM omitted them (§4.5).
fn build_anketa_from_json(value: &serde_json::Value, duration_seconds: f64) -> Anketa {
    let mut anketa = Anketa {
        company_name: cleaner::clean_field(&str_field(value, "company_name")),
        industry: cleaner::clean_field(&str_field(value, "industry")),
        specialization: cleaner::clean_field(&str_field(value, "specialization")),
        website: value.get("website").and_then(|v| v.as_str()).map(str::to_string),
        contact_name: cleaner::clean_field(&str_field(value, "contact_name")),
        contact_role: cleaner::clean_field(&str_field(value, "contact_role")),
        contact_phone: value
            .get("contact_phone")
            .and_then(|v| v.as_str())
            .map(cleaner::clean_field)
            .filter(|s| !s.is_empty()),
        business_description: cleaner::clean_field(&str_field(value, "business_description")),
        services: cleaner::clean_list(&list_field(value, "services")),
        client_types: cleaner::clean_list(&list_field(value, "client_types")),
        current_problems: cleaner::clean_list(&list_field(value, "current_problems")),
        business_goals: cleaner::clean_list(&list_field(value, "business_goals")),
        constraints: cleaner::clean_list(&list_field(value, "constraints")),
        agent_name: cleaner::clean_field(&str_field(value, "agent_name")),
        agent_purpose: cleaner::clean_field(&str_field(value, "agent_purpose")),
        agent_functions: parse_agent_functions(value, "agent_functions"),
        additional_functions: parse_agent_functions(value, "additional_functions"),
        typical_questions: cleaner::clean_list(&list_field(value, "typical_questions")),
        integrations: parse_integrations(value),
        consultation_duration_seconds: duration_seconds,
        ..Anketa::default()
    };

    if let Some(v) = value.get("voice_gender").and_then(|v| v.as_str()) {
        if !v.is_empty() {
            anketa.voice_gender = v.to_string();
        }
    }
    if let Some(v) = value.get("voice_tone").and_then(|v| v.as_str()) {
        if !v.is_empty() {
            anketa.voice_tone = v.to_string();
        }
    }
    if let Some(v) = value.get("language").and_then(|v| v.as_str()) {
        if !v.is_empty() {
            anketa.language = v.to_string();
        }
    }
    if let Some(v) = value.get("call_direction").and_then(|v| v.as_str()) {
        if !v.is_empty() {
            anketa.call_direction = v.to_string();
        }
    }

    anketa
}

fn build_interview_anketa_from_json(value: &serde_json::Value, duration_seconds: f64) -> InterviewAnketa {
    use consult_anketa::FaqItem;

    let qa_pairs = value
        .get("qa_pairs")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|p| p.as_object())
                .map(|p| FaqItem {
                    question: p.get("question").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                    answer: p.get("answer").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    InterviewAnketa {
        company_name: cleaner::clean_field(&str_field(value, "company_name")),
        industry: cleaner::clean_field(&str_field(value, "industry")),
        contact_name: cleaner::clean_field(&str_field(value, "contact_name")),
        qa_pairs,
        insights: cleaner::clean_list(&list_field(value, "insights")),
        summary: cleaner::clean_field(&str_field(value, "summary")),
        consultation_duration_seconds: duration_seconds,
        ..InterviewAnketa::default()
    }
}

/// Fill contact fields from the dialogue via role-based extraction (§4.4)
/// whenever the canonical extractor left them empty.
fn fill_via_role_extraction(anketa: &mut Anketa, dialogue: &[DialogueTurn]) {
    let pairs: Vec<(String, String)> =
        dialogue.iter().map(|t| (t.role.clone(), t.content.clone())).collect();

    if anketa.company_name.is_empty() {
        if let Some(recovered) = cleaner::recover_company_name(&pairs) {
            anketa.company_name = recovered.value;
        }
    }
    if anketa.contact_phone.is_none() {
        if let Some(recovered) = cleaner::recover_contact_phone(&pairs) {
            anketa.contact_phone = Some(recovered.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use consult_core::error::ConsultError;

    struct StubLlm {
        response: String,
    }

    #[async_trait]
    impl ChatLlm for StubLlm {
        async fn chat(&self, _messages: &[ChatMessage], _t: f32, _m: u32) -> Result<String, ConsultError> {
            Ok(self.response.clone())
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl ChatLlm for FailingLlm {
        async fn chat(&self, _messages: &[ChatMessage], _t: f32, _m: u32) -> Result<String, ConsultError> {
            Err(ConsultError::CollaboratorUnavailable("down".to_string()))
        }
    }

    fn turn(role: &str, content: &str) -> DialogueTurn {
        DialogueTurn { role: role.to_string(), content: content.to_string(), timestamp: String::new(), phase: String::new() }
    }

    #[tokio::test]
    async fn extract_parses_well_formed_llm_json() {
        let coordinator = ExtractionCoordinator::new(StubLlm {
            response: r#"{"company_name": "Acme", "industry": "retail"}"#.to_string(),
        });
        let anketa = coordinator.extract(&[], 10.0, None, None).await;
        assert_eq!(anketa.company_name, "Acme");
        assert_eq!(anketa.industry, "retail");
        assert_eq!(anketa.voice_gender, "female");
    }

    #[tokio::test]
    async fn extract_falls_back_on_llm_failure() {
        let coordinator = ExtractionCoordinator::new(FailingLlm);
        let anketa = coordinator.extract(&[], 5.0, None, None).await;
        assert_eq!(anketa.consultation_duration_seconds, 5.0);
    }

    #[tokio::test]
    async fn extract_falls_back_on_unparseable_response() {
        let coordinator = ExtractionCoordinator::new(StubLlm { response: "not json".repeat(50) });
        let anketa = coordinator.extract(&[], 0.0, None, None).await;
        assert_eq!(anketa.company_name, "");
    }

    #[tokio::test]
    async fn extract_recovers_contact_phone_when_llm_omits_it() {
        let coordinator = ExtractionCoordinator::new(StubLlm {
            response: r#"{"company_name": "Acme"}"#.to_string(),
        });
        let dialogue = vec![turn("user", "reach me at +1 555 123 4567")];
        let anketa = coordinator.extract(&dialogue, 0.0, None, None).await;
        assert!(anketa.contact_phone.is_some());
    }

    #[tokio::test]
    async fn interview_extraction_produces_qa_pairs() {
        let coordinator = ExtractionCoordinator::new(StubLlm {
            response: r#"{"qa_pairs": [{"question": "Why?", "answer": "Because"}], "summary": "ok"}"#.to_string(),
        });
        let interview = coordinator.extract_interview(&[], 0.0).await;
        assert_eq!(interview.qa_pairs.len(), 1);
        assert_eq!(interview.summary, "ok");
    }
}
