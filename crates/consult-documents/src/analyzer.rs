//! LLM-driven document-set analysis (§4.9). Never raises: an LLM or parse
//! failure falls back to a rule-based digest so an upload can never leave a
//! session without *some* `DocumentContext`.

use regex::Regex;
use std::sync::OnceLock;

use tracing::{error, info};

use consult_extraction::{ChatLlm, ChatMessage};
use consult_store::{DocumentContext, DocumentDigest};

use crate::parser::ParsedDocument;

const ANALYSIS_TEMPERATURE: f32 = 0.1;
const ANALYSIS_MAX_TOKENS: u32 = 2048;
const SUMMARY_FALLBACK_CHARS: usize = 400;

pub struct DocumentAnalyzer<L: ChatLlm> {
    llm: L,
}

impl<L: ChatLlm> DocumentAnalyzer<L> {
    pub fn new(llm: L) -> Self {
        Self { llm }
    }

    /// Summarize a batch of parsed documents into one [`DocumentContext`].
    /// Falls back to a rule-based digest (no LLM call succeeded, or its
    /// output did not parse) rather than failing the upload.
    pub async fn analyze(&self, docs: &[ParsedDocument]) -> DocumentContext {
        let prompt = build_analysis_prompt(docs);
        let response = match self.llm.chat(&[ChatMessage::user(prompt)], ANALYSIS_TEMPERATURE, ANALYSIS_MAX_TOKENS).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "chat LLM call failed during document analysis");
                return fallback_context(docs);
            }
        };

        match consult_anketa::json_repair::repair_and_parse(&response) {
            Ok(value) => {
                let context = context_from_json(&value, docs);
                info!(documents = docs.len(), key_facts = context.key_facts.len(), "documents analyzed");
                context
            }
            Err(e) => {
                error!(error = %e, "JSON repair failed during document analysis");
                fallback_context(docs)
            }
        }
    }
}

fn build_analysis_prompt(docs: &[ParsedDocument]) -> String {
    let mut body = String::from(
        "Analyze the following uploaded business documents. Return strict JSON with keys \
         summary (string), key_facts (string array), services_mentioned (string array), \
         contacts (string array of names/emails/phones found).\n\n",
    );
    for doc in docs {
        body.push_str(&format!("--- {} ---\n", doc.filename));
        for chunk in doc.chunks.iter().take(3) {
            body.push_str(chunk);
            body.push('\n');
        }
    }
    body
}

fn context_from_json(value: &serde_json::Value, docs: &[ParsedDocument]) -> DocumentContext {
    let str_list = |key: &str| -> Vec<String> {
        value
            .get(key)
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).map(str::to_string).collect())
            .unwrap_or_default()
    };

    DocumentContext {
        summary: value.get("summary").and_then(|v| v.as_str()).unwrap_or("").to_string(),
        key_facts: str_list("key_facts"),
        services_mentioned: str_list("services_mentioned"),
        contacts: str_list("contacts"),
        documents: digests(docs),
    }
}

fn digests(docs: &[ParsedDocument]) -> Vec<DocumentDigest> {
    docs.iter()
        .map(|d| DocumentDigest { filename: d.filename.clone(), summary: truncated_summary(d) })
        .collect()
}

fn truncated_summary(doc: &ParsedDocument) -> String {
    let joined = doc.chunks.join(" ");
    joined.chars().take(SUMMARY_FALLBACK_CHARS).collect()
}

/// Rule-based digest used when the LLM path fails entirely: a truncated
/// per-document summary plus contacts recovered by regex.
fn fallback_context(docs: &[ParsedDocument]) -> DocumentContext {
    let full_text: String = docs.iter().map(|d| d.chunks.join(" ")).collect::<Vec<_>>().join(" ");
    DocumentContext {
        summary: docs.iter().map(truncated_summary).collect::<Vec<_>>().join(" "),
        key_facts: Vec::new(),
        services_mentioned: Vec::new(),
        contacts: recover_contacts(&full_text),
        documents: digests(docs),
    }
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\w.+-]+@[\w-]+\.[\w.-]+").unwrap())
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\+\d[\d\s().-]{6,}\d").unwrap())
}

fn recover_contacts(text: &str) -> Vec<String> {
    let mut found: Vec<String> = email_re().find_iter(text).map(|m| m.as_str().to_string()).collect();
    found.extend(phone_re().find_iter(text).map(|m| m.as_str().trim().to_string()));
    found
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
        async fn chat(&self, _m: &[ChatMessage], _t: f32, _mt: u32) -> Result<String, ConsultError> {
            Ok(self.response.clone())
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl ChatLlm for FailingLlm {
        async fn chat(&self, _m: &[ChatMessage], _t: f32, _mt: u32) -> Result<String, ConsultError> {
            Err(ConsultError::CollaboratorUnavailable("down".to_string()))
        }
    }

    fn doc(filename: &str, body: &str) -> ParsedDocument {
        ParsedDocument { filename: filename.to_string(), chunks: vec![body.to_string()] }
    }

    #[tokio::test]
    async fn analyze_parses_well_formed_llm_json() {
        let analyzer = DocumentAnalyzer::new(StubLlm {
            response: r#"{"summary": "a pricing sheet", "key_facts": ["tier A costs $10"], "services_mentioned": ["support"], "contacts": []}"#.to_string(),
        });
        let ctx = analyzer.analyze(&[doc("pricing.txt", "tier A costs $10")]).await;
        assert_eq!(ctx.summary, "a pricing sheet");
        assert_eq!(ctx.key_facts.len(), 1);
        assert_eq!(ctx.documents.len(), 1);
    }

    #[tokio::test]
    async fn analyze_falls_back_on_llm_failure() {
        let analyzer = DocumentAnalyzer::new(FailingLlm);
        let ctx = analyzer.analyze(&[doc("notes.txt", "contact us at sales@acme.test")]).await;
        assert!(ctx.contacts.iter().any(|c| c.contains("sales@acme.test")));
    }

    #[tokio::test]
    async fn analyze_falls_back_on_unparseable_response() {
        let analyzer = DocumentAnalyzer::new(StubLlm { response: "not json".repeat(50) });
        let ctx = analyzer.analyze(&[doc("notes.txt", "plain body")]).await;
        assert_eq!(ctx.key_facts.len(), 0);
        assert_eq!(ctx.documents[0].filename, "notes.txt");
    }
}
