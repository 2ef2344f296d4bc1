use serde::{Deserialize, Serialize};

fn default_voice_gender() -> String {
    "female".to_string()
}
fn default_voice_tone() -> String {
    "professional".to_string()
}
fn default_call_direction() -> String {
    "inbound".to_string()
}
fn default_language() -> String {
    "ru".to_string()
}

/// Relative importance, shared across several sub-shapes (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentFunction {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Integration {
    pub name: String,
    pub purpose: String,
    #[serde(default = "default_true")]
    pub required: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectionHandler {
    pub objection: String,
    pub response: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogueRole {
    Bot,
    Client,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueExample {
    pub role: DialogueRole,
    pub message: String,
    #[serde(default)]
    pub intent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Immediate,
    Hour,
    Day,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationRule {
    pub trigger: String,
    pub urgency: Urgency,
    pub action: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiRecommendation {
    pub recommendation: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub effort: String,
}

/// Canonical questionnaire (§3). Identity/business/voice fields are always
/// present; the AI-enriched sections populate once background enrichment
/// and research have had a chance to run (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anketa {
    // Identity
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub contact_name: String,
    #[serde(default)]
    pub contact_role: String,
    #[serde(default)]
    pub contact_phone: Option<String>,

    // Business context
    #[serde(default)]
    pub business_description: String,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub client_types: Vec<String>,
    #[serde(default)]
    pub current_problems: Vec<String>,
    #[serde(default)]
    pub business_goals: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,

    // Voice agent
    #[serde(default)]
    pub agent_name: String,
    #[serde(default)]
    pub agent_purpose: String,
    #[serde(default)]
    pub agent_functions: Vec<AgentFunction>,
    #[serde(default)]
    pub additional_functions: Vec<AgentFunction>,
    #[serde(default)]
    pub typical_questions: Vec<String>,

    // Voice parameters
    #[serde(default = "default_voice_gender")]
    pub voice_gender: String,
    #[serde(default = "default_voice_tone")]
    pub voice_tone: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_call_direction")]
    pub call_direction: String,

    // Integrations
    #[serde(default)]
    pub integrations: Vec<Integration>,

    // AI-enriched sections
    #[serde(default)]
    pub faq: Vec<FaqItem>,
    #[serde(default)]
    pub objection_handlers: Vec<ObjectionHandler>,
    #[serde(default)]
    pub sample_dialogue: Vec<DialogueExample>,
    #[serde(default)]
    pub financial_metrics: Vec<String>,
    #[serde(default)]
    pub competitors: Vec<String>,
    #[serde(default)]
    pub market_insights: Vec<String>,
    #[serde(default)]
    pub escalation_rules: Vec<EscalationRule>,
    #[serde(default)]
    pub kpis: Vec<String>,
    #[serde(default)]
    pub launch_checklist: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<AiRecommendation>,

    // Metadata
    pub created_at: String,
    #[serde(default)]
    pub consultation_duration_seconds: f64,
}

impl Default for Anketa {
    fn default() -> Self {
        Self {
            company_name: String::new(),
            industry: String::new(),
            specialization: String::new(),
            website: None,
            contact_name: String::new(),
            contact_role: String::new(),
            contact_phone: None,
            business_description: String::new(),
            services: Vec::new(),
            client_types: Vec::new(),
            current_problems: Vec::new(),
            business_goals: Vec::new(),
            constraints: Vec::new(),
            agent_name: String::new(),
            agent_purpose: String::new(),
            agent_functions: Vec::new(),
            additional_functions: Vec::new(),
            typical_questions: Vec::new(),
            voice_gender: default_voice_gender(),
            voice_tone: default_voice_tone(),
            language: default_language(),
            call_direction: default_call_direction(),
            integrations: Vec::new(),
            faq: Vec::new(),
            objection_handlers: Vec::new(),
            sample_dialogue: Vec::new(),
            financial_metrics: Vec::new(),
            competitors: Vec::new(),
            market_insights: Vec::new(),
            escalation_rules: Vec::new(),
            kpis: Vec::new(),
            launch_checklist: Vec::new(),
            recommendations: Vec::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
            consultation_duration_seconds: 0.0,
        }
    }
}

/// The 15-field required set used for completion-rate scoring (§3, §8 S6).
/// Three of these (`voice_gender`, `voice_tone`, `call_direction`) carry a
/// schema default and are excluded from numerator and denominator alike
/// when their value still matches that default.
const REQUIRED_FIELD_COUNT: u32 = 15;

impl Anketa {
    /// Fraction of the 15-field required set that is filled with a
    /// non-default value. Defaulted fields are excluded from both the
    /// numerator and the denominator (§3).
    pub fn completion_rate(&self) -> f64 {
        let mut filled = 0u32;
        let mut defaulted = 0u32;

        let mut count_str = |value: &str| {
            if !value.trim().is_empty() {
                filled += 1;
            }
        };
        count_str(&self.company_name);
        count_str(&self.industry);
        count_str(&self.specialization);
        if self.website.as_deref().is_some_and(|w| !w.trim().is_empty()) {
            filled += 1;
        }
        count_str(&self.contact_name);
        count_str(&self.contact_role);
        count_str(&self.business_description);
        if !self.services.is_empty() {
            filled += 1;
        }
        count_str(&self.agent_name);
        count_str(&self.agent_purpose);
        if !self.agent_functions.is_empty() {
            filled += 1;
        }
        if !self.typical_questions.is_empty() {
            filled += 1;
        }

        if self.voice_gender == default_voice_gender() {
            defaulted += 1;
        } else {
            filled += 1;
        }
        if self.voice_tone == default_voice_tone() {
            defaulted += 1;
        } else {
            filled += 1;
        }
        if self.call_direction == default_call_direction() {
            defaulted += 1;
        } else {
            filled += 1;
        }

        let denom = REQUIRED_FIELD_COUNT - defaulted;
        if denom == 0 {
            return 1.0;
        }
        f64::from(filled) / f64::from(denom)
    }
}

/// Alternate anketa shape produced when `consultation_type == "interview"`
/// (§4.5). Centred on Q&A pairs and insights rather than a voice-agent
/// proposal; shares identity/metadata fields with [`Anketa`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewAnketa {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub contact_name: String,
    #[serde(default)]
    pub qa_pairs: Vec<FaqItem>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub summary: String,
    pub created_at: String,
    #[serde(default)]
    pub consultation_duration_seconds: f64,
}

impl Default for InterviewAnketa {
    fn default() -> Self {
        Self {
            company_name: String::new(),
            industry: String::new(),
            contact_name: String::new(),
            qa_pairs: Vec::new(),
            insights: Vec::new(),
            summary: String::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
            consultation_duration_seconds: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_anketa_has_zero_completion() {
        let anketa = Anketa::default();
        assert_eq!(anketa.completion_rate(), 0.0);
    }

    #[test]
    fn s6_three_fields_filled_defaults_unchanged() {
        let mut anketa = Anketa::default();
        anketa.company_name = "X".to_string();
        anketa.industry = "Y".to_string();
        anketa.business_description = "Z".to_string();
        assert!((anketa.completion_rate() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn s6_setting_voice_gender_raises_rate() {
        let mut anketa = Anketa::default();
        anketa.company_name = "X".to_string();
        anketa.industry = "Y".to_string();
        anketa.business_description = "Z".to_string();
        anketa.voice_gender = "male".to_string();
        let rate = anketa.completion_rate();
        assert!((rate - (4.0 / 13.0)).abs() < 1e-9);
    }

    #[test]
    fn fully_filled_anketa_approaches_one() {
        let mut anketa = Anketa::default();
        anketa.company_name = "Acme".to_string();
        anketa.industry = "retail".to_string();
        anketa.specialization = "b2b".to_string();
        anketa.website = Some("https://acme.test".to_string());
        anketa.contact_name = "Jane".to_string();
        anketa.contact_role = "CEO".to_string();
        anketa.business_description = "Sells widgets".to_string();
        anketa.services = vec!["widgets".to_string()];
        anketa.agent_name = "Ava".to_string();
        anketa.agent_purpose = "handle inbound calls".to_string();
        anketa.agent_functions = vec![AgentFunction {
            name: "book_appointment".to_string(),
            description: "books".to_string(),
            priority: Priority::High,
        }];
        anketa.typical_questions = vec!["What are your hours?".to_string()];
        anketa.voice_gender = "male".to_string();
        anketa.voice_tone = "friendly".to_string();
        anketa.call_direction = "outbound".to_string();
        assert!((anketa.completion_rate() - 1.0).abs() < 1e-9);
    }
}
