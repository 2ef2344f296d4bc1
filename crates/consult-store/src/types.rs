use serde::{Deserialize, Serialize};

/// Persistent session status (§4.2). Stored as its lowercase string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Paused,
    Reviewing,
    Confirmed,
    Declined,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Reviewing => "reviewing",
            SessionStatus::Confirmed => "confirmed",
            SessionStatus::Declined => "declined",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SessionStatus::Active),
            "paused" => Some(SessionStatus::Paused),
            "reviewing" => Some(SessionStatus::Reviewing),
            "confirmed" => Some(SessionStatus::Confirmed),
            "declined" => Some(SessionStatus::Declined),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single dialogue turn (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub role: String,
    pub content: String,
    pub timestamp: String,
    #[serde(default)]
    pub phase: String,
}

/// Recognised voice_config keys (§3). Unknown keys are rejected at ingress
/// by the HTTP surface and silently dropped again here (defence in depth,
/// §4.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silence_duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<String>,
}

impl VoiceConfig {
    /// Merge `other` into `self`, keeping existing values for fields `other`
    /// leaves unset. Used by `update_voice_config`'s atomic merge.
    pub fn merge(&mut self, other: VoiceConfig) {
        if other.consultation_type.is_some() {
            self.consultation_type = other.consultation_type;
        }
        if other.voice_gender.is_some() {
            self.voice_gender = other.voice_gender;
        }
        if other.voice_tone.is_some() {
            self.voice_tone = other.voice_tone;
        }
        if other.language.is_some() {
            self.language = other.language;
        }
        if other.speech_speed.is_some() {
            self.speech_speed = other.speech_speed;
        }
        if other.silence_duration_ms.is_some() {
            self.silence_duration_ms = other.silence_duration_ms;
        }
        if other.llm_provider.is_some() {
            self.llm_provider = other.llm_provider;
        }
        if other.verbosity.is_some() {
            self.verbosity = other.verbosity;
        }
    }
}

/// Per-document digest retained in `DocumentContext` (chunks themselves are
/// stripped before persistence, §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDigest {
    pub filename: String,
    pub summary: String,
}

/// Structured summary of uploaded files (§3, §4.9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentContext {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_facts: Vec<String>,
    #[serde(default)]
    pub services_mentioned: Vec<String>,
    #[serde(default)]
    pub contacts: Vec<String>,
    #[serde(default)]
    pub documents: Vec<DocumentDigest>,
}

/// The central session entity (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub unique_link: String,
    pub room_name: String,
    pub status: SessionStatus,
    pub dialogue_history: Vec<DialogueTurn>,
    pub anketa_data: Option<serde_json::Value>,
    pub anketa_md: Option<String>,
    pub document_context: Option<DocumentContext>,
    pub voice_config: Option<VoiceConfig>,
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    pub duration_seconds: f64,
    pub output_dir: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Lightweight list-view projection (§4.1 `list_sessions_summary`). Never
/// carries `dialogue_history` or `anketa_data` — those are large.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub status: SessionStatus,
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    pub has_documents: bool,
    pub created_at: String,
    pub updated_at: String,
}
