use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8089;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Runtime status cache cap (§4.3).
pub const RUNTIME_CACHE_CAP: usize = 5000;
/// Runtime status entry TTL, in seconds (§4.3).
pub const RUNTIME_CACHE_TTL_SECS: i64 = 3600;
/// Runtime cache sweep interval, in seconds (§4.3).
pub const RUNTIME_CACHE_SWEEP_SECS: u64 = 300;

/// Top-level config (`consult.toml` + `CONSULT_*` env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub room: RoomConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
    #[serde(default)]
    pub voice_bridge: VoiceBridgeConfig,
}

impl Default for ConsultConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            llm: LlmConfig::default(),
            room: RoomConfig::default(),
            uploads: UploadsConfig::default(),
            voice_bridge: VoiceBridgeConfig::default(),
        }
    }
}

impl ConsultConfig {
    /// Load config: explicit path > `CONSULT_CONFIG` env > `./consult.toml`.
    /// Falls back to defaults (with a warning logged by the caller) when
    /// nothing is found — per §7, `ConfigError` never aborts startup.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(|| "./consult.toml".to_string());

        let config: ConsultConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CONSULT_").split("_"))
            .extract()
            .map_err(|e| crate::error::ConsultError::Config(e.to_string()))?;

        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "data/sessions.db".to_string()
}

/// Chat-completion LLM collaborator settings (extraction, §4.5/§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Request timeout in seconds (§6: "LLM ~60s chat").
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_llm_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout_secs(),
            max_retries: default_llm_max_retries(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    60
}

fn default_llm_max_retries() -> u32 {
    3
}

/// WebRTC room-service collaborator settings (§4.7, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Empty-room TTL in seconds (§4.8: 5-minute default).
    #[serde(default = "default_empty_room_ttl")]
    pub empty_room_ttl_secs: u64,
    #[serde(default = "default_agent_name")]
    pub agent_name: String,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            api_secret: None,
            empty_room_ttl_secs: default_empty_room_ttl(),
            agent_name: default_agent_name(),
        }
    }
}

fn default_empty_room_ttl() -> u64 {
    300
}

fn default_agent_name() -> String {
    "voice-consultant".to_string()
}

/// Document upload pipeline settings (§4.9, §4.8 "Documents").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadsConfig {
    #[serde(default = "default_upload_dir")]
    pub dir: String,
    #[serde(default = "default_max_files")]
    pub max_files_per_session: usize,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            max_files_per_session: default_max_files(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_upload_dir() -> String {
    "data/uploads".to_string()
}

fn default_max_files() -> usize {
    5
}

fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

/// Voice-agent bridge tuning (§4.7, §9 open question on greeting-lock).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceBridgeConfig {
    #[serde(default = "default_greeting_lock_ms")]
    pub greeting_lock_ms: u64,
    #[serde(default = "default_vad_threshold")]
    pub vad_threshold: f32,
    #[serde(default = "default_prefix_padding_ms")]
    pub prefix_padding_ms: u64,
    #[serde(default = "default_silence_duration_ms")]
    pub default_silence_duration_ms: u64,
}

impl Default for VoiceBridgeConfig {
    fn default() -> Self {
        Self {
            greeting_lock_ms: default_greeting_lock_ms(),
            vad_threshold: default_vad_threshold(),
            prefix_padding_ms: default_prefix_padding_ms(),
            default_silence_duration_ms: default_silence_duration_ms(),
        }
    }
}

fn default_greeting_lock_ms() -> u64 {
    1000
}

fn default_vad_threshold() -> f32 {
    0.6
}

fn default_prefix_padding_ms() -> u64 {
    300
}

fn default_silence_duration_ms() -> u64 {
    1200
}
