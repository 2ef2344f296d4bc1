use thiserror::Error;

/// Top-level error kind, per §7 of the spec: every variant maps to a client
/// status code at the HTTP boundary and a logging policy for background
/// tasks.
#[derive(Debug, Error)]
pub enum ConsultError {
    #[error("session not found: {id}")]
    NotFound { id: String },

    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("JSON repair failed: {0}")]
    JsonRepair(String),

    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsultError {
    /// Short error code sent to clients in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ConsultError::NotFound { .. } => "NOT_FOUND",
            ConsultError::InvalidTransition { .. } => "INVALID_TRANSITION",
            ConsultError::InvalidInput(_) => "INVALID_INPUT",
            ConsultError::Storage(_) => "STORAGE_ERROR",
            ConsultError::JsonRepair(_) => "JSON_REPAIR_ERROR",
            ConsultError::CollaboratorUnavailable(_) => "COLLABORATOR_UNAVAILABLE",
            ConsultError::Config(_) => "CONFIG_ERROR",
            ConsultError::Serialization(_) => "SERIALIZATION_ERROR",
            ConsultError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsultError>;
