use thiserror::Error;

/// Every failure a caller of the client or the project store can see.
///
/// None of these are fatal: the store leaves its cached state untouched
/// whenever one is returned, and nothing is retried automatically.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),

    /// The backend (or a proxy in front of it) answered with something
    /// that is not JSON.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("{message}")]
    Api { message: String },

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("project {0} has not been saved yet")]
    NotSaved(String),

    #[error("column '{column}' is not available in project {uid}")]
    UnknownColumn { uid: String, column: String },

    #[error("unsupported auto-sync interval: {0}s")]
    InvalidInterval(u64),

    #[error("project {uid} changed while the request was in flight")]
    Conflict { uid: String },

    #[error("session error: {0}")]
    Session(String),
}

impl ClientError {
    pub fn api(message: impl Into<String>) -> Self {
        ClientError::Api {
            message: message.into(),
        }
    }

    /// Short machine-friendly kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Network(_) => "network",
            ClientError::Protocol(_) => "protocol",
            ClientError::Api { .. } => "api",
            ClientError::ProjectNotFound(_) => "project_not_found",
            ClientError::NotSaved(_) => "not_saved",
            ClientError::UnknownColumn { .. } => "unknown_column",
            ClientError::InvalidInterval(_) => "invalid_interval",
            ClientError::Conflict { .. } => "conflict",
            ClientError::Session(_) => "session",
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Protocol(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
