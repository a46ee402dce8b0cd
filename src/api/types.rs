//! Wire shapes for the portal backend.
//!
//! Every response is wrapped in a `{ success, ... }` envelope; the client
//! strips and checks `success` before these are decoded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Project, Token};

// ── Requests ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AddTokenBody<'a> {
    pub token: &'a str,
    #[serde(rename = "tokenName")]
    pub token_name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UpdateColumnsBody<'a> {
    pub selected_columns: &'a [String],
}

#[derive(Debug, Serialize)]
pub struct AutoSyncBody {
    pub enabled: bool,
    /// `HH:MM:SS`
    pub interval: String,
}

// ── Responses ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct TokenList {
    #[serde(default)]
    pub tokens: Vec<Token>,
}

/// Result of registering a token: the backend immediately lists the
/// projects that token can see.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenImport {
    pub token_id: String,
    #[serde(default)]
    pub token_name: String,
    #[serde(default)]
    pub token_preview: String,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub total_projects: u64,
    #[serde(default)]
    pub total_submissions: u64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TokenImport {
    pub fn token(&self) -> Token {
        Token {
            id: self.token_id.clone(),
            display_name: self.token_name.clone(),
            masked_preview: self.token_preview.clone(),
            created_at: self.timestamp,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectList {
    #[serde(default)]
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectEnvelope {
    pub project: Project,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncResult {
    /// Absent when the backend answers without a body (204).
    #[serde(default, alias = "totalSubmissions")]
    pub total_submissions: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
}
