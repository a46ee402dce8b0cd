use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// A Kobo API credential registered with the portal. Only a masked
/// preview of the secret is ever returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    #[serde(alias = "tokenId", alias = "_id")]
    pub id: String,
    #[serde(default, alias = "tokenName", alias = "displayName")]
    pub display_name: String,
    #[serde(default, alias = "tokenPreview", alias = "maskedPreview")]
    pub masked_preview: String,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A token being registered. The raw secret is wiped from memory when
/// this value drops.
pub struct NewToken {
    pub secret: Zeroizing<String>,
    pub display_name: String,
}

impl NewToken {
    pub fn new(secret: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
            display_name: display_name.into(),
        }
    }
}

impl std::fmt::Debug for NewToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewToken")
            .field("secret", &"[REDACTED]")
            .field("display_name", &self.display_name)
            .finish()
    }
}
