use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::interval::parse_hms;

/// One row of collected data: column name → scalar value.
pub type Submission = Map<String, Value>;

/// A Kobo data-collection project as the portal backend describes it.
///
/// The backend mixes `snake_case` and `camelCase` keys, so every field
/// accepts both spellings on input. Output is always `snake_case`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub uid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub active: bool,
    #[serde(default, alias = "totalSubmissions")]
    pub total_submissions: u64,
    #[serde(default, alias = "availableColumns")]
    pub available_columns: Vec<String>,
    #[serde(default, alias = "selectedColumns")]
    pub selected_columns: Vec<String>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
    #[serde(default, alias = "autoSync")]
    pub auto_sync: AutoSync,
    #[serde(default, alias = "lastSyncAt")]
    pub last_sync_at: Option<DateTime<Utc>>,
    /// `false` while the project only exists in the local cache (fetched
    /// through a token import but never saved).
    #[serde(skip)]
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoSync {
    #[serde(default)]
    pub enabled: bool,
    #[serde(
        default = "default_interval_secs",
        alias = "interval",
        alias = "intervalSeconds",
        deserialize_with = "interval_secs"
    )]
    pub interval_seconds: u64,
    #[serde(default, alias = "nextSyncAt", alias = "next_sync")]
    pub next_sync_at: Option<DateTime<Utc>>,
}

fn default_interval_secs() -> u64 {
    3_600
}

/// The backend reports intervals either as seconds or as `HH:MM:SS`.
fn interval_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Secs(s) => Ok(s),
        Raw::Text(t) => parse_hms(&t)
            .or_else(|| t.parse().ok())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid interval '{}'", t))),
    }
}

impl Default for AutoSync {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_seconds: default_interval_secs(),
            next_sync_at: None,
        }
    }
}

impl AutoSync {
    /// The next scheduled sync, only while auto-sync is enabled.
    pub fn next_sync(&self) -> Option<DateTime<Utc>> {
        if self.enabled {
            self.next_sync_at
        } else {
            None
        }
    }

    /// Local display estimate after a successful configuration change.
    /// The next full reload replaces it with the server's value.
    pub fn reschedule(&mut self, enabled: bool, interval_seconds: u64, now: DateTime<Utc>) {
        self.enabled = enabled;
        self.interval_seconds = interval_seconds;
        self.next_sync_at = if enabled {
            Some(now + Duration::seconds(interval_seconds as i64))
        } else {
            None
        };
    }
}

impl Project {
    pub fn is_available(&self, column: &str) -> bool {
        self.available_columns.iter().any(|c| c == column)
    }

    /// Columns used for display and export: the selection, or the whole
    /// schema when nothing is selected.
    pub fn export_headers(&self) -> &[String] {
        if self.selected_columns.is_empty() {
            &self.available_columns
        } else {
            &self.selected_columns
        }
    }

    /// Bring a freshly fetched project into a consistent shape: discover
    /// the schema from submissions if the server sent none, then drop any
    /// selected column that is not part of the schema.
    pub fn normalize(&mut self) {
        if self.available_columns.is_empty() && !self.submissions.is_empty() {
            self.available_columns = discover_columns(&self.submissions);
        }

        let before = self.selected_columns.len();
        let mut kept: Vec<String> = Vec::with_capacity(before);
        for col in self.selected_columns.drain(..) {
            if self.available_columns.contains(&col) && !kept.contains(&col) {
                kept.push(col);
            }
        }
        if kept.len() != before {
            tracing::debug!(
                uid = %self.uid,
                dropped = before - kept.len(),
                "dropped selected columns outside the project schema"
            );
        }
        self.selected_columns = kept;
    }
}

/// Union of submission keys, in first-seen order.
pub fn discover_columns(submissions: &[Submission]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in submissions {
        for key in row.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}
