use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the portal backend. Every request path is joined onto it.
    pub api_url: String,
    /// Total request timeout in seconds.
    /// Set via KOBOSYNC_TIMEOUT_SECS env var. Default: 30.
    pub timeout_secs: u64,
    /// Set via KOBOSYNC_CONNECT_TIMEOUT_SECS env var. Default: 5.
    pub connect_timeout_secs: u64,
    /// Where the session context is persisted between runs.
    pub session_file: PathBuf,
    pub env: Option<String>,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Config pointing at an explicit backend, defaults everywhere else.
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            timeout_secs: 30,
            connect_timeout_secs: 5,
            session_file: PathBuf::from(".kobosync/session.json"),
            env: None,
        }
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let raw = std::env::var("KOBOSYNC_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
    let api_url = validate_api_url(&raw, "KOBOSYNC_API_URL")?;

    let env = std::env::var("KOBOSYNC_ENV").ok();
    if api_url.starts_with("http://") && env.as_deref() == Some("production") {
        tracing::warn!(api_url = %api_url, "backend is reached over plain http in production");
    }

    Ok(Config {
        api_url,
        timeout_secs: std::env::var("KOBOSYNC_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30),
        connect_timeout_secs: std::env::var("KOBOSYNC_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5),
        session_file: std::env::var("KOBOSYNC_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".kobosync/session.json")),
        env,
    })
}

/// Check a backend URL from `source` (env var or flag) and strip any
/// trailing slash.
pub fn validate_api_url(raw: &str, source: &str) -> anyhow::Result<String> {
    let parsed = Url::parse(raw)
        .map_err(|e| anyhow::anyhow!("{} '{}' is not a valid URL: {}", source, raw, e))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("{} '{}' must use http or https", source, raw);
    }
    Ok(raw.trim_end_matches('/').to_string())
}
