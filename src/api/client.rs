//! Portal backend client — JSON over HTTP.
//!
//! Every remote call goes through [`ApiClient::request`], which builds
//! the URL, attaches JSON and auth headers and unwraps the
//! `{ success, ... }` envelope. Failures come back as:
//! - `Network` when the transport fails,
//! - `Protocol` when the response is not JSON,
//! - `Api` when the JSON says `success: false` (or the status is not 2xx).
//!
//! Nothing is retried; the caller decides whether to try again.

use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::image::image_proxy_url;
use super::types::*;
use crate::config::Config;
use crate::errors::{ClientError, Result};
use crate::models::{NewToken, Project, SyncInterval, Token};
use crate::session::SessionContext;

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
    session: SessionContext,
}

impl ApiClient {
    pub fn new(config: &Config, session: SessionContext) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(concat!("kobosync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            http,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Send one request and return the unwrapped JSON body.
    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header(ACCEPT, "application/json");

        if let Some(key) = self.session.api_key() {
            req = req.bearer_auth(key);
        }
        if let Some(b) = body {
            req = req.json(&b);
        }

        let resp = req.send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "request failed");
            ClientError::Network(e.to_string())
        })?;

        let status = resp.status();
        tracing::debug!(%method, path, status = %status, "backend responded");

        if status == StatusCode::NO_CONTENT {
            return Ok(serde_json::json!({ "success": true }));
        }

        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v: &HeaderValue| v.to_str().ok())
            .map(|ct| ct.contains("json"))
            .unwrap_or(false);

        let text = resp
            .text()
            .await
            .map_err(|e| ClientError::Network(format!("failed to read response: {}", e)))?;

        if !is_json {
            tracing::warn!(%method, path, status = %status, "non-JSON response from backend");
            return Err(ClientError::Protocol(format!(
                "expected JSON from {} {}, got status {} (body: {})",
                method,
                path,
                status,
                &text[..floor_char_boundary(&text, 200)]
            )));
        }

        let json: Value = serde_json::from_str(&text)
            .map_err(|e| ClientError::Protocol(format!("invalid JSON from {}: {}", path, e)))?;

        let flagged_failure = json.get("success").and_then(Value::as_bool) == Some(false);
        if flagged_failure || !status.is_success() {
            let message = failure_message(&json, status);
            tracing::warn!(%method, path, status = %status, message = %message, "backend rejected request");
            return Err(ClientError::Api { message });
        }

        Ok(json)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let json = self.request(method, path, body).await?;
        serde_json::from_value(json)
            .map_err(|e| ClientError::Protocol(format!("unexpected response shape from {}: {}", path, e)))
    }

    // ── Tokens ────────────────────────────────────────────────

    pub async fn list_tokens(&self) -> Result<Vec<Token>> {
        let list: TokenList = self.call(Method::GET, "/tokens", None).await?;
        Ok(list.tokens)
    }

    /// Register a Kobo API token. The raw secret lives only inside
    /// `token` and is wiped when it drops.
    pub async fn add_token(&self, token: &NewToken) -> Result<TokenImport> {
        let body = to_body(&AddTokenBody {
            token: token.secret.as_str(),
            token_name: &token.display_name,
        })?;
        let import: TokenImport = self.call(Method::POST, "/tokens", Some(body)).await?;
        tracing::info!(
            token_id = %import.token_id,
            projects = import.total_projects,
            submissions = import.total_submissions,
            "token registered"
        );
        Ok(import)
    }

    pub async fn delete_token(&self, id: &str) -> Result<()> {
        self.request(Method::DELETE, &format!("/tokens/{}", seg(id)), None)
            .await
            .map(|_| ())
    }

    // ── Projects ──────────────────────────────────────────────

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let list: ProjectList = self.call(Method::GET, "/projects/user", None).await?;
        Ok(list.projects)
    }

    pub async fn get_project(&self, uid: &str) -> Result<Project> {
        let env: ProjectEnvelope = self
            .call(Method::GET, &format!("/projects/{}", seg(uid)), None)
            .await?;
        Ok(env.project)
    }

    pub async fn save_project(&self, project: &Project) -> Result<()> {
        let body = to_body(project)?;
        self.request(Method::POST, "/projects/save", Some(body))
            .await
            .map(|_| ())
    }

    pub async fn update_columns(&self, uid: &str, selected: &[String]) -> Result<()> {
        let body = to_body(&UpdateColumnsBody {
            selected_columns: selected,
        })?;
        self.request(
            Method::PUT,
            &format!("/projects/{}/columns", seg(uid)),
            Some(body),
        )
        .await
        .map(|_| ())
    }

    pub async fn sync_project(&self, uid: &str) -> Result<SyncResult> {
        self.call(Method::POST, &format!("/projects/{}/sync", seg(uid)), None)
            .await
    }

    /// `interval` is ignored by the backend when `enabled` is false but
    /// still has to be sent in `HH:MM:SS` form.
    pub async fn configure_auto_sync(
        &self,
        uid: &str,
        enabled: bool,
        interval_seconds: u64,
    ) -> Result<Ack> {
        let interval = match SyncInterval::from_secs(interval_seconds) {
            Ok(i) => i.wire_format(),
            Err(e) if enabled => return Err(e),
            Err(_) => crate::models::interval::hms(interval_seconds),
        };
        let body = to_body(&AutoSyncBody { enabled, interval })?;
        self.call(
            Method::PUT,
            &format!("/projects/{}/auto-sync", seg(uid)),
            Some(body),
        )
        .await
    }

    pub async fn delete_project(&self, id: &str) -> Result<()> {
        self.request(Method::DELETE, &format!("/projects/{}", seg(id)), None)
            .await
            .map(|_| ())
    }

    // ── Images ────────────────────────────────────────────────

    pub fn image_url(&self, project_uid: &str, submission_id: &str, filename: &str) -> String {
        image_proxy_url(
            &self.base_url,
            project_uid,
            submission_id,
            filename,
            self.session.api_key().as_deref(),
        )
    }

    /// Download an attachment through the image proxy. A JSON body here
    /// is the proxy reporting an error.
    pub async fn fetch_image(
        &self,
        project_uid: &str,
        submission_id: &str,
        filename: &str,
    ) -> Result<Vec<u8>> {
        let url = self.image_url(project_uid, submission_id, filename);
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();

        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("json"))
            .unwrap_or(false);

        if is_json || !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let json: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
            return Err(ClientError::Api {
                message: failure_message(&json, status),
            });
        }

        Ok(resp.bytes().await?.to_vec())
    }
}

fn seg(s: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(s)
}

fn to_body<T: serde::Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| ClientError::Protocol(format!("cannot encode request: {}", e)))
}

/// Human-readable message out of an error envelope.
fn failure_message(json: &Value, status: StatusCode) -> String {
    let from_field = |v: &Value| -> Option<String> {
        match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(o) => o.get("message").and_then(Value::as_str).map(String::from),
            _ => None,
        }
    };

    json.get("message")
        .and_then(from_field)
        .or_else(|| json.get("error").and_then(from_field))
        .unwrap_or_else(|| format!("request failed with status {}", status))
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_trims_base_url() {
        let cfg = Config::with_api_url("http://localhost:5000/api/");
        let client = ApiClient::new(&cfg, SessionContext::ephemeral(None)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000/api");
    }

    #[test]
    fn test_failure_message_prefers_message_field() {
        let v = json!({ "success": false, "message": "Invalid token", "error": "x" });
        assert_eq!(failure_message(&v, StatusCode::OK), "Invalid token");
    }

    #[test]
    fn test_failure_message_reads_error_field() {
        let v = json!({ "success": false, "error": "Project not found" });
        assert_eq!(failure_message(&v, StatusCode::NOT_FOUND), "Project not found");
        let nested = json!({ "error": { "message": "quota" } });
        assert_eq!(failure_message(&nested, StatusCode::BAD_REQUEST), "quota");
    }

    #[test]
    fn test_failure_message_falls_back_to_status() {
        let v = json!({ "success": false });
        assert_eq!(
            failure_message(&v, StatusCode::INTERNAL_SERVER_ERROR),
            "request failed with status 500 Internal Server Error"
        );
    }

    #[test]
    fn test_floor_char_boundary() {
        assert_eq!(floor_char_boundary("abc", 200), 3);
        let s = "é".repeat(150);
        let idx = floor_char_boundary(&s, 201);
        assert!(s.is_char_boundary(idx));
        assert!(idx <= 201);
    }

    #[test]
    fn test_image_url_uses_session_key() {
        let cfg = Config::with_api_url("http://h/api");
        let client = ApiClient::new(&cfg, SessionContext::ephemeral(Some("k1".into()))).unwrap();
        assert_eq!(
            client.image_url("p", "9", "a.jpg"),
            "http://h/api/kobo/image/p/9/a.jpg?token=k1"
        );
    }
}
