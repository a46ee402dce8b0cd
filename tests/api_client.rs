//! HTTP-level tests for the backend client.
//!
//! Each test stands up a wiremock `MockServer` and checks request shape
//! and error mapping (`Network` / `Protocol` / `Api`).

use kobosync::config::Config;
use kobosync::models::NewToken;
use kobosync::{ApiClient, ClientError, SessionContext};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, api_key: Option<&str>) -> ApiClient {
    let cfg = Config::with_api_url(server.uri());
    ApiClient::new(&cfg, SessionContext::ephemeral(api_key.map(String::from))).unwrap()
}

// ── Success paths ─────────────────────────────────────────────

#[tokio::test]
async fn test_list_tokens_sends_bearer_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tokens"))
        .and(header("authorization", "Bearer portal-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "tokens": [
                { "tokenId": "t1", "tokenName": "field", "tokenPreview": "ab…yz", "createdAt": "2026-01-05T10:00:00Z" },
                { "tokenId": "t2", "tokenName": "office", "tokenPreview": "cd…wx" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = client_for(&server, Some("portal-key")).list_tokens().await.unwrap();
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].display_name, "field");
    assert!(tokens[1].created_at.is_none());
}

#[tokio::test]
async fn test_add_token_body_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tokens"))
        .and(body_json(json!({ "token": "raw-secret", "tokenName": "main" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "tokenId": "t9",
            "tokenName": "main",
            "tokenPreview": "ra…et",
            "projects": [{ "uid": "p1", "name": "Cassava" }, { "uid": "p2", "name": "Rice" }],
            "totalProjects": 2,
            "totalSubmissions": 310,
            "timestamp": "2026-06-01T07:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let import = client_for(&server, None)
        .add_token(&NewToken::new("raw-secret", "main"))
        .await
        .unwrap();
    assert_eq!(import.token_id, "t9");
    assert_eq!(import.projects.len(), 2);
    assert_eq!(import.total_submissions, 310);
}

#[tokio::test]
async fn test_get_project_unwraps_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/aXb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "project": {
                "uid": "aXb",
                "name": "Livestock census",
                "availableColumns": ["district", "cattle"],
                "selected_columns": ["cattle"],
                "submissions": [{ "district": "North", "cattle": 12 }]
            }
        })))
        .mount(&server)
        .await;

    let p = client_for(&server, None).get_project("aXb").await.unwrap();
    assert_eq!(p.name, "Livestock census");
    assert_eq!(p.submissions.len(), 1);
}

#[tokio::test]
async fn test_configure_auto_sync_sends_hms_interval() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/projects/p1/auto-sync"))
        .and(body_json(json!({ "enabled": true, "interval": "02:00:00" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Auto-sync enabled"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ack = client_for(&server, None)
        .configure_auto_sync("p1", true, 7_200)
        .await
        .unwrap();
    assert_eq!(ack.message.as_deref(), Some("Auto-sync enabled"));
}

#[tokio::test]
async fn test_invalid_interval_never_reaches_server() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for(&server, None)
        .configure_auto_sync("p1", true, 600)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidInterval(600)));
}

#[tokio::test]
async fn test_delete_accepts_no_content() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/tokens/t1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server, None).delete_token("t1").await.unwrap();
}

#[tokio::test]
async fn test_path_segments_are_encoded() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/projects/a%2Fb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server, None).delete_project("a/b").await.unwrap();
}

// ── Error mapping ─────────────────────────────────────────────

#[tokio::test]
async fn test_success_false_is_api_error_with_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/projects/p1/sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Kobo token expired"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server, None).sync_project("p1").await.unwrap_err();
    match err {
        ClientError::Api { message } => assert_eq!(message, "Kobo token expired"),
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_json_error_status_is_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Unauthorized" })))
        .mount(&server)
        .await;

    let err = client_for(&server, None).list_projects().await.unwrap_err();
    assert!(matches!(err, ClientError::Api { ref message } if message == "Unauthorized"));
}

#[tokio::test]
async fn test_html_response_is_protocol_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/user"))
        .respond_with(
            ResponseTemplate::new(502)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><body>Bad Gateway</body></html>"),
        )
        .mount(&server)
        .await;

    let err = client_for(&server, None).list_projects().await.unwrap_err();
    assert_eq!(err.kind(), "protocol");
    assert!(err.to_string().contains("502"));
}

#[tokio::test]
async fn test_malformed_json_is_protocol_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tokens"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string("{\"success\": tru"),
        )
        .mount(&server)
        .await;

    let err = client_for(&server, None).list_tokens().await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol(_)));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    // port 1 is reserved (tcpmux) and closed on CI machines
    let cfg = Config::with_api_url("http://127.0.0.1:1");
    let client = ApiClient::new(&cfg, SessionContext::ephemeral(None)).unwrap();

    let err = client.list_tokens().await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)), "got {:?}", err);
}

// ── Image proxy ───────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_image_returns_bytes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/kobo/image/p1/77/leaf.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]),
        )
        .expect(1)
        .mount(&server)
        .await;

    let bytes = client_for(&server, Some("tok"))
        .fetch_image("p1", "77", "leaf.jpg")
        .await
        .unwrap();
    assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF, 0xE0]);
}

#[tokio::test]
async fn test_fetch_image_json_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/kobo/image/p1/77/missing.jpg"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "message": "Image not found"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server, None)
        .fetch_image("p1", "77", "missing.jpg")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Image not found");
}
