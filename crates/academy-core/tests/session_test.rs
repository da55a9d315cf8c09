//! Login, logout and startup session checks against a mock backend.

mod common;

use std::sync::Arc;

use academy_core::api::ApiError;
use academy_core::auth::{MemoryTokenStore, TokenStore};
use academy_core::{ApiClient, AuthState};
use common::client_with_tokens;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_login_stores_server_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .and(body_json(serde_json::json!({"username": "aida", "password": "s3cret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access": "access-from-server",
            "refresh": "refresh-from-server"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_with_tokens(&server, None, None);
    assert_eq!(client.auth_state(), AuthState::SignedOut);

    let pair = client.login("aida", "s3cret").await.unwrap();
    assert_eq!(pair.access, "access-from-server");
    assert_eq!(store.access_token().as_deref(), Some("access-from-server"));
    assert_eq!(store.refresh_token().as_deref(), Some("refresh-from-server"));
    assert_eq!(client.auth_state(), AuthState::Authenticated);
}

#[tokio::test]
async fn test_login_rejected_keeps_store_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "detail": "No active account found with the given credentials"
        })))
        .mount(&server)
        .await;

    let (client, store) = client_with_tokens(&server, None, None);
    let err = client.login("aida", "wrong").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::LoginFailed(status)) if status.as_u16() == 401
    ));
    assert!(!store.has_access_token());
    assert_eq!(client.auth_state(), AuthState::SignedOut);
}

#[tokio::test]
async fn test_logout_posts_refresh_with_bearer_and_clears() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token/logout/"))
        .and(header("authorization", "Bearer access-1"))
        .and(body_json(serde_json::json!({"refresh": "refresh-1"})))
        .respond_with(ResponseTemplate::new(205))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_with_tokens(&server, Some("access-1"), Some("refresh-1"));
    assert!(client.logout().await.unwrap());
    assert_eq!(store.access_token(), None);
    assert_eq!(store.refresh_token(), None);
    assert_eq!(client.auth_state(), AuthState::SignedOut);
}

#[tokio::test]
async fn test_logout_clears_tokens_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token/logout/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (client, store) = client_with_tokens(&server, Some("access-1"), Some("refresh-1"));
    assert!(!client.logout().await.unwrap());
    assert_eq!(store.access_token(), None);
    assert_eq!(store.refresh_token(), None);
}

#[tokio::test]
async fn test_logout_clears_tokens_when_server_unreachable() {
    let store = Arc::new(MemoryTokenStore::with_tokens(Some("access-1"), Some("refresh-1")));
    let tokens: Arc<dyn TokenStore> = store.clone();
    // Nothing listens on port 1
    let client = ApiClient::new("http://127.0.0.1:1/", tokens).unwrap();

    assert!(!client.logout().await.unwrap());
    assert_eq!(store.access_token(), None);
    assert_eq!(store.refresh_token(), None);
}

#[tokio::test]
async fn test_ensure_session_without_token_requires_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token/verify/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, _) = client_with_tokens(&server, None, Some("refresh-1"));
    assert!(!client.ensure_session().await.unwrap());
    assert_eq!(client.auth_state(), AuthState::LoginRequired);
}

#[tokio::test]
async fn test_ensure_session_with_valid_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token/verify/"))
        .and(body_json(serde_json::json!({"token": "access-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with_tokens(&server, Some("access-1"), Some("refresh-1"));
    assert!(client.ensure_session().await.unwrap());
    assert_eq!(client.auth_state(), AuthState::Authenticated);
}

#[tokio::test]
async fn test_ensure_session_renews_rejected_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token/verify/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"access": "fresh"})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_with_tokens(&server, Some("stale"), Some("refresh-1"));
    assert!(client.ensure_session().await.unwrap());
    assert_eq!(store.access_token().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_ensure_session_renewal_failure_clears_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token/verify/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let (client, store) = client_with_tokens(&server, Some("stale"), Some("refresh-1"));
    assert!(!client.ensure_session().await.unwrap());
    assert!(!store.has_access_token());
    assert_eq!(store.refresh_token(), None);
    assert_eq!(client.auth_state(), AuthState::LoginRequired);
}
