//! Authenticated request flow against a mock backend: header attachment,
//! the single renew-and-retry on 401, and token clearing when renewal fails.

mod common;

use std::sync::Arc;
use std::time::Duration;

use academy_core::api::{ApiError, RequestOptions};
use academy_core::auth::{FileTokenStore, MemoryTokenStore, TokenPair, TokenStore};
use academy_core::models::NewComment;
use academy_core::{ApiClient, AuthState};
use common::{client_with_tokens, course_json};
use reqwest::header::{HeaderName, HeaderValue};
use tempfile::TempDir;
use wiremock::matchers::{
    body_json, body_string_contains, header, header_regex, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_no_access_token_sends_no_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/courses/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with_tokens(&server, None, Some("refresh-1"));
    let courses = client.fetch_courses().await.unwrap();
    assert!(courses.is_empty());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(
        requests[0].headers.get("content-type").unwrap(),
        "application/json"
    );
}

#[tokio::test]
async fn test_bearer_and_csrf_headers_attached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/certificates/"))
        .and(header("authorization", "Bearer access-1"))
        .and(header("x-csrftoken", "csrf-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with_tokens(&server, Some("access-1"), Some("refresh-1"));
    client.set_csrf_token("csrf-abc");
    assert_eq!(client.csrf_token().as_deref(), Some("csrf-abc"));
    client.fetch_certificates().await.unwrap();
}

#[tokio::test]
async fn test_caller_headers_override_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/courses/"))
        .and(header("authorization", "Token custom"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with_tokens(&server, Some("access-1"), Some("refresh-1"));
    let options = RequestOptions::get().header(
        HeaderName::from_static("authorization"),
        HeaderValue::from_static("Token custom"),
    );
    let _: serde_json::Value = client.request("/api/courses/", options).await.unwrap();
}

#[tokio::test]
async fn test_caller_header_with_several_values_is_sent_whole() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/courses/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with_tokens(&server, Some("access-1"), Some("refresh-1"));
    let mut options = RequestOptions::get();
    options
        .headers
        .append("accept-language", HeaderValue::from_static("ru"));
    options
        .headers
        .append("accept-language", HeaderValue::from_static("en"));
    let _: serde_json::Value = client.request("/api/courses/", options).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let languages: Vec<&str> = requests[0]
        .headers
        .get_all("accept-language")
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(languages, vec!["ru", "en"]);
}

#[tokio::test]
async fn test_unauthorized_renews_once_and_retries_with_new_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/courses/"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/courses/"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([course_json(1, "Cardiology")])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .and(body_json(serde_json::json!({"refresh": "refresh-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"access": "fresh"})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_with_tokens(&server, Some("stale"), Some("refresh-1"));
    let courses = client.fetch_courses().await.unwrap();

    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].title, "Cardiology");
    assert_eq!(store.access_token().as_deref(), Some("fresh"));
    assert_eq!(store.refresh_token().as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_second_unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/courses/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"access": "fresh"})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with_tokens(&server, Some("stale"), Some("refresh-1"));
    let err = client.fetch_courses().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_renewal_failure_clears_tokens_and_requires_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/courses/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token_not_valid"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_with_tokens(&server, Some("stale"), Some("expired-refresh"));
    let mut auth = client.subscribe();

    let err = client.fetch_courses().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::RenewalFailed(status)) if status.as_u16() == 401
    ));
    assert!(academy_core::api::requires_login(&err));
    assert_eq!(store.access_token(), None);
    assert_eq!(store.refresh_token(), None);
    assert!(auth.has_changed().unwrap());
    assert_eq!(*auth.borrow_and_update(), AuthState::LoginRequired);
}

#[tokio::test]
async fn test_undecodable_renewal_response_clears_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/courses/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_with_tokens(&server, Some("stale"), Some("refresh-1"));
    let err = client.fetch_courses().await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::InvalidResponse(_))
    ));
    assert_eq!(store.access_token(), None);
    assert_eq!(store.refresh_token(), None);
    assert_eq!(client.auth_state(), AuthState::LoginRequired);
}

#[tokio::test]
async fn test_renewal_transport_failure_clears_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/courses/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    // Answers long after the client has given up
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"access": "fresh"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_tokens(Some("stale"), Some("refresh-1")));
    let tokens: Arc<dyn TokenStore> = store.clone();
    let client =
        ApiClient::with_timeout(&server.uri(), tokens, Duration::from_millis(300)).unwrap();

    let err = client.fetch_courses().await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::Network(_))
    ));
    assert_eq!(store.access_token(), None);
    assert_eq!(store.refresh_token(), None);
    assert_eq!(client.auth_state(), AuthState::LoginRequired);
}

#[tokio::test]
async fn test_multipart_request_is_rebuilt_for_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/comments/"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/comments/"))
        .and(header("authorization", "Bearer fresh"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("Very clear explanation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": 41,
            "content": "Very clear explanation",
            "material": 3,
            "parent": 40,
            "replies": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"access": "fresh"})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_with_tokens(&server, Some("stale"), Some("refresh-1"));
    let comment = client
        .post_comment(&NewComment {
            material: 3,
            content: "Very clear explanation".to_string(),
            parent: Some(40),
        })
        .await
        .unwrap();

    assert_eq!(comment.id, 41);
    assert_eq!(store.access_token().as_deref(), Some("fresh"));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_missing_refresh_token_fails_without_renewal_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/courses/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"access": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let (client, store) = client_with_tokens(&server, Some("stale"), None);
    let err = client.fetch_courses().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::MissingRefreshToken)
    ));
    assert_eq!(store.access_token(), None);
    assert_eq!(client.auth_state(), AuthState::LoginRequired);
}

#[tokio::test]
async fn test_renewal_failure_clears_file_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/courses/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = FileTokenStore::open(dir.path()).unwrap();
    store
        .set_tokens(&TokenPair {
            access: "stale".to_string(),
            refresh: "refresh-1".to_string(),
        })
        .unwrap();
    let store: Arc<dyn TokenStore> = Arc::new(store);
    let client = ApiClient::new(&server.uri(), store).unwrap();

    assert!(client.fetch_courses().await.is_err());

    let reopened = FileTokenStore::open(dir.path()).unwrap();
    assert_eq!(reopened.access_token(), None);
    assert_eq!(reopened.refresh_token(), None);
}

#[tokio::test]
async fn test_non_success_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/materials/"))
        .and(query_param("course", "4"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let (client, store) = client_with_tokens(&server, Some("access-1"), Some("refresh-1"));
    let err = client.fetch_materials(4).await.unwrap_err();
    let api_err = err.downcast_ref::<ApiError>().unwrap();
    assert_eq!(api_err.status().map(|s| s.as_u16()), Some(503));
    assert!(!api_err.requires_login());
    assert_eq!(store.access_token().as_deref(), Some("access-1"));
}

#[tokio::test]
async fn test_empty_body_parses_as_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/courses/2/enroll/"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let (client, _) = client_with_tokens(&server, Some("access-1"), Some("refresh-1"));
    let value: serde_json::Value = client
        .request(
            "/api/courses/2/enroll/",
            RequestOptions::post_json(serde_json::json!({})),
        )
        .await
        .unwrap();
    assert!(value.is_null());
}

#[tokio::test]
async fn test_paginated_listing_is_unwrapped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/courses/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 2,
            "next": null,
            "previous": null,
            "results": [course_json(1, "A"), course_json(2, "B")]
        })))
        .mount(&server)
        .await;

    let (client, _) = client_with_tokens(&server, Some("access-1"), Some("refresh-1"));
    let courses = client.fetch_courses().await.unwrap();
    assert_eq!(courses.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 2]);
}
