#![allow(dead_code)]

use std::sync::Arc;

use academy_core::auth::{MemoryTokenStore, TokenStore};
use academy_core::ApiClient;
use wiremock::MockServer;

/// Client against a mock server with the given tokens in memory
pub fn client_with_tokens(
    server: &MockServer,
    access: Option<&str>,
    refresh: Option<&str>,
) -> (ApiClient, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::with_tokens(access, refresh));
    let tokens: Arc<dyn TokenStore> = store.clone();
    let client = ApiClient::new(&server.uri(), tokens).unwrap();
    (client, store)
}

pub fn course_json(id: i64, title: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "description": "",
        "materials_count": 3,
        "tests_count": 1
    })
}
