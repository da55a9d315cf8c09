use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Key written by older clients. Never written, removed on open.
pub const LEGACY_TOKEN_KEY: &str = "authToken";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Token file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Access and refresh token as issued by `/api/token/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Process-wide credential storage shared by login, renewal and logout.
///
/// Each call is synchronized on its own. `clear` must remove both tokens
/// in one step so that no reader sees an access token whose refresh token
/// is already gone.
pub trait TokenStore: Send + Sync {
    fn access_token(&self) -> Option<String>;

    fn refresh_token(&self) -> Option<String>;

    /// Store both tokens (login).
    fn set_tokens(&self, tokens: &TokenPair) -> Result<(), StoreError>;

    /// Overwrite the access token only (renewal).
    fn set_access_token(&self, access: &str) -> Result<(), StoreError>;

    /// Remove both tokens (logout, renewal failure).
    fn clear(&self) -> Result<(), StoreError>;

    fn has_access_token(&self) -> bool {
        self.access_token().is_some()
    }
}

/// Snapshot of the two stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    #[serde(rename = "accessToken", default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(rename = "refreshToken", default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

impl From<&TokenPair> for StoredTokens {
    fn from(pair: &TokenPair) -> Self {
        Self {
            access: Some(pair.access.clone()),
            refresh: Some(pair.refresh.clone()),
        }
    }
}

/// In-memory token store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<StoredTokens>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given values.
    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        Self {
            tokens: RwLock::new(StoredTokens {
                access: access.map(str::to_string),
                refresh: refresh.map(str::to_string),
            }),
        }
    }

    pub fn snapshot(&self) -> StoredTokens {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<String> {
        self.snapshot().access
    }

    fn refresh_token(&self) -> Option<String> {
        self.snapshot().refresh
    }

    fn set_tokens(&self, tokens: &TokenPair) -> Result<(), StoreError> {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = tokens.into();
        Ok(())
    }

    fn set_access_token(&self, access: &str) -> Result<(), StoreError> {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .access = Some(access.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = StoredTokens::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> TokenPair {
        TokenPair {
            access: "access-1".to_string(),
            refresh: "refresh-1".to_string(),
        }
    }

    #[test]
    fn test_memory_store_starts_empty() {
        let store = MemoryTokenStore::new();
        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
        assert!(!store.has_access_token());
    }

    #[test]
    fn test_memory_store_set_tokens() {
        let store = MemoryTokenStore::new();
        store.set_tokens(&pair()).unwrap();
        assert_eq!(store.access_token().as_deref(), Some("access-1"));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-1"));
    }

    #[test]
    fn test_memory_store_set_access_keeps_refresh() {
        let store = MemoryTokenStore::new();
        store.set_tokens(&pair()).unwrap();
        store.set_access_token("access-2").unwrap();
        assert_eq!(store.access_token().as_deref(), Some("access-2"));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-1"));
    }

    #[test]
    fn test_memory_store_clear_removes_both() {
        let store = MemoryTokenStore::with_tokens(Some("a"), Some("r"));
        store.clear().unwrap();
        assert_eq!(store.snapshot(), StoredTokens::default());
    }

    #[test]
    fn test_stored_tokens_json_keys() {
        let tokens: StoredTokens = (&pair()).into();
        let json = serde_json::to_value(&tokens).unwrap();
        assert_eq!(json["accessToken"], "access-1");
        assert_eq!(json["refreshToken"], "refresh-1");

        let empty = serde_json::to_string(&StoredTokens::default()).unwrap();
        assert_eq!(empty, "{}");
    }

    #[test]
    fn test_token_pair_parses_login_response() {
        let pair: TokenPair =
            serde_json::from_str(r#"{"access": "a", "refresh": "r", "user_id": 3}"#).unwrap();
        assert_eq!(pair.access, "a");
        assert_eq!(pair.refresh, "r");
    }
}
