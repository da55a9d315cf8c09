use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use super::store::{StoreError, StoredTokens, TokenPair, TokenStore, LEGACY_TOKEN_KEY};

/// Token file name in the cache directory
const TOKEN_FILE: &str = "tokens.json";

/// Token store backed by a JSON file.
///
/// The file holds `{"accessToken": ..., "refreshToken": ...}`. An in-memory
/// copy serves reads; every mutation rewrites the file while holding the lock,
/// so readers never observe a half-applied update.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    tokens: Mutex<StoredTokens>,
}

impl FileTokenStore {
    /// Open (or lazily create) the token file in `dir`.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        let path = dir.join(TOKEN_FILE);
        let tokens = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let value: serde_json::Value = serde_json::from_str(&contents)?;
            let had_legacy = value.get(LEGACY_TOKEN_KEY).is_some();
            let tokens: StoredTokens = serde_json::from_value(value)?;
            if had_legacy {
                info!(path = %path.display(), "Dropping legacy authToken entry");
                write_tokens(&path, &tokens)?;
            }
            tokens
        } else {
            StoredTokens::default()
        };

        debug!(
            path = %path.display(),
            has_access = tokens.access.is_some(),
            has_refresh = tokens.refresh.is_some(),
            "Token file opened"
        );

        Ok(Self {
            path,
            tokens: Mutex::new(tokens),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update(&self, apply: impl FnOnce(&mut StoredTokens)) -> Result<(), StoreError> {
        let mut guard = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        apply(&mut next);
        write_tokens(&self.path, &next)?;
        *guard = next;
        Ok(())
    }
}

fn write_tokens(path: &Path, tokens: &StoredTokens) -> Result<(), StoreError> {
    if tokens.access.is_none() && tokens.refresh.is_none() {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(tokens)?;
    std::fs::write(path, contents)?;
    Ok(())
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Option<String> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .access
            .clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh
            .clone()
    }

    fn set_tokens(&self, tokens: &TokenPair) -> Result<(), StoreError> {
        self.update(|stored| *stored = tokens.into())
    }

    fn set_access_token(&self, access: &str) -> Result<(), StoreError> {
        self.update(|stored| stored.access = Some(access.to_string()))
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut guard = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        // Drop the in-memory copy first: even if the file removal fails,
        // this process must not hand out the old access token again.
        *guard = StoredTokens::default();
        write_tokens(&self.path, &guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pair() -> TokenPair {
        TokenPair {
            access: "access-1".to_string(),
            refresh: "refresh-1".to_string(),
        }
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::open(dir.path()).unwrap();
        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_tokens_persist_across_open() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileTokenStore::open(dir.path()).unwrap();
            store.set_tokens(&pair()).unwrap();
            store.set_access_token("access-2").unwrap();
        }

        let reopened = FileTokenStore::open(dir.path()).unwrap();
        assert_eq!(reopened.access_token().as_deref(), Some("access-2"));
        assert_eq!(reopened.refresh_token().as_deref(), Some("refresh-1"));
    }

    #[test]
    fn test_file_uses_storage_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::open(dir.path()).unwrap();
        store.set_tokens(&pair()).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["accessToken"], "access-1");
        assert_eq!(value["refreshToken"], "refresh-1");
    }

    #[test]
    fn test_clear_removes_file_and_values() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::open(dir.path()).unwrap();
        store.set_tokens(&pair()).unwrap();
        assert!(store.path().exists());

        store.clear().unwrap();
        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
        assert!(!store.path().exists());

        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_legacy_key_is_dropped_on_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(TOKEN_FILE);
        std::fs::write(
            &path,
            r#"{"authToken": "old", "accessToken": "a", "refreshToken": "r"}"#,
        )
        .unwrap();

        let store = FileTokenStore::open(dir.path()).unwrap();
        assert_eq!(store.access_token().as_deref(), Some("a"));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("authToken"));
        assert!(raw.contains("refreshToken"));
    }

    #[test]
    fn test_legacy_only_file_is_removed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(TOKEN_FILE);
        std::fs::write(&path, r#"{"authToken": "old"}"#).unwrap();

        let store = FileTokenStore::open(dir.path()).unwrap();
        assert!(store.access_token().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(TOKEN_FILE), "not json").unwrap();
        assert!(matches!(
            FileTokenStore::open(dir.path()),
            Err(StoreError::Parse(_))
        ));
    }
}
