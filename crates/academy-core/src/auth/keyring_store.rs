use keyring::Entry;
use tracing::{debug, warn};

use super::store::{
    StoreError, TokenPair, TokenStore, ACCESS_TOKEN_KEY, LEGACY_TOKEN_KEY, REFRESH_TOKEN_KEY,
};

/// Default keychain service name
pub const SERVICE_NAME: &str = "academy";

/// Token store backed by the OS keychain, one entry per storage key.
pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    /// Open the store for `service`, dropping any legacy entry.
    pub fn open(service: &str) -> Result<Self, StoreError> {
        let store = Self {
            service: service.to_string(),
        };
        match store.entry(LEGACY_TOKEN_KEY)?.delete_credential() {
            Ok(()) => debug!("Dropped legacy authToken keychain entry"),
            Err(keyring::Error::NoEntry) => {}
            Err(e) => warn!(error = %e, "Failed to drop legacy authToken keychain entry"),
        }
        Ok(store)
    }

    fn entry(&self, key: &str) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, key)?)
    }

    fn read(&self, key: &str) -> Option<String> {
        let entry = self.entry(key).ok()?;
        match entry.get_password() {
            Ok(value) => Some(value),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read token from keychain");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl TokenStore for KeyringTokenStore {
    fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
    }

    fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    fn set_tokens(&self, tokens: &TokenPair) -> Result<(), StoreError> {
        write_pair(
            || self.write(REFRESH_TOKEN_KEY, &tokens.refresh),
            || self.write(ACCESS_TOKEN_KEY, &tokens.access),
            || self.clear(),
        )
    }

    fn set_access_token(&self, access: &str) -> Result<(), StoreError> {
        self.write(ACCESS_TOKEN_KEY, access)
    }

    fn clear(&self) -> Result<(), StoreError> {
        // Access first: a reader between the two deletes sees no access token.
        let access = self.delete(ACCESS_TOKEN_KEY);
        let refresh = self.delete(REFRESH_TOKEN_KEY);
        access.and(refresh)
    }
}

/// Write two entries in order. If the second write fails, `rollback` runs
/// so the keychain never holds a refresh token from one login next to an
/// access token from another.
fn write_pair(
    first: impl FnOnce() -> Result<(), StoreError>,
    second: impl FnOnce() -> Result<(), StoreError>,
    rollback: impl FnOnce() -> Result<(), StoreError>,
) -> Result<(), StoreError> {
    first()?;
    if let Err(e) = second() {
        warn!(error = %e, "Second keychain write failed, removing the first");
        if let Err(rollback_err) = rollback() {
            warn!(error = %rollback_err, "Failed to roll back keychain write");
        }
        return Err(e);
    }
    Ok(())
}
