//! Access/refresh token storage.
//!
//! The gateway never touches storage directly; it is handed an
//! `Arc<dyn TokenStore>`. Three backends are provided:
//! - `FileTokenStore`: JSON file in the cache directory
//! - `KeyringTokenStore`: OS keychain via keyring
//! - `MemoryTokenStore`: in-process, used by tests and the `memory` backend
//!
//! All backends drop the legacy `authToken` key when opened.

pub mod file_store;
pub mod keyring_store;
pub mod store;

pub use file_store::FileTokenStore;
pub use keyring_store::KeyringTokenStore;
pub use store::{
    MemoryTokenStore, StoreError, StoredTokens, TokenPair, TokenStore, ACCESS_TOKEN_KEY, LEGACY_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
};

use std::path::Path;
use std::sync::Arc;

use crate::config::TokenBackend;

/// Open the token store selected in the config.
pub fn open_store(backend: TokenBackend, cache_dir: &Path) -> Result<Arc<dyn TokenStore>, StoreError> {
    Ok(match backend {
        TokenBackend::File => Arc::new(FileTokenStore::open(cache_dir)?),
        TokenBackend::Keyring => Arc::new(KeyringTokenStore::open(keyring_store::SERVICE_NAME)?),
        TokenBackend::Memory => Arc::new(MemoryTokenStore::new()),
    })
}
