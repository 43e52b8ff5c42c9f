//! The single credential cell shared by every component
//!
//! Reads are synchronous and never suspend. `set` and `clear` publish to the
//! in-memory cell before touching storage, so the next outbound call always
//! sees the latest pair even if persisting it fails.

use super::storage::{MemorySessionStorage, SessionStorage};
use super::types::{CredentialPair, Identity, StorageError};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage key of the access token
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Storage key of the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Storage key of the serialized identity
pub const USER_KEY: &str = "user";

const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

/// Holds the active credential pair and mirrors it to durable storage
pub struct TokenStore {
    storage: Arc<dyn SessionStorage>,
    current: RwLock<Option<CredentialPair>>,
    // Serializes storage writes so persisted state follows publish order
    persist_lock: tokio::sync::Mutex<()>,
}

impl TokenStore {
    /// Rehydrate from storage
    ///
    /// A missing access token means no session. An unreadable identity entry
    /// is dropped rather than failing the whole session, and file storage
    /// discards a session document it cannot parse.
    pub async fn load(storage: Arc<dyn SessionStorage>) -> Result<Self, StorageError> {
        let access_token = storage
            .get_item(ACCESS_TOKEN_KEY)
            .await?
            .filter(|t| !t.is_empty());

        let current = match access_token {
            Some(access_token) => {
                let refresh_token = storage
                    .get_item(REFRESH_TOKEN_KEY)
                    .await?
                    .filter(|t| !t.is_empty());
                let identity = match storage.get_item(USER_KEY).await? {
                    Some(raw) => match serde_json::from_str::<Identity>(&raw) {
                        Ok(identity) => Some(identity),
                        Err(e) => {
                            warn!("Ignoring malformed stored identity: {}", e);
                            None
                        }
                    },
                    None => None,
                };
                debug!(has_refresh = refresh_token.is_some(), "Rehydrated session");
                Some(CredentialPair {
                    access_token,
                    refresh_token,
                    identity,
                })
            }
            None => None,
        };

        Ok(Self::with_state(storage, current))
    }

    /// Store that lives only as long as the process
    pub fn ephemeral() -> Self {
        Self::with_state(Arc::new(MemorySessionStorage::new()), None)
    }

    fn with_state(storage: Arc<dyn SessionStorage>, current: Option<CredentialPair>) -> Self {
        Self {
            storage,
            current: RwLock::new(current),
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn get(&self) -> Option<CredentialPair> {
        self.current.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current.read().as_ref().map(|p| p.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.current
            .read()
            .as_ref()
            .and_then(|p| p.refresh_token.clone())
            .filter(|t| !t.is_empty())
    }

    pub fn identity(&self) -> Option<Identity> {
        self.current.read().as_ref().and_then(|p| p.identity.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.identity().is_some_and(|i| i.is_admin())
    }

    /// Initials of the signed-in user, `None` when signed out
    pub fn user_initials(&self) -> Option<String> {
        self.identity().map(|i| i.initials())
    }

    /// Replace the active pair and persist it
    pub async fn set(&self, pair: CredentialPair) -> Result<(), StorageError> {
        let _guard = self.persist_lock.lock().await;
        *self.current.write() = Some(pair.clone());

        let mut items = vec![(ACCESS_TOKEN_KEY, pair.access_token)];
        if let Some(refresh_token) = pair.refresh_token {
            items.push((REFRESH_TOKEN_KEY, refresh_token));
        }
        if let Some(identity) = &pair.identity {
            items.push((USER_KEY, serde_json::to_string(identity)?));
        }

        let stale: Vec<&str> = SESSION_KEYS
            .iter()
            .copied()
            .filter(|key| !items.iter().any(|(k, _)| k == key))
            .collect();
        self.storage.replace_items(&items, &stale).await
    }

    /// Drop the active pair and remove all persisted session state
    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.persist_lock.lock().await;
        *self.current.write() = None;
        self.storage.remove_items(&SESSION_KEYS).await
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("current", &*self.current.read())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::{FileSessionStorage, SESSION_FILE};
    use async_trait::async_trait;

    /// Memory storage whose writes can be made to fail
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemorySessionStorage,
        fail_writes: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl SessionStorage for FlakyStorage {
        async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get_item(key).await
        }

        async fn replace_items(
            &self,
            set: &[(&str, String)],
            remove: &[&str],
        ) -> Result<(), StorageError> {
            if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.inner.replace_items(set, remove).await
        }
    }

    fn pair(access: &str, refresh: Option<&str>) -> CredentialPair {
        CredentialPair::new(access, refresh.map(str::to_string))
            .with_identity(Identity::new("anna", "anna@example.org"))
    }

    #[tokio::test]
    async fn test_set_is_visible_immediately() {
        let store = TokenStore::ephemeral();
        assert!(!store.is_authenticated());

        store.set(pair("a1", Some("r1"))).await.unwrap();
        assert_eq!(store.access_token().as_deref(), Some("a1"));
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));
        assert_eq!(store.user_initials().as_deref(), Some("AN"));
    }

    #[tokio::test]
    async fn test_clear_removes_persisted_state() {
        let storage = Arc::new(MemorySessionStorage::new());
        let store = TokenStore::load(storage.clone()).await.unwrap();
        store.set(pair("a1", Some("r1"))).await.unwrap();
        assert!(storage.get_item(USER_KEY).await.unwrap().is_some());

        store.clear().await.unwrap();
        assert!(store.get().is_none());
        for key in SESSION_KEYS {
            assert_eq!(storage.get_item(key).await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_rehydrates_from_file() {
        let dir = tempfile::tempdir().unwrap();

        {
            let storage = Arc::new(FileSessionStorage::new(dir.path()).unwrap());
            let store = TokenStore::load(storage).await.unwrap();
            store.set(pair("a1", Some("r1"))).await.unwrap();
        }

        let storage = Arc::new(FileSessionStorage::new(dir.path()).unwrap());
        let store = TokenStore::load(storage).await.unwrap();
        let restored = store.get().unwrap();
        assert_eq!(restored.access_token, "a1");
        assert_eq!(restored.refresh_token.as_deref(), Some("r1"));
        assert_eq!(restored.identity.unwrap().username, "anna");
    }

    #[tokio::test]
    async fn test_malformed_identity_keeps_tokens() {
        let storage = Arc::new(MemorySessionStorage::new());
        storage
            .set_items(&[
                (ACCESS_TOKEN_KEY, "a1".to_string()),
                (USER_KEY, "{not json".to_string()),
            ])
            .await
            .unwrap();

        let store = TokenStore::load(storage).await.unwrap();
        assert_eq!(store.access_token().as_deref(), Some("a1"));
        assert!(store.identity().is_none());
        assert!(store.refresh_token().is_none());
    }

    #[tokio::test]
    async fn test_refresh_token_without_access_token_is_no_session() {
        let storage = Arc::new(MemorySessionStorage::new());
        storage
            .set_item(REFRESH_TOKEN_KEY, "r1".to_string())
            .await
            .unwrap();

        let store = TokenStore::load(storage).await.unwrap();
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_set_drops_stale_refresh_token() {
        let storage = Arc::new(MemorySessionStorage::new());
        let store = TokenStore::load(storage.clone()).await.unwrap();

        store.set(pair("a1", Some("r1"))).await.unwrap();
        store.set(CredentialPair::new("a2", None)).await.unwrap();

        assert_eq!(storage.get_item(REFRESH_TOKEN_KEY).await.unwrap(), None);
        assert_eq!(storage.get_item(USER_KEY).await.unwrap(), None);
        assert_eq!(
            storage.get_item(ACCESS_TOKEN_KEY).await.unwrap().as_deref(),
            Some("a2")
        );
    }

    #[tokio::test]
    async fn test_failed_set_leaves_persisted_session_intact() {
        let storage = Arc::new(FlakyStorage::default());
        let store = TokenStore::load(storage.clone()).await.unwrap();
        store.set(pair("old-access", Some("old-refresh"))).await.unwrap();

        storage
            .fail_writes
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let result = store.set(CredentialPair::new("new-access", None)).await;
        assert!(matches!(result, Err(StorageError::Io(_))));

        // Memory already holds the new pair
        assert_eq!(store.access_token().as_deref(), Some("new-access"));

        assert_eq!(
            storage.get_item(ACCESS_TOKEN_KEY).await.unwrap().as_deref(),
            Some("old-access")
        );
        assert_eq!(
            storage.get_item(REFRESH_TOKEN_KEY).await.unwrap().as_deref(),
            Some("old-refresh")
        );
        assert!(storage.get_item(USER_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_corrupt_session_file_loads_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SESSION_FILE);
        std::fs::write(&path, b"{truncated").unwrap();

        let storage = Arc::new(FileSessionStorage::new(dir.path()).unwrap());
        let store = TokenStore::load(storage).await.unwrap();
        assert!(!store.is_authenticated());
        assert!(!path.exists());

        store.set(pair("a1", Some("r1"))).await.unwrap();
        let reloaded = TokenStore::load(Arc::new(FileSessionStorage::new(dir.path()).unwrap()))
            .await
            .unwrap();
        assert_eq!(reloaded.access_token().as_deref(), Some("a1"));
    }
}
