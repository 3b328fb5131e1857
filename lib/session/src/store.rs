//! Namespaced credential store.
//!
//! The store holds the opaque session token and the two status flags
//! (authenticated, onboarded) for one namespace. Reads return the latest
//! written value without touching the backend; writes persist first and
//! then publish the new value to subscribers.
//!
//! Callers must share one store per namespace. `StoreRegistry` enforces
//! this by handing out the same `Arc<CredentialStore>` for a namespace.

use crate::error::StorageError;
use crate::storage::{MemoryStorage, StorageBackend};
use headless_auth_core::Namespace;
use rootcause::prelude::Report;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, instrument};

const SESSION_TOKEN_KEY: &str = "session_token";
const IS_AUTHENTICATED_KEY: &str = "is_authenticated";
const IS_ONBOARDED_KEY: &str = "is_onboarded";

/// Session token and status flags for one namespace.
pub struct CredentialStore {
    namespace: Namespace,
    backend: Arc<dyn StorageBackend>,
    token: watch::Sender<Option<String>>,
    authenticated: watch::Sender<bool>,
    onboarded: watch::Sender<bool>,
    // Serializes persist-then-publish so the published order matches the stored order.
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("namespace", &self.namespace)
            .field("has_token", &self.token.borrow().is_some())
            .field("authenticated", &*self.authenticated.borrow())
            .field("onboarded", &*self.onboarded.borrow())
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Opens the store for `namespace`, loading any persisted state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or holds corrupt flags.
    #[instrument(skip_all, fields(namespace = %namespace))]
    pub(crate) async fn open(
        namespace: Namespace,
        backend: Arc<dyn StorageBackend>,
    ) -> Result<Self, Report<StorageError>> {
        let token = backend.load(&namespace.key(SESSION_TOKEN_KEY)).await?;
        let authenticated = load_flag(backend.as_ref(), &namespace.key(IS_AUTHENTICATED_KEY)).await?;
        let onboarded = load_flag(backend.as_ref(), &namespace.key(IS_ONBOARDED_KEY)).await?;

        debug!(
            has_token = token.is_some(),
            authenticated,
            onboarded,
            persistent = backend.is_persistent(),
            "credential store opened"
        );

        Ok(Self {
            namespace,
            backend,
            token: watch::Sender::new(token),
            authenticated: watch::Sender::new(authenticated),
            onboarded: watch::Sender::new(onboarded),
            write_lock: Mutex::new(()),
        })
    }

    /// Creates an empty store backed by process memory, outside any registry.
    #[cfg(test)]
    pub(crate) fn in_memory(namespace: Namespace) -> Self {
        Self {
            namespace,
            backend: Arc::new(MemoryStorage::new()),
            token: watch::Sender::new(None),
            authenticated: watch::Sender::new(false),
            onboarded: watch::Sender::new(false),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the namespace this store partitions.
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns true if the state survives a process restart.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.backend.is_persistent()
    }

    /// Returns the current session token.
    #[must_use]
    pub fn session_token(&self) -> Option<String> {
        self.token.borrow().clone()
    }

    /// Replaces the session token; `None` clears it.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be persisted. The published
    /// value is left unchanged in that case.
    pub async fn set_session_token(&self, token: Option<String>) -> Result<(), Report<StorageError>> {
        let _guard = self.write_lock.lock().await;
        self.backend
            .save(&self.namespace.key(SESSION_TOKEN_KEY), token.as_deref())
            .await?;
        self.token.send_if_modified(|current| {
            if *current == token {
                false
            } else {
                *current = token;
                true
            }
        });
        Ok(())
    }

    /// Returns the stored authentication flag.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        *self.authenticated.borrow()
    }

    /// Records whether the session is authenticated.
    ///
    /// # Errors
    ///
    /// Returns an error if the flag cannot be persisted.
    pub async fn set_authentication_status(&self, value: bool) -> Result<(), Report<StorageError>> {
        self.write_flag(IS_AUTHENTICATED_KEY, &self.authenticated, value)
            .await
    }

    /// Returns the stored onboarding flag.
    ///
    /// This is the raw stored value; whether onboarding applies at all is
    /// decided by the caller's configuration.
    #[must_use]
    pub fn is_onboarded(&self) -> bool {
        *self.onboarded.borrow()
    }

    /// Records whether the user has completed onboarding.
    ///
    /// # Errors
    ///
    /// Returns an error if the flag cannot be persisted.
    pub async fn set_onboarding_status(&self, value: bool) -> Result<(), Report<StorageError>> {
        self.write_flag(IS_ONBOARDED_KEY, &self.onboarded, value).await
    }

    /// Subscribes to session token changes.
    #[must_use]
    pub fn subscribe_session_token(&self) -> watch::Receiver<Option<String>> {
        self.token.subscribe()
    }

    /// Subscribes to authentication flag changes.
    #[must_use]
    pub fn subscribe_authentication_status(&self) -> watch::Receiver<bool> {
        self.authenticated.subscribe()
    }

    /// Subscribes to onboarding flag changes.
    #[must_use]
    pub fn subscribe_onboarding_status(&self) -> watch::Receiver<bool> {
        self.onboarded.subscribe()
    }

    async fn write_flag(
        &self,
        name: &str,
        sender: &watch::Sender<bool>,
        value: bool,
    ) -> Result<(), Report<StorageError>> {
        let _guard = self.write_lock.lock().await;
        let encoded = if value { "true" } else { "false" };
        self.backend
            .save(&self.namespace.key(name), Some(encoded))
            .await?;
        sender.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
        Ok(())
    }
}

async fn load_flag(backend: &dyn StorageBackend, key: &str) -> Result<bool, Report<StorageError>> {
    match backend.load(key).await?.as_deref() {
        None | Some("false") => Ok(false),
        Some("true") => Ok(true),
        Some(other) => Err(StorageError::Corrupt {
            key: key.to_string(),
            reason: format!("expected 'true' or 'false', found '{other}'"),
        }
        .into()),
    }
}

/// Hands out one shared `CredentialStore` per namespace.
pub struct StoreRegistry {
    backend: Arc<dyn StorageBackend>,
    stores: Mutex<HashMap<Namespace, Arc<CredentialStore>>>,
}

impl StoreRegistry {
    /// Creates a registry whose stores share `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a registry backed by process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Returns the store for `namespace`, opening it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the store has to be opened and loading fails.
    pub async fn store(
        &self,
        namespace: &Namespace,
    ) -> Result<Arc<CredentialStore>, Report<StorageError>> {
        let mut stores = self.stores.lock().await;
        if let Some(store) = stores.get(namespace) {
            return Ok(Arc::clone(store));
        }
        let store = Arc::new(CredentialStore::open(namespace.clone(), Arc::clone(&self.backend)).await?);
        stores.insert(namespace.clone(), Arc::clone(&store));
        Ok(store)
    }
}
