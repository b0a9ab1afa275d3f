//! JSON-typed access to a [`Storage`] substrate.
//!
//! [`LocalStore`] is what the rest of Ticketdesk talks to. It adds three
//! things on top of the raw substrate:
//! - JSON encoding on write and decoding on read (`serde_json`)
//! - "absent" instead of errors for unreadable or malformed entries
//! - an availability check
//!
//! There is no cache: every call goes to the substrate, so changes made
//! through another clone of the substrate are visible immediately.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::broadcast;

use crate::{Storage, StorageError, StorageEvent};

/// Key written and removed by [`LocalStore::is_available`].
pub const TEST_KEY: &str = "__storage_test__";

/// Default namespace prefix for every Ticketdesk key.
pub const DEFAULT_PREFIX: &str = "ticketapp_";

// ---------------------------------------------------------------------------
// StorageKeys
// ---------------------------------------------------------------------------

/// The three logical keys Ticketdesk persists, under one namespace prefix.
///
/// ```text
/// ticketapp_session  → session token (JSON string)
/// ticketapp_user     → signed-in user record (JSON object)
/// ticketapp_tickets  → ticket collection (JSON array)
/// ```
///
/// There is no schema version; changing a record's shape means clearing
/// the namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub session: String,
    pub user: String,
    pub tickets: String,
}

impl StorageKeys {
    /// Builds the key set under a custom prefix.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            session: format!("{prefix}session"),
            user: format!("{prefix}user"),
            tickets: format!("{prefix}tickets"),
        }
    }

    /// All keys, for namespace-wide operations.
    pub fn all(&self) -> [&str; 3] {
        [&self.session, &self.user, &self.tickets]
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }
}

// ---------------------------------------------------------------------------
// LocalStore
// ---------------------------------------------------------------------------

/// JSON key-value store over a shared substrate.
///
/// Cheap to clone: clones share the same `Arc<dyn Storage>`.
#[derive(Clone)]
pub struct LocalStore {
    storage: Arc<dyn Storage>,
}

impl LocalStore {
    /// Wraps a substrate.
    pub fn new(storage: impl Storage) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    /// Wraps an already shared substrate.
    pub fn from_arc(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Reads and decodes the value under `key`.
    ///
    /// Returns `None` if the key is missing, the substrate fails, or the
    /// stored text isn't valid JSON for `T`. Never errors.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.storage.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!(key, error = %e, "storage read failed, treating as absent");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(key, error = %e, "malformed JSON in storage, treating as absent");
                None
            }
        }
    }

    /// Encodes `value` as JSON and stores it under `key`.
    ///
    /// # Errors
    /// - [`StorageError::Encode`] if `value` can't be serialized
    /// - whatever the substrate reports (quota, unavailable)
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value).map_err(StorageError::Encode)?;
        self.storage.set_item(key, &json)
    }

    /// Removes `key`.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.storage.remove_item(key)
    }

    /// Removes every key in `keys`, stopping at the first failure.
    pub fn clear_namespace(&self, keys: &StorageKeys) -> Result<(), StorageError> {
        for key in keys.all() {
            self.remove(key)?;
        }
        Ok(())
    }

    /// Checks the substrate by writing and removing [`TEST_KEY`].
    ///
    /// Returns `false` on any failure, including quota exhaustion.
    pub fn is_available(&self) -> bool {
        let attempt = self
            .storage
            .set_item(TEST_KEY, TEST_KEY)
            .and_then(|()| self.storage.remove_item(TEST_KEY));

        if let Err(e) = attempt {
            tracing::warn!(error = %e, "local storage is not available");
            return false;
        }
        true
    }

    /// Subscribes to the substrate's change notifications, if it has any.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<StorageEvent>> {
        self.storage.subscribe()
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").finish_non_exhaustive()
    }
}
