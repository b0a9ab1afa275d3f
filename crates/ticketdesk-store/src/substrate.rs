//! The raw string key-value substrate underneath [`LocalStore`](crate::LocalStore).
//!
//! [`Storage`] is the seam: the store doesn't care whether strings live in
//! a browser's local storage, a file, or a `HashMap`. [`MemoryStorage`] is
//! the in-process implementation used by the application and the tests.
//!
//! # Change notifications
//!
//! A substrate may publish a [`StorageEvent`] for every mutation. Clones of
//! a [`MemoryStorage`] share one map and one notification bus, so two
//! clones behave like two tabs of the same origin: a removal through one
//! is observed by subscribers of the other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

use crate::StorageError;

/// Capacity of the notification bus. Slow subscribers see `Lagged` and
/// skip ahead rather than blocking writers.
const EVENT_CAPACITY: usize = 64;

/// A mutation observed on the substrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// The key that changed. `None` means the whole substrate was cleared.
    pub key: Option<String>,
    /// Raw value before the change.
    pub old_value: Option<String>,
    /// Raw value after the change. `None` means removed.
    pub new_value: Option<String>,
}

impl StorageEvent {
    /// Returns `true` if this event removed `key` (directly or by clearing
    /// everything).
    pub fn removes(&self, key: &str) -> bool {
        match &self.key {
            None => true,
            Some(k) => k == key && self.new_value.is_none(),
        }
    }
}

/// A string-to-string key-value substrate.
///
/// Every method may fail: real substrates throw on quota exhaustion or
/// when storage is disabled entirely.
pub trait Storage: Send + Sync + 'static {
    /// Reads the raw value stored under `key`.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Removes every key.
    fn clear(&self) -> Result<(), StorageError>;

    /// Subscribes to mutation notifications.
    ///
    /// Defaults to `None` for substrates that can't observe changes.
    fn subscribe(&self) -> Option<broadcast::Receiver<StorageEvent>> {
        None
    }
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

struct Inner {
    items: Mutex<HashMap<String, String>>,
    /// Maximum total bytes of keys plus values. `None` = unlimited.
    quota: Option<usize>,
    events: broadcast::Sender<StorageEvent>,
}

/// In-memory [`Storage`] with an optional byte quota.
///
/// Cheap to clone; clones share state and notifications.
#[derive(Clone)]
pub struct MemoryStorage {
    inner: Arc<Inner>,
}

impl MemoryStorage {
    /// Creates an empty, unlimited substrate.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates an empty substrate that rejects writes once keys plus
    /// values would exceed `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self::build(Some(quota_bytes))
    }

    fn build(quota: Option<usize>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                items: Mutex::new(HashMap::new()),
                quota,
                events,
            }),
        }
    }

    /// Publishes `event` to every subscriber without touching the data.
    ///
    /// Lets tests synthesize a change made somewhere else.
    pub fn emit(&self, event: StorageEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.items().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes of keys plus values currently stored.
    pub fn used_bytes(&self) -> usize {
        self.items().map(|items| used_bytes(&items)).unwrap_or(0)
    }

    fn items(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.inner
            .items
            .lock()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned".into()))
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("keys", &self.len())
            .field("quota", &self.inner.quota)
            .finish()
    }
}

fn used_bytes(items: &HashMap<String, String>) -> usize {
    items.iter().map(|(k, v)| k.len() + v.len()).sum()
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let old_value = {
            let mut items = self.items()?;

            if let Some(quota) = self.inner.quota {
                let current = used_bytes(&items);
                let replaced = items.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
                let needed = current - replaced + key.len() + value.len();
                if needed > quota {
                    return Err(StorageError::QuotaExceeded {
                        key: key.to_string(),
                        needed,
                        quota,
                    });
                }
            }

            items.insert(key.to_string(), value.to_string())
        };

        if old_value.as_deref() != Some(value) {
            self.emit(StorageEvent {
                key: Some(key.to_string()),
                old_value,
                new_value: Some(value.to_string()),
            });
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let old_value = self.items()?.remove(key);
        if old_value.is_some() {
            self.emit(StorageEvent {
                key: Some(key.to_string()),
                old_value,
                new_value: None,
            });
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let had_items = {
            let mut items = self.items()?;
            let had = !items.is_empty();
            items.clear();
            had
        };
        if had_items {
            self.emit(StorageEvent {
                key: None,
                old_value: None,
                new_value: None,
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<StorageEvent>> {
        Some(self.inner.events.subscribe())
    }
}
