//! Integration tests for `LocalStore` over different substrates.

use std::sync::atomic::{AtomicUsize, Ordering};

use ticketdesk_model::{Role, User, UserId};
use ticketdesk_store::{
    LocalStore, MemoryStorage, Storage, StorageError, StorageEvent, StorageKeys,
};

// =========================================================================
// Substrates
// =========================================================================

/// A substrate whose writes always throw, like storage in some private
/// browsing modes. Reads work and see nothing.
struct ReadOnlyStorage {
    write_attempts: AtomicUsize,
}

impl ReadOnlyStorage {
    fn new() -> Self {
        Self {
            write_attempts: AtomicUsize::new(0),
        }
    }
}

impl Storage for ReadOnlyStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Unavailable("writes are disabled".into()))
    }

    fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// A substrate where every call throws.
struct BrokenStorage;

impl Storage for BrokenStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("broken".into()))
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("broken".into()))
    }

    fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("broken".into()))
    }

    fn clear(&self) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("broken".into()))
    }
}

fn alice() -> User {
    User {
        id: UserId::from("u1"),
        email: "alice@example.com".into(),
        name: "Alice".into(),
        role: Role::Agent,
        created_at: 1_700_000_000_000,
    }
}

// =========================================================================
// Availability
// =========================================================================

#[test]
fn test_is_available_on_throwing_set_returns_false() {
    let store = LocalStore::new(ReadOnlyStorage::new());

    assert!(!store.is_available());
}

#[test]
fn test_is_available_on_full_quota_returns_false() {
    let storage = MemoryStorage::with_quota(8);
    storage.set_item("fill", "abc").unwrap();
    let store = LocalStore::new(storage);

    // The test key alone is longer than the remaining quota.
    assert!(!store.is_available());
}

#[test]
fn test_is_available_on_memory_returns_true() {
    assert!(LocalStore::new(MemoryStorage::new()).is_available());
}

// =========================================================================
// Reads never raise
// =========================================================================

#[test]
fn test_get_on_broken_substrate_returns_none() {
    let store = LocalStore::new(BrokenStorage);

    assert_eq!(store.get::<User>("ticketapp_user"), None);
}

#[test]
fn test_set_on_broken_substrate_reports_failure() {
    let store = LocalStore::new(BrokenStorage);

    let result = store.set("ticketapp_user", &alice());

    assert!(matches!(result, Err(StorageError::Unavailable(_))));
}

// =========================================================================
// Records
// =========================================================================

#[test]
fn test_user_record_survives_store() {
    let store = LocalStore::new(MemoryStorage::new());
    let keys = StorageKeys::default();

    store.set(&keys.user, &alice()).unwrap();

    assert_eq!(store.get::<User>(&keys.user), Some(alice()));
}

#[test]
fn test_remove_makes_key_absent() {
    let store = LocalStore::new(MemoryStorage::new());
    let keys = StorageKeys::default();
    store.set(&keys.user, &alice()).unwrap();

    store.remove(&keys.user).unwrap();

    assert_eq!(store.get::<User>(&keys.user), None);
}

#[test]
fn test_quota_failure_surfaces_from_set() {
    let store = LocalStore::new(MemoryStorage::with_quota(32));

    let result = store.set("ticketapp_user", &alice());

    assert!(matches!(result, Err(StorageError::QuotaExceeded { .. })));
}

// =========================================================================
// Notifications
// =========================================================================

#[tokio::test]
async fn test_subscribe_sees_removal_from_other_tab() {
    let tab_a = MemoryStorage::new();
    let tab_b = tab_a.clone();
    let store_a = LocalStore::new(tab_a);
    let store_b = LocalStore::new(tab_b);
    let keys = StorageKeys::default();
    store_a.set(&keys.session, "session_u1_1_abc").unwrap();
    let mut rx = store_a.subscribe().unwrap();

    store_b.remove(&keys.session).unwrap();

    let event = rx.recv().await.unwrap();
    assert!(event.removes(&keys.session));
}

#[tokio::test]
async fn test_emit_delivers_synthetic_event() {
    let storage = MemoryStorage::new();
    let store = LocalStore::new(storage.clone());
    let mut rx = store.subscribe().unwrap();
    let synthetic = StorageEvent {
        key: Some("ticketapp_session".into()),
        old_value: Some("\"session_u1_1_abc\"".into()),
        new_value: None,
    };

    storage.emit(synthetic.clone());

    assert_eq!(rx.recv().await.unwrap(), synthetic);
}

#[test]
fn test_subscribe_on_plain_substrate_returns_none() {
    assert!(LocalStore::new(BrokenStorage).subscribe().is_none());
}
