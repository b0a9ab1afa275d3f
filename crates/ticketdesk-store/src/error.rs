//! Error types for the storage layer.

/// Errors that can occur while writing to the key-value substrate.
///
/// Reads never surface these to callers of [`LocalStore::get`](crate::LocalStore::get):
/// an unreadable or malformed entry is reported as absent instead.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The substrate refused the operation (private mode, disabled
    /// storage, poisoned lock).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Writing `key` would push the substrate past its byte quota.
    #[error("storage quota exceeded while writing {key} ({needed} of {quota} bytes)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    /// The value could not be serialized to JSON.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),
}
