//! Local key-value storage for Ticketdesk.
//!
//! Two layers:
//!
//! 1. **Substrate** ([`Storage`] trait, [`MemoryStorage`]): raw strings,
//!    fallible, optionally publishing [`StorageEvent`]s on every change.
//! 2. **Store** ([`LocalStore`]): JSON values, absent-on-error reads,
//!    availability probing, and the fixed [`StorageKeys`] layout.
//!
//! # How it fits in the stack
//!
//! ```text
//! Session / Tickets (above)  ← read and write tokens, users, tickets
//!     ↕
//! Store (this crate)  ← JSON codec + change notifications
//!     ↕
//! Substrate  ← browser storage, memory, ...
//! ```

mod error;
mod local;
mod substrate;

pub use error::StorageError;
pub use local::{DEFAULT_PREFIX, LocalStore, TEST_KEY, StorageKeys};
pub use substrate::{MemoryStorage, Storage, StorageEvent};
