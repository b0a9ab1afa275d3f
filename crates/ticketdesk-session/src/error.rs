//! Error types for the session layer.

use ticketdesk_store::StorageError;

/// Errors returned by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The user id can't be embedded in a token: it is empty or contains
    /// the `_` segment delimiter.
    #[error("user id {0:?} cannot be encoded in a session token")]
    InvalidUserId(String),

    /// There is no valid session to act on (never signed in, logged out,
    /// or already expired).
    #[error("no active session")]
    NoActiveSession,

    /// Persisting the session failed. Sign-in aborts rather than keeping
    /// a memory-only session.
    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),

    /// The controller task has been stopped; its handle is dead.
    #[error("session controller is not running")]
    ControllerStopped,
}

/// Why a string isn't a well-formed session token.
///
/// The validator and controller treat every variant as "no session";
/// the detail only matters for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Not exactly four `_`-separated segments.
    #[error("expected 4 segments, found {0}")]
    WrongSegmentCount(usize),

    /// The first segment isn't the literal `session`.
    #[error("unexpected token prefix {0:?}")]
    BadPrefix(String),

    #[error("token has an empty user id")]
    EmptyUserId,

    #[error("token has an empty nonce")]
    EmptyNonce,

    /// The timestamp segment isn't an integer.
    #[error("invalid timestamp segment {0:?}")]
    BadTimestamp(String),
}
