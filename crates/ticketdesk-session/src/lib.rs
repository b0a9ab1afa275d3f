//! Client-side session management for Ticketdesk.
//!
//! This crate handles the lifecycle of a signed-in user:
//!
//! 1. **Tokens**: issuing and parsing `session_<user>_<millis>_<nonce>`
//!    strings ([`SessionToken`])
//! 2. **Validation**: a pure validity snapshot for a token at a given
//!    time ([`validate`], [`SessionValidity`])
//! 3. **Lifecycle**: expiry, warnings, renewal, and cross-tab logout
//!    ([`SessionController`], run as an actor behind [`SessionHandle`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Application (above)  ← signs users in and out, shows warnings
//!     ↕
//! Session Layer (this crate)  ← decides whether a session is alive
//!     ↕
//! Store (below)  ← holds the token and user record, reports changes
//! ```

mod clock;
mod config;
mod controller;
mod error;
mod handle;
mod token;
mod validator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use controller::{ExpiryReason, SessionController, SessionObserver, SessionState};
pub use error::{SessionError, TokenError};
pub use handle::SessionHandle;
pub use token::{DELIMITER, SessionToken, TOKEN_PREFIX};
pub use validator::{SessionValidity, validate, validate_token};
