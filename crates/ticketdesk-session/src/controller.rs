//! The session lifecycle controller.
//!
//! Bridges the token codec, the validator and the local store into the
//! running application. It owns the answer to "is someone signed in right
//! now?" and tells observers when that answer changes against the user's
//! will (expiry, logout in another tab) or is about to (warning).
//!
//! ## Lifecycle
//!
//! ```text
//!                 establish()
//! [Unauthenticated] ──────────→ [Authenticated] ──(≤ 5 min left)──→ [Warning]
//!        ↑                           │    ↑                            │
//!        │                           │    └──────extend_session()──────┤
//!        │        logout()           │                                 │
//!        ├───────────────────────────┘                                 │
//!        │                                                             │
//!        └──── check() finds expired / other tab cleared the token ────┘
//!                       (on_expired fires exactly once)
//! ```
//!
//! "Expired" is not a resting state: the controller clears the stored
//! session and lands in `Unauthenticated` in the same step.
//!
//! The controller itself is synchronous. [`start`](SessionController::start)
//! moves it into a Tokio task that drives the periodic checks; see
//! [`SessionHandle`](crate::SessionHandle).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ticketdesk_model::User;
use ticketdesk_store::{LocalStore, StorageEvent};

use crate::validator::{validate, validate_token};
use crate::{Clock, SessionConfig, SessionError, SessionToken, SessionValidity};

// ---------------------------------------------------------------------------
// State and callbacks
// ---------------------------------------------------------------------------

/// Where the current session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nobody is signed in.
    Unauthenticated,
    /// A valid session exists and is not close to expiry.
    Authenticated,
    /// A valid session exists and the expiry warning has fired.
    Warning,
}

impl SessionState {
    /// Returns `true` for every state with a live session.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Unauthenticated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "Unauthenticated"),
            Self::Authenticated => write!(f, "Authenticated"),
            Self::Warning => write!(f, "Warning"),
        }
    }
}

/// Why a session ended without an explicit local logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReason {
    /// The token outlived its lifetime (or became unreadable).
    Expired,
    /// The token was removed from the shared store by someone else,
    /// typically a logout in another tab.
    ExternalLogout,
}

/// Receives session lifecycle notifications.
///
/// Called synchronously from inside the controller, so implementations
/// should hand work off (send on a channel, flip a flag) rather than block.
pub trait SessionObserver: Send + Sync + 'static {
    /// The session ended; the user must sign in again.
    fn on_expired(&self, reason: ExpiryReason);

    /// The session will expire in `time_left`. Fires once per approach
    /// to expiry; renewing the session re-arms it.
    fn on_warning(&self, time_left: Duration);
}

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

/// Drives one client's session through its lifecycle.
pub struct SessionController {
    pub(crate) store: LocalStore,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: SessionConfig,
    observers: Vec<Arc<dyn SessionObserver>>,
    state: SessionState,
    /// Set when the warning fires, cleared once `should_warn` goes false.
    warned: bool,
}

impl SessionController {
    /// Creates a controller over `store`.
    ///
    /// Starts `Authenticated` if the store already holds a valid token
    /// (a session from an earlier run), `Unauthenticated` otherwise.
    pub fn new(store: LocalStore, clock: Arc<dyn Clock>, config: SessionConfig) -> Self {
        let config = config.validated();
        let mut controller = Self {
            store,
            clock,
            config,
            observers: Vec::new(),
            state: SessionState::Unauthenticated,
            warned: false,
        };
        if controller.refresh_info().is_valid {
            controller.state = SessionState::Authenticated;
        }
        controller
    }

    /// Registers an observer. Observers are called in registration order.
    pub fn subscribe(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The stored token, if present and well-formed.
    pub fn current_token(&self) -> Option<SessionToken> {
        self.stored_token_text()
            .and_then(|raw| SessionToken::parse(&raw).ok())
    }

    /// The stored user record, if the session is live and its token has
    /// not expired, whether or not a check has run since.
    pub fn current_user(&self) -> Option<User> {
        if !self.state.is_authenticated() || !self.refresh_info().is_valid {
            return None;
        }
        self.store.get(&self.config.keys.user)
    }

    /// Signs `user` in: issues a token and stores it with the user record.
    ///
    /// # Errors
    /// - [`SessionError::InvalidUserId`] if the id can't go in a token
    /// - [`SessionError::Storage`] if either write fails; nothing is kept
    pub fn establish(&mut self, user: &User) -> Result<SessionToken, SessionError> {
        let token = SessionToken::issue(&user.id, self.clock.now_millis())?;

        self.store.set(&self.config.keys.session, &token.encode())?;
        if let Err(e) = self.store.set(&self.config.keys.user, user) {
            // Don't leave a token behind for a user record that isn't there.
            if let Err(cleanup) = self.store.remove(&self.config.keys.session) {
                tracing::warn!(error = %cleanup, "failed to roll back session token");
            }
            return Err(e.into());
        }

        self.state = SessionState::Authenticated;
        self.warned = false;
        tracing::info!(user_id = %user.id, "session established");
        Ok(token)
    }

    /// Current validity, without any side effects.
    pub fn refresh_info(&self) -> SessionValidity {
        validate(
            self.stored_token_text().as_deref(),
            self.clock.now_millis(),
            &self.config,
        )
    }

    /// The periodic check.
    ///
    /// Reads the stored token, computes its validity and acts on it:
    /// - expired while a session was present → clear the store, notify
    ///   `on_expired`, go `Unauthenticated`
    /// - inside the warning window and not yet warned → notify `on_warning`
    ///   once
    ///
    /// Returns the snapshot it acted on.
    pub fn check(&mut self) -> SessionValidity {
        let raw = self.stored_token_text();
        let snapshot = validate(raw.as_deref(), self.clock.now_millis(), &self.config);

        if snapshot.is_expired {
            if raw.is_some() || self.state.is_authenticated() {
                tracing::info!("session expired");
                self.end_session(ExpiryReason::Expired);
            }
            return snapshot;
        }

        if !self.state.is_authenticated() {
            tracing::debug!("found a valid stored session, adopting it");
            self.state = SessionState::Authenticated;
        }

        if snapshot.should_warn {
            if !self.warned {
                self.warned = true;
                self.state = SessionState::Warning;
                tracing::info!(
                    remaining_ms = snapshot.time_until_expiry_millis,
                    "session about to expire"
                );
                for observer in &self.observers {
                    observer.on_warning(snapshot.time_until_expiry());
                }
            }
        } else {
            self.warned = false;
            self.state = SessionState::Authenticated;
        }

        snapshot
    }

    /// Renews the session for the same user, resetting the expiry clock
    /// and re-arming the warning.
    ///
    /// A failed write is logged and otherwise ignored; the next check sees
    /// the old token and handles it.
    ///
    /// # Errors
    /// [`SessionError::NoActiveSession`] if there is no valid session.
    pub fn extend_session(&mut self) -> Result<SessionValidity, SessionError> {
        let now = self.clock.now_millis();
        let current = self
            .current_token()
            .filter(|token| validate_token(token, now, &self.config).is_valid)
            .ok_or(SessionError::NoActiveSession)?;

        let renewed = SessionToken::issue(&current.user_id, now)?;
        if let Err(e) = self.store.set(&self.config.keys.session, &renewed.encode()) {
            tracing::warn!(error = %e, "failed to store renewed session token");
        }

        self.warned = false;
        self.state = SessionState::Authenticated;
        tracing::info!(user_id = %renewed.user_id, "session extended");
        Ok(validate_token(&renewed, now, &self.config))
    }

    /// Explicit sign-out. Observers are not notified: the caller asked
    /// for this.
    pub fn logout(&mut self) {
        self.clear_stored();
        self.state = SessionState::Unauthenticated;
        self.warned = false;
        tracing::info!("logged out");
    }

    /// Reacts to a change made to the shared store by someone else.
    ///
    /// - the session key removed (or the store cleared) while signed in →
    ///   same transition and callback as expiry, without waiting for the
    ///   next check
    /// - a valid session written while signed out → adopt it silently
    ///
    /// Events are delivered after the fact, including those caused by this
    /// controller. A removal is only acted on if the token is still gone.
    pub fn handle_storage_event(&mut self, event: &StorageEvent) {
        let session_key = self.config.keys.session.clone();

        if event.removes(&session_key) {
            if self.state.is_authenticated() && !self.refresh_info().is_valid {
                tracing::info!("session cleared elsewhere, logging out");
                self.end_session(ExpiryReason::ExternalLogout);
            }
            return;
        }

        if event.key.as_deref() == Some(session_key.as_str())
            && !self.state.is_authenticated()
            && self.refresh_info().is_valid
        {
            tracing::info!("session started elsewhere, adopting it");
            self.state = SessionState::Authenticated;
            self.warned = false;
        }
    }

    fn end_session(&mut self, reason: ExpiryReason) {
        self.clear_stored();
        self.state = SessionState::Unauthenticated;
        self.warned = false;
        for observer in &self.observers {
            observer.on_expired(reason);
        }
    }

    /// Removes token and user record. Failures are logged only.
    fn clear_stored(&self) {
        for key in [&self.config.keys.session, &self.config.keys.user] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key = %key, error = %e, "failed to clear session data");
            }
        }
    }

    fn stored_token_text(&self) -> Option<String> {
        self.store.get::<String>(&self.config.keys.session)
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state)
            .field("warned", &self.warned)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

// =========================================================================
// Tests
// =========================================================================
