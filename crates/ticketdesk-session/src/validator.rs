//! Session validity: a pure function of a token and the current time.

use std::time::Duration;

use crate::SessionConfig;
use crate::token::{SessionToken, duration_millis};

/// Derived validity of the current session. Recomputed on every check,
/// never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionValidity {
    pub is_valid: bool,
    pub is_expired: bool,
    /// Zero once expired.
    pub time_until_expiry_millis: u64,
    /// `true` only while the remaining lifetime is within the warning
    /// window and still positive.
    pub should_warn: bool,
}

impl SessionValidity {
    /// Snapshot for an absent or ill-formed token.
    pub const NO_SESSION: Self = Self {
        is_valid: false,
        is_expired: true,
        time_until_expiry_millis: 0,
        should_warn: false,
    };

    pub fn time_until_expiry(&self) -> Duration {
        Duration::from_millis(self.time_until_expiry_millis)
    }
}

impl Default for SessionValidity {
    fn default() -> Self {
        Self::NO_SESSION
    }
}

/// Validates raw token text at `now_millis`.
///
/// Absent or malformed text yields [`SessionValidity::NO_SESSION`].
pub fn validate(token: Option<&str>, now_millis: i64, config: &SessionConfig) -> SessionValidity {
    match token.map(SessionToken::parse) {
        Some(Ok(token)) => validate_token(&token, now_millis, config),
        Some(Err(e)) => {
            tracing::debug!(error = %e, "ignoring malformed session token");
            SessionValidity::NO_SESSION
        }
        None => SessionValidity::NO_SESSION,
    }
}

/// Validates an already parsed token at `now_millis`.
///
/// The session is expired once `remaining <= 0`; the warning window is
/// the half-open range `(0, warning_window]`.
pub fn validate_token(
    token: &SessionToken,
    now_millis: i64,
    config: &SessionConfig,
) -> SessionValidity {
    let expiry = token.expires_at_millis(config.session_duration);
    let remaining = expiry.saturating_sub(now_millis);
    let is_expired = remaining <= 0;

    SessionValidity {
        is_valid: !is_expired,
        is_expired,
        time_until_expiry_millis: u64::try_from(remaining).unwrap_or(0),
        should_warn: remaining > 0 && remaining <= duration_millis(config.warning_window),
    }
}
