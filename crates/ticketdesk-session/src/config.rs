//! Session timing configuration.

use std::time::Duration;

use ticketdesk_store::StorageKeys;

/// How long a session lives and how often it is checked.
///
/// The defaults are the fixed values the UI is built around: a 24-hour
/// session, a warning 5 minutes before expiry, a background check every
/// 5 minutes and a UI-freshness check every 30 seconds. Override fields
/// with struct update syntax:
///
/// ```rust
/// use std::time::Duration;
/// use ticketdesk_session::SessionConfig;
///
/// let config = SessionConfig {
///     session_duration: Duration::from_secs(60 * 60),
///     ..SessionConfig::default()
/// };
/// assert_eq!(config.warning_window, Duration::from_secs(5 * 60));
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Lifetime of a token, measured from its issue timestamp.
    pub session_duration: Duration,

    /// A warning fires once when the remaining lifetime drops into
    /// `(0, warning_window]`.
    pub warning_window: Duration,

    /// Period of the background validity check.
    pub check_interval: Duration,

    /// Period of the UI-freshness check, which also publishes a new
    /// snapshot to watchers.
    pub refresh_interval: Duration,

    /// Where the token and user record live.
    pub keys: StorageKeys,
}

impl SessionConfig {
    pub const DEFAULT_SESSION_DURATION: Duration = Duration::from_secs(24 * 60 * 60);
    pub const DEFAULT_WARNING_WINDOW: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

    /// Fixes values that would break the controller.
    ///
    /// Zero intervals would make Tokio's `interval` panic, so they are
    /// raised to one millisecond.
    pub fn validated(mut self) -> Self {
        const MIN_INTERVAL: Duration = Duration::from_millis(1);
        if self.check_interval < MIN_INTERVAL {
            tracing::warn!("check_interval is zero, raising to 1ms");
            self.check_interval = MIN_INTERVAL;
        }
        if self.refresh_interval < MIN_INTERVAL {
            tracing::warn!("refresh_interval is zero, raising to 1ms");
            self.refresh_interval = MIN_INTERVAL;
        }
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_duration: Self::DEFAULT_SESSION_DURATION,
            warning_window: Self::DEFAULT_WARNING_WINDOW,
            check_interval: Self::DEFAULT_CHECK_INTERVAL,
            refresh_interval: Self::DEFAULT_REFRESH_INTERVAL,
            keys: StorageKeys::default(),
        }
    }
}
