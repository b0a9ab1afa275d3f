//! The simulated fault taxonomy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What kind of network failure happened.
///
/// Eight kinds can be injected at random ([`FaultKind::INJECTABLE`]).
/// `Offline` comes from the connectivity check, and `UnknownNetworkError`
/// wraps any non-fault error raised by the wrapped operation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultKind {
    ConnectionError,
    Timeout,
    ServerError,
    NotFound,
    Unauthorized,
    Forbidden,
    RateLimited,
    ServiceUnavailable,
    Offline,
    UnknownNetworkError,
}

impl FaultKind {
    /// Kinds drawn from when an error is injected, each equally likely.
    pub const INJECTABLE: [FaultKind; 8] = [
        Self::ConnectionError,
        Self::Timeout,
        Self::ServerError,
        Self::NotFound,
        Self::Unauthorized,
        Self::Forbidden,
        Self::RateLimited,
        Self::ServiceUnavailable,
    ];

    /// Stable machine-readable code, e.g. `"RATE_LIMITED"`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConnectionError => "CONNECTION_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::ServerError => "SERVER_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::RateLimited => "RATE_LIMITED",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::Offline => "OFFLINE",
            Self::UnknownNetworkError => "UNKNOWN_NETWORK_ERROR",
        }
    }

    /// The HTTP status a real backend would answer with, if any.
    /// Connection-level failures never reach a server and have none.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Timeout => Some(408),
            Self::ServerError => Some(500),
            Self::NotFound => Some(404),
            Self::Unauthorized => Some(401),
            Self::Forbidden => Some(403),
            Self::RateLimited => Some(429),
            Self::ServiceUnavailable => Some(503),
            Self::ConnectionError | Self::Offline | Self::UnknownNetworkError => None,
        }
    }

    /// Human-readable message shown when nothing more specific is known.
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::ConnectionError => "Unable to connect to the server. Please check your connection.",
            Self::Timeout => "The request timed out. Please try again.",
            Self::ServerError => "The server encountered an error. Please try again later.",
            Self::NotFound => "The requested resource was not found.",
            Self::Unauthorized => "Your session is not authorized. Please log in again.",
            Self::Forbidden => "You do not have permission to perform this action.",
            Self::RateLimited => "Too many requests. Please wait a moment and try again.",
            Self::ServiceUnavailable => "The service is temporarily unavailable.",
            Self::Offline => "You appear to be offline. Check your internet connection.",
            Self::UnknownNetworkError => "An unexpected network error occurred.",
        }
    }

    /// Whether repeating the same request could reasonably succeed.
    /// The simulator never retries; this is a hint for callers.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError
                | Self::Timeout
                | Self::ServerError
                | Self::RateLimited
                | Self::ServiceUnavailable
                | Self::Offline
        )
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A typed network failure surfaced to the calling operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} during {label}: {message}")]
pub struct NetworkFault {
    pub kind: FaultKind,
    /// Label of the wrapped operation, e.g. `"tickets.create"`.
    pub label: String,
    pub message: String,
}

impl NetworkFault {
    /// A fault with the kind's default message.
    pub fn new(kind: FaultKind, label: impl Into<String>) -> Self {
        Self::with_message(kind, label, kind.default_message())
    }

    pub fn with_message(
        kind: FaultKind,
        label: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            label: label.into(),
            message: message.into(),
        }
    }
}

/// An error type that can carry a [`NetworkFault`].
///
/// The simulator returns the wrapped operation's own error type. It needs
/// to build that type from a fault, and to tell whether an error raised by
/// the operation already is one (passed through) or not (wrapped as
/// [`FaultKind::UnknownNetworkError`]).
pub trait FaultAware: From<NetworkFault> + fmt::Display {
    fn as_network_fault(&self) -> Option<&NetworkFault>;
}

impl FaultAware for NetworkFault {
    fn as_network_fault(&self) -> Option<&NetworkFault> {
        Some(self)
    }
}
