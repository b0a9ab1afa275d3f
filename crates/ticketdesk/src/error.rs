//! Unified error type for Ticketdesk.

use ticketdesk_model::TicketId;
use ticketdesk_netsim::{FaultAware, NetworkFault};
use ticketdesk_session::SessionError;
use ticketdesk_store::StorageError;

use crate::AuthError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` variants let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TicketdeskError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// A simulated network failure.
    #[error(transparent)]
    Network(#[from] NetworkFault),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The operation needs a signed-in user.
    #[error("not signed in")]
    NotAuthenticated,

    #[error("ticket {0} not found")]
    TicketNotFound(TicketId),

    /// A ticket failed its shape check (empty title, too long, ...).
    #[error("invalid ticket: {0}")]
    InvalidTicket(String),
}

impl TicketdeskError {
    /// Whether the caller should send the user back to the sign-in screen.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated | Self::Session(SessionError::NoActiveSession)
        )
    }
}

impl FaultAware for TicketdeskError {
    fn as_network_fault(&self) -> Option<&NetworkFault> {
        match self {
            Self::Network(fault) => Some(fault),
            _ => None,
        }
    }
}
