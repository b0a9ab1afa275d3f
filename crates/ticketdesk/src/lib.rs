//! # Ticketdesk
//!
//! Core of a ticket-management application that runs without a backend.
//!
//! Everything persists in a local key-value store, a signed-in user holds
//! a timestamped session token that expires after a fixed lifetime, and
//! every call that would hit a server in a real deployment goes through a
//! network simulator that adds latency and random failures.
//!
//! ```text
//! Ticketdesk (this crate)   ← login, tickets, demo data
//!   ├── ticketdesk-session  ← tokens, validity, lifecycle actor
//!   ├── ticketdesk-netsim   ← latency and fault injection
//!   ├── ticketdesk-store    ← JSON over a key-value substrate
//!   └── ticketdesk-model    ← User, Ticket
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ticketdesk::prelude::*;
//!
//! # async fn run() -> Result<(), TicketdeskError> {
//! let desk = Ticketdesk::builder().build_demo();
//! desk.login("agent@example.com", "agent123").await?;
//! let tickets = desk.list_tickets().await?;
//! # Ok(())
//! # }
//! ```

mod app;
mod auth;
mod error;
mod ids;
mod tickets;

pub use app::{Ticketdesk, TicketdeskBuilder};
pub use auth::{AuthError, Authenticator, DemoDirectory, MIN_PASSWORD_LEN, Signup};
pub use error::TicketdeskError;
pub use tickets::{TicketFilter, TicketService, TicketStats};

/// Everything an embedding application usually needs.
pub mod prelude {
    pub use crate::{
        AuthError, Authenticator, DemoDirectory, Signup, TicketFilter, TicketStats, Ticketdesk,
        TicketdeskBuilder, TicketdeskError,
    };
    pub use ticketdesk_model::{
        NewTicket, Role, Ticket, TicketId, TicketPatch, TicketPriority, TicketStatus, User, UserId,
    };
    pub use ticketdesk_netsim::{
        ConnectivityFlag, DelayRange, FaultKind, NetworkConfig, NetworkConfigPatch, NetworkFault,
        NetworkSimulator, SeededRandom, SequenceRandom,
    };
    pub use ticketdesk_session::{
        ExpiryReason, ManualClock, SessionConfig, SessionHandle, SessionObserver, SessionState,
        SessionValidity, SystemClock,
    };
    pub use ticketdesk_store::{LocalStore, MemoryStorage, Storage, StorageError, StorageEvent};
}
