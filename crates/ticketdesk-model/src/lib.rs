//! Data records for Ticketdesk.
//!
//! Everything that ends up in the local store as JSON lives here:
//! [`User`] (the signed-in principal) and [`Ticket`] (the managed items),
//! plus the request shapes [`NewTicket`] and [`TicketPatch`].
//!
//! ```text
//! Session Layer / Ticket Service (above)  ← create, store, and read records
//!     ↕
//! Model (this crate)  ← plain serde types, no I/O
//! ```

mod types;

pub use types::{
    MAX_DESCRIPTION_LEN, MAX_TITLE_LEN, NewTicket, Role, Ticket, TicketId, TicketPatch,
    TicketPriority, TicketStatus, User, UserId,
};
