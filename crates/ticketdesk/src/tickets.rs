//! Ticket CRUD over the local store.
//!
//! The whole collection lives under one key as a JSON array. Every
//! mutation reads the array, changes it, and writes it back; concurrent
//! writers race and the last write wins.

use std::sync::Arc;

use serde::Serialize;
use ticketdesk_model::{
    NewTicket, Ticket, TicketId, TicketPatch, TicketPriority, TicketStatus, UserId,
};
use ticketdesk_session::Clock;
use ticketdesk_store::{LocalStore, StorageError, StorageKeys};

use crate::{TicketdeskError, ids};

/// Narrows [`TicketService::list_filtered`]. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub created_by: Option<UserId>,
    /// Case-insensitive substring of the title, description, or a tag.
    pub text: Option<String>,
}

impl TicketFilter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        if self.status.is_some_and(|s| s != ticket.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != ticket.priority) {
            return false;
        }
        if self.created_by.as_ref().is_some_and(|u| *u != ticket.created_by) {
            return false;
        }
        match self.text.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(text) => {
                let needle = text.to_lowercase();
                ticket.title.to_lowercase().contains(&needle)
                    || ticket.description.to_lowercase().contains(&needle)
                    || ticket.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            }
        }
    }
}

/// Ticket counts for a dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketStats {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub closed: usize,
    pub high_priority_open: usize,
}

/// Reads and writes the ticket collection.
#[derive(Clone)]
pub struct TicketService {
    store: LocalStore,
    key: String,
    clock: Arc<dyn Clock>,
}

impl TicketService {
    pub fn new(store: LocalStore, keys: &StorageKeys, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            key: keys.tickets.clone(),
            clock,
        }
    }

    /// Every ticket, newest first.
    pub fn list(&self) -> Vec<Ticket> {
        let mut tickets = self.load();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.0.cmp(&b.id.0)));
        tickets
    }

    pub fn list_filtered(&self, filter: &TicketFilter) -> Vec<Ticket> {
        self.list()
            .into_iter()
            .filter(|ticket| filter.matches(ticket))
            .collect()
    }

    pub fn get(&self, id: &TicketId) -> Result<Ticket, TicketdeskError> {
        self.load()
            .into_iter()
            .find(|ticket| ticket.id == *id)
            .ok_or_else(|| TicketdeskError::TicketNotFound(id.clone()))
    }

    /// Opens a new ticket authored by `author`.
    ///
    /// # Errors
    /// - [`TicketdeskError::InvalidTicket`] if the fields fail validation
    /// - [`TicketdeskError::Storage`] if the collection can't be written
    pub fn create(&self, author: &UserId, new: NewTicket) -> Result<Ticket, TicketdeskError> {
        new.validate().map_err(TicketdeskError::InvalidTicket)?;

        let now = self.clock.now_millis();
        let ticket = Ticket {
            id: ids::new_ticket_id(now),
            title: new.title.trim().to_string(),
            description: new.description,
            status: TicketStatus::Open,
            priority: new.priority,
            tags: new.tags,
            created_by: author.clone(),
            created_at: now,
            updated_at: now,
        };

        let mut tickets = self.load();
        tickets.push(ticket.clone());
        self.save(&tickets)?;
        tracing::info!(ticket_id = %ticket.id, created_by = %author, "ticket created");
        Ok(ticket)
    }

    pub fn update(&self, id: &TicketId, patch: TicketPatch) -> Result<Ticket, TicketdeskError> {
        patch.validate().map_err(TicketdeskError::InvalidTicket)?;

        let mut tickets = self.load();
        let ticket = tickets
            .iter_mut()
            .find(|ticket| ticket.id == *id)
            .ok_or_else(|| TicketdeskError::TicketNotFound(id.clone()))?;
        patch.apply(ticket, self.clock.now_millis());
        let updated = ticket.clone();

        self.save(&tickets)?;
        tracing::info!(ticket_id = %id, status = %updated.status, "ticket updated");
        Ok(updated)
    }

    pub fn delete(&self, id: &TicketId) -> Result<(), TicketdeskError> {
        let mut tickets = self.load();
        let before = tickets.len();
        tickets.retain(|ticket| ticket.id != *id);
        if tickets.len() == before {
            return Err(TicketdeskError::TicketNotFound(id.clone()));
        }

        self.save(&tickets)?;
        tracing::info!(ticket_id = %id, "ticket deleted");
        Ok(())
    }

    pub fn stats(&self) -> TicketStats {
        self.load()
            .iter()
            .fold(TicketStats::default(), |mut stats, ticket| {
                stats.total += 1;
                match ticket.status {
                    TicketStatus::Open => stats.open += 1,
                    TicketStatus::InProgress => stats.in_progress += 1,
                    TicketStatus::Closed => stats.closed += 1,
                }
                if ticket.status != TicketStatus::Closed
                    && ticket.priority == TicketPriority::High
                {
                    stats.high_priority_open += 1;
                }
                stats
            })
    }

    /// Replaces the collection with a few sample tickets.
    pub fn seed_demo(&self, author: &UserId) -> Result<Vec<Ticket>, StorageError> {
        let now = self.clock.now_millis();
        let samples = [
            (
                "Cannot log in from mobile app",
                "The app says my password is wrong, but it works on the website.",
                TicketStatus::Open,
                TicketPriority::High,
                &["login", "mobile"][..],
            ),
            (
                "Invoice shows wrong billing address",
                "The March invoice still has our old office address.",
                TicketStatus::InProgress,
                TicketPriority::Medium,
                &["billing"][..],
            ),
            (
                "Feature request: dark mode",
                "It would be great to have a dark theme for late shifts.",
                TicketStatus::Closed,
                TicketPriority::Low,
                &["feature-request", "ui"][..],
            ),
        ];

        const HOUR_MILLIS: i64 = 60 * 60 * 1000;
        let tickets: Vec<Ticket> = samples
            .into_iter()
            .enumerate()
            .map(|(age, (title, description, status, priority, tags))| {
                let created_at = now - (age as i64 + 1) * HOUR_MILLIS;
                Ticket {
                    id: ids::new_ticket_id(created_at),
                    title: title.to_string(),
                    description: description.to_string(),
                    status,
                    priority,
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                    created_by: author.clone(),
                    created_at,
                    updated_at: created_at,
                }
            })
            .collect();

        self.save(&tickets)?;
        tracing::info!(count = tickets.len(), "demo tickets seeded");
        Ok(tickets)
    }

    /// Absent or unreadable collections read as empty.
    fn load(&self) -> Vec<Ticket> {
        self.store.get(&self.key).unwrap_or_default()
    }

    fn save(&self, tickets: &[Ticket]) -> Result<(), StorageError> {
        self.store.set(&self.key, tickets)
    }
}
