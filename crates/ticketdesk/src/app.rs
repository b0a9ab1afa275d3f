//! `Ticketdesk` builder and application facade.
//!
//! This is the entry point for an embedding UI. It ties together all the
//! layers: store → session → tickets, with every would-be network call
//! passing through the simulator.

use std::sync::Arc;

use ticketdesk_model::{NewTicket, Ticket, TicketId, TicketPatch, User, UserId};
use ticketdesk_netsim::{NetworkConfig, NetworkSimulator};
use ticketdesk_session::{
    Clock, SessionConfig, SessionController, SessionHandle, SessionObserver, SystemClock,
};
use ticketdesk_store::{LocalStore, MemoryStorage, Storage, StorageKeys};

use crate::{
    Authenticator, DemoDirectory, Signup, TicketFilter, TicketService, TicketStats,
    TicketdeskError,
};

/// Author of the seeded demo tickets (the demo admin account).
const DEMO_AUTHOR: &str = "u1";

/// Builder for configuring and starting a [`Ticketdesk`].
///
/// # Example
///
/// ```rust,ignore
/// use ticketdesk::prelude::*;
///
/// let desk = Ticketdesk::builder()
///     .network_config(NetworkConfig::disabled())
///     .build_demo();
/// let user = desk.login("agent@example.com", "agent123").await?;
/// ```
pub struct TicketdeskBuilder {
    storage: Option<Arc<dyn Storage>>,
    clock: Arc<dyn Clock>,
    session_config: SessionConfig,
    network_config: NetworkConfig,
    simulator: Option<NetworkSimulator>,
    observers: Vec<Arc<dyn SessionObserver>>,
}

impl TicketdeskBuilder {
    /// Creates a new builder with default settings: in-memory storage,
    /// the system clock, and default session and network configs.
    pub fn new() -> Self {
        Self {
            storage: None,
            clock: Arc::new(SystemClock),
            session_config: SessionConfig::default(),
            network_config: NetworkConfig::default(),
            simulator: None,
            observers: Vec::new(),
        }
    }

    /// Sets the storage substrate. Share a clone of it between two
    /// instances to model two tabs.
    pub fn storage(mut self, storage: impl Storage) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the simulator configuration. Ignored if a whole simulator is
    /// supplied with [`simulator`](Self::simulator).
    pub fn network_config(mut self, config: NetworkConfig) -> Self {
        self.network_config = config;
        self
    }

    /// Uses a pre-built simulator (custom randomness or connectivity).
    pub fn simulator(mut self, simulator: NetworkSimulator) -> Self {
        self.simulator = Some(simulator);
        self
    }

    /// Registers a session observer (expiry and warning callbacks).
    pub fn observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Builds the application and starts its session controller.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build<A: Authenticator>(self, auth: A) -> Ticketdesk<A> {
        let storage: Arc<dyn Storage> = match self.storage {
            Some(storage) => storage,
            None => Arc::new(MemoryStorage::new()),
        };
        let store = LocalStore::from_arc(storage);
        if !store.is_available() {
            tracing::warn!("local storage unavailable, nothing will persist");
        }

        let keys = self.session_config.keys.clone();
        let tickets = TicketService::new(store.clone(), &keys, Arc::clone(&self.clock));

        let mut controller =
            SessionController::new(store.clone(), Arc::clone(&self.clock), self.session_config);
        for observer in self.observers {
            controller.subscribe(observer);
        }

        let simulator = self
            .simulator
            .unwrap_or_else(|| NetworkSimulator::new(self.network_config));
        tracing::info!(
            network_simulation = simulator.is_enabled(),
            "ticketdesk started"
        );

        Ticketdesk {
            store,
            keys,
            auth,
            tickets,
            session: controller.start(),
            simulator,
        }
    }

    /// Builds with a [`DemoDirectory`] on the builder's clock.
    pub fn build_demo(self) -> Ticketdesk<DemoDirectory> {
        let directory = DemoDirectory::new(Arc::clone(&self.clock));
        self.build(directory)
    }
}

impl Default for TicketdeskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Ticketdesk instance.
pub struct Ticketdesk<A: Authenticator = DemoDirectory> {
    store: LocalStore,
    keys: StorageKeys,
    auth: A,
    tickets: TicketService,
    session: SessionHandle,
    simulator: NetworkSimulator,
}

impl<A: Authenticator> Ticketdesk<A> {
    // -- Auth ---------------------------------------------------------------

    /// Checks credentials and starts a session.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, TicketdeskError> {
        let user = self
            .simulator
            .wrap("login", move || async move {
                Ok::<_, TicketdeskError>(self.auth.authenticate(email, password).await)
            })
            .await??;
        self.session.establish(user.clone()).await?;
        Ok(user)
    }

    /// Registers an account and signs it in.
    pub async fn signup(&self, signup: Signup) -> Result<User, TicketdeskError> {
        let user = self
            .simulator
            .wrap("signup", move || async move {
                Ok::<_, TicketdeskError>(self.auth.register(signup).await)
            })
            .await??;
        self.session.establish(user.clone()).await?;
        Ok(user)
    }

    /// Ends the session. Local only; never fails on the network.
    pub async fn logout(&self) -> Result<(), TicketdeskError> {
        Ok(self.session.logout().await?)
    }

    pub async fn current_user(&self) -> Result<Option<User>, TicketdeskError> {
        Ok(self.session.current_user().await?)
    }

    /// The session actor, for expiry snapshots and renewal.
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// The network simulator, for a developer control panel.
    pub fn simulator(&self) -> &NetworkSimulator {
        &self.simulator
    }

    // -- Tickets ------------------------------------------------------------

    pub async fn list_tickets(&self) -> Result<Vec<Ticket>, TicketdeskError> {
        self.call("tickets.list", || Ok(self.tickets.list())).await
    }

    pub async fn search_tickets(
        &self,
        filter: &TicketFilter,
    ) -> Result<Vec<Ticket>, TicketdeskError> {
        self.call("tickets.search", || Ok(self.tickets.list_filtered(filter)))
            .await
    }

    pub async fn get_ticket(&self, id: &TicketId) -> Result<Ticket, TicketdeskError> {
        self.call("tickets.get", || self.tickets.get(id)).await
    }

    /// Opens a ticket as the signed-in user.
    pub async fn create_ticket(&self, new: NewTicket) -> Result<Ticket, TicketdeskError> {
        let user = self.require_user().await?;
        self.call("tickets.create", || self.tickets.create(&user.id, new))
            .await
    }

    pub async fn update_ticket(
        &self,
        id: &TicketId,
        patch: TicketPatch,
    ) -> Result<Ticket, TicketdeskError> {
        self.require_user().await?;
        self.call("tickets.update", || self.tickets.update(id, patch))
            .await
    }

    pub async fn delete_ticket(&self, id: &TicketId) -> Result<(), TicketdeskError> {
        self.require_user().await?;
        self.call("tickets.delete", || self.tickets.delete(id)).await
    }

    pub async fn ticket_stats(&self) -> Result<TicketStats, TicketdeskError> {
        self.call("tickets.stats", || Ok(self.tickets.stats())).await
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Signs out, wipes the namespace, and seeds the sample tickets.
    ///
    /// Signing out first keeps the wipe from reading as a logout made in
    /// another tab.
    pub async fn reset_demo_data(&self) -> Result<Vec<Ticket>, TicketdeskError> {
        self.session.logout().await?;
        self.store.clear_namespace(&self.keys)?;
        Ok(self.tickets.seed_demo(&UserId::from(DEMO_AUTHOR))?)
    }

    /// Stops the session controller. Safe to call more than once.
    pub async fn shutdown(&self) {
        if self.session.stop().await.is_ok() {
            tracing::info!("ticketdesk stopped");
        }
    }

    async fn require_user(&self) -> Result<User, TicketdeskError> {
        self.session
            .current_user()
            .await?
            .ok_or(TicketdeskError::NotAuthenticated)
    }

    /// Runs local work as a simulated request.
    ///
    /// Domain errors (not found, invalid ticket, storage) are part of the
    /// response and come back as they are. Only the simulated transport
    /// adds faults.
    async fn call<T>(
        &self,
        label: &str,
        op: impl FnOnce() -> Result<T, TicketdeskError>,
    ) -> Result<T, TicketdeskError> {
        self.simulator
            .wrap(label, move || async move { Ok::<_, TicketdeskError>(op()) })
            .await?
    }
}

impl Ticketdesk<DemoDirectory> {
    /// Creates a new builder.
    pub fn builder() -> TicketdeskBuilder {
        TicketdeskBuilder::new()
    }
}
