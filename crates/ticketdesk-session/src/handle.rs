//! Session actor: the controller running in its own Tokio task.
//!
//! [`SessionController::start`] moves the controller into a task that owns
//! it exclusively. Everything else talks to it through a [`SessionHandle`]
//! over an mpsc channel, the same actor model the rest of the stack uses,
//! so a "read token, validate, maybe clear" sequence never interleaves
//! with another command.
//!
//! The task wakes up for four reasons:
//!
//! ```text
//! ┌──────────────────────── select! ────────────────────────┐
//! │ command from a handle   → establish / extend / logout … │
//! │ check interval (5 min)  → check()                       │
//! │ refresh interval (30 s) → check()                       │
//! │ storage notification    → handle_storage_event()        │
//! └─────────────────────────────────────────────────────────┘
//!            after each wake-up: publish snapshot on `watch`
//! ```
//!
//! Stopping the actor drops both intervals; there is no other way to
//! cancel a pending check.

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use ticketdesk_model::User;
use ticketdesk_store::StorageEvent;

use crate::{SessionController, SessionError, SessionState, SessionToken, SessionValidity};

/// Capacity of the command channel. Commands are tiny and handled fast.
const COMMAND_CAPACITY: usize = 32;

/// Commands sent to the session actor.
///
/// Variants with a `reply` carry a oneshot "return address" the actor
/// answers on.
pub(crate) enum SessionCommand {
    Establish {
        user: User,
        reply: oneshot::Sender<Result<SessionToken, SessionError>>,
    },
    Extend {
        reply: oneshot::Sender<Result<SessionValidity, SessionError>>,
    },
    Refresh {
        reply: oneshot::Sender<SessionValidity>,
    },
    Check {
        reply: oneshot::Sender<SessionValidity>,
    },
    Logout {
        reply: oneshot::Sender<()>,
    },
    State {
        reply: oneshot::Sender<SessionState>,
    },
    CurrentUser {
        reply: oneshot::Sender<Option<User>>,
    },
    Shutdown,
}

/// Handle to a running session actor.
///
/// Cheap to clone. Once the actor stops, every method returns
/// [`SessionError::ControllerStopped`].
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionCommand>,
    snapshot: watch::Receiver<SessionValidity>,
}

impl SessionHandle {
    /// Signs `user` in. See [`SessionController::establish`].
    pub async fn establish(&self, user: User) -> Result<SessionToken, SessionError> {
        self.request(|reply| SessionCommand::Establish { user, reply })
            .await?
    }

    /// Renews the session. See [`SessionController::extend_session`].
    pub async fn extend_session(&self) -> Result<SessionValidity, SessionError> {
        self.request(|reply| SessionCommand::Extend { reply }).await?
    }

    /// Current validity without side effects.
    pub async fn refresh_info(&self) -> Result<SessionValidity, SessionError> {
        self.request(|reply| SessionCommand::Refresh { reply }).await
    }

    /// Runs the periodic check right now instead of waiting for a tick.
    pub async fn check_now(&self) -> Result<SessionValidity, SessionError> {
        self.request(|reply| SessionCommand::Check { reply }).await
    }

    /// Explicit sign-out.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Logout { reply }).await
    }

    pub async fn state(&self) -> Result<SessionState, SessionError> {
        self.request(|reply| SessionCommand::State { reply }).await
    }

    /// The signed-in user's record, if any.
    pub async fn current_user(&self) -> Result<Option<User>, SessionError> {
        self.request(|reply| SessionCommand::CurrentUser { reply })
            .await
    }

    /// A receiver of the latest validity snapshot, updated after every
    /// command, tick, and storage notification.
    pub fn snapshot(&self) -> watch::Receiver<SessionValidity> {
        self.snapshot.clone()
    }

    /// Stops the actor and its timers.
    pub async fn stop(&self) -> Result<(), SessionError> {
        self.sender
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| SessionError::ControllerStopped)
    }

    /// Returns `true` while the actor is alive.
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| SessionError::ControllerStopped)?;
        reply_rx.await.map_err(|_| SessionError::ControllerStopped)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("running", &self.is_running())
            .finish()
    }
}

impl SessionController {
    /// Spawns the controller as an actor on the current Tokio runtime.
    ///
    /// Runs one check immediately so a stale stored session is caught at
    /// startup, then on every interval tick.
    pub fn start(self) -> SessionHandle {
        let (sender, receiver) = mpsc::channel(COMMAND_CAPACITY);
        let (snapshot_tx, snapshot) = watch::channel(self.refresh_info());
        let events = self.store.subscribe();

        tokio::spawn(self.run(receiver, snapshot_tx, events));

        SessionHandle { sender, snapshot }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        snapshot_tx: watch::Sender<SessionValidity>,
        mut events: Option<broadcast::Receiver<StorageEvent>>,
    ) {
        let check_every = self.config.check_interval;
        let refresh_every = self.config.refresh_interval;
        let mut check_timer = time::interval_at(Instant::now() + check_every, check_every);
        let mut refresh_timer = time::interval_at(Instant::now() + refresh_every, refresh_every);
        check_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        refresh_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::debug!(
            check_secs = check_every.as_secs_f64(),
            refresh_secs = refresh_every.as_secs_f64(),
            cross_tab = events.is_some(),
            "session controller started"
        );
        snapshot_tx.send_replace(self.check());

        loop {
            tokio::select! {
                cmd = commands.recv() => {
                    match cmd {
                        Some(SessionCommand::Shutdown) | None => break,
                        Some(cmd) => self.handle_command(cmd),
                    }
                }
                _ = check_timer.tick() => {
                    self.check();
                }
                _ = refresh_timer.tick() => {
                    self.check();
                }
                event = next_event(&mut events) => {
                    match event {
                        Ok(event) => self.handle_storage_event(&event),
                        Err(RecvError::Lagged(missed)) => {
                            // Missed notifications may include a removal;
                            // re-read the store instead.
                            tracing::warn!(missed, "storage notifications lagged, re-checking");
                            self.check();
                        }
                        Err(RecvError::Closed) => {
                            tracing::debug!("storage notifications closed");
                            events = None;
                        }
                    }
                }
            }

            snapshot_tx.send_replace(self.refresh_info());
        }

        tracing::debug!("session controller stopped");
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        // Replies are best-effort: the caller may have given up waiting.
        match cmd {
            SessionCommand::Establish { user, reply } => {
                let _ = reply.send(self.establish(&user));
            }
            SessionCommand::Extend { reply } => {
                let _ = reply.send(self.extend_session());
            }
            SessionCommand::Refresh { reply } => {
                let _ = reply.send(self.refresh_info());
            }
            SessionCommand::Check { reply } => {
                let _ = reply.send(self.check());
            }
            SessionCommand::Logout { reply } => {
                self.logout();
                let _ = reply.send(());
            }
            SessionCommand::State { reply } => {
                let _ = reply.send(self.state());
            }
            SessionCommand::CurrentUser { reply } => {
                // Expiry is acted on here rather than at the next tick.
                self.check();
                let _ = reply.send(self.current_user());
            }
            SessionCommand::Shutdown => {}
        }
    }
}

/// Next storage notification, or never if the substrate has none.
async fn next_event(
    events: &mut Option<broadcast::Receiver<StorageEvent>>,
) -> Result<StorageEvent, RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
