//! Ticketdesk walkthrough. Set `RUST_LOG=debug` to watch the simulator and
//! session controller at work.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ticketdesk::prelude::*;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Session observer
// ---------------------------------------------------------------------------

struct Banner;

impl SessionObserver for Banner {
    fn on_expired(&self, reason: ExpiryReason) {
        tracing::warn!(?reason, "signed out, please log in again");
    }

    fn on_warning(&self, time_left: Duration) {
        tracing::warn!(secs = time_left.as_secs(), "session about to expire");
    }
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

const ATTEMPTS: usize = 3;

/// Retries while the failure is a retryable simulated fault.
async fn retry<T, F, Fut>(label: &str, mut op: F) -> Result<T, TicketdeskError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TicketdeskError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(TicketdeskError::Network(fault))
                if fault.kind.is_retryable() && attempt < ATTEMPTS =>
            {
                tracing::info!(label, attempt, kind = %fault.kind, "retrying");
                attempt += 1;
            }
            other => return other,
        }
    }
}

// ---------------------------------------------------------------------------
// Walkthrough
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let desk = Ticketdesk::builder()
        .network_config(NetworkConfig {
            enabled: true,
            delay_range: DelayRange::new(50, 200),
            ..NetworkConfig::default()
        })
        .observer(Arc::new(Banner))
        .build_demo();

    desk.reset_demo_data().await?;

    let user = retry("login", || desk.login("agent@example.com", "agent123")).await?;
    println!("signed in as {} ({:?})", user.name, user.role);

    let created = retry("create", || {
        desk.create_ticket(NewTicket {
            title: "Password reset email never arrives".into(),
            description: "Checked spam, nothing there.".into(),
            priority: TicketPriority::High,
            tags: vec!["email".into()],
        })
    })
    .await?;
    println!("opened {}", created.id);

    retry("update", || {
        desk.update_ticket(
            &created.id,
            TicketPatch {
                status: Some(TicketStatus::InProgress),
                ..TicketPatch::default()
            },
        )
    })
    .await?;

    for ticket in retry("list", || desk.list_tickets()).await? {
        println!(
            "  [{:>11}] {:<6} {}",
            ticket.status.to_string(),
            ticket.priority.to_string(),
            ticket.title
        );
    }

    let stats = retry("stats", || desk.ticket_stats()).await?;
    println!("stats: {}", serde_json::to_string(&stats)?);

    let validity = desk.session().refresh_info().await?;
    println!(
        "session valid for another {} minutes",
        validity.time_until_expiry().as_secs() / 60
    );
    println!(
        "network: {}",
        serde_json::to_string(&desk.simulator().stats())?
    );

    desk.logout().await?;
    desk.shutdown().await;
    Ok(())
}
