use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};

use quillsign_core::config::NotificationConfig;
use quillsign_core::traits::ticket_read_time_key;
use quillsign_core::{
    ClientStore, MessageAuthor, PortalBackend, PortalResult, ReadMarkerFallback, RealtimeEvent,
    Ticket, TicketMessage,
};

/// Broadcast hub for realtime events.
///
/// The remote subscriber feeds it; reconcilers subscribe to it. Send errors
/// just mean no subscribers are connected.
#[derive(Clone)]
pub struct EventHub {
    sender: broadcast::Sender<RealtimeEvent>,
}

impl EventHub {
    /// `channel_capacity` controls the broadcast buffer size (events before
    /// slow subscribers lag).
    pub fn new(channel_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity);
        EventHub { sender }
    }

    pub fn emit(&self, event: RealtimeEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.sender.subscribe()
    }

    pub fn sender(&self) -> broadcast::Sender<RealtimeEvent> {
        self.sender.clone()
    }
}

/// Count a message as unread iff it is admin-authored and strictly newer
/// than the effective read time.
fn unread_in(messages: &[TicketMessage], read_time: DateTime<Utc>) -> i64 {
    messages
        .iter()
        .filter(|m| m.author == MessageAuthor::Admin && m.created_at > read_time)
        .count() as i64
}

/// Computes unread-message counts by comparing admin-message timestamps
/// against a locally cached read time per ticket.
pub struct NotificationReconciler<B, S> {
    backend: Arc<B>,
    store: Arc<S>,
    fallback: ReadMarkerFallback,
    poll_interval: Duration,
    unread: watch::Sender<i64>,
}

impl<B, S> NotificationReconciler<B, S>
where
    B: PortalBackend,
    S: ClientStore,
{
    pub fn new(backend: Arc<B>, store: Arc<S>, config: &NotificationConfig) -> Self {
        let (unread, _) = watch::channel(0);
        NotificationReconciler {
            backend,
            store,
            fallback: config.read_marker_fallback,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            unread,
        }
    }

    /// Latest total unread count, updated by [`run`](Self::run).
    pub fn unread_counts(&self) -> watch::Receiver<i64> {
        self.unread.subscribe()
    }

    /// The timestamp a ticket's messages are compared against: the local
    /// read marker if one exists, otherwise the configured fallback. The
    /// `UpdatedAt` fallback reproduces the hosted platform's behavior, where
    /// any unrelated bump of `updated_at` retroactively marks prior admin
    /// messages read.
    pub async fn effective_read_time(&self, ticket: &Ticket) -> PortalResult<DateTime<Utc>> {
        let marker = self.store.get(&ticket_read_time_key(&ticket.id)).await?;
        if let Some(marker) = marker {
            match DateTime::parse_from_rfc3339(&marker) {
                Ok(dt) => return Ok(dt.with_timezone(&Utc)),
                Err(e) => {
                    tracing::warn!(ticket = %ticket.id, "unreadable read marker, ignoring: {e}");
                }
            }
        }
        Ok(match self.fallback {
            ReadMarkerFallback::UpdatedAt => ticket.updated_at,
            ReadMarkerFallback::None => DateTime::UNIX_EPOCH,
        })
    }

    pub async fn unread_for_ticket(&self, ticket: &Ticket) -> PortalResult<i64> {
        let messages = self.backend.list_ticket_messages(&ticket.id).await?;
        let read_time = self.effective_read_time(ticket).await?;
        Ok(unread_in(&messages, read_time))
    }

    pub async fn total_unread(&self, user_id: &str) -> PortalResult<i64> {
        let tickets = self.backend.list_tickets(user_id).await?;
        let mut total = 0;
        for ticket in &tickets {
            total += self.unread_for_ticket(ticket).await?;
        }
        Ok(total)
    }

    /// Mark a ticket read. The local marker is written first and stays
    /// authoritative for this client; the server-side `updated_at` bump is
    /// best-effort and a failed write is tolerated.
    pub async fn mark_read(&self, ticket_id: &str) -> PortalResult<()> {
        let now = Utc::now().to_rfc3339();
        self.store
            .put(&ticket_read_time_key(ticket_id), &now)
            .await?;
        if let Err(e) = self.backend.touch_ticket(ticket_id).await {
            tracing::warn!(ticket = %ticket_id, "server read marker update failed: {e}");
        }
        Ok(())
    }

    async fn recompute(&self, user_id: &str) {
        match self.total_unread(user_id).await {
            Ok(total) => {
                tracing::debug!(user = %user_id, total, "unread reconciled");
                self.unread.send_replace(total);
            }
            Err(e) => {
                tracing::warn!("unread reconciliation failed: {e}"); // keep last value
            }
        }
    }

    /// Reconciliation loop: recompute on start, on every poll tick, and on
    /// each realtime admin-message event. Runs until dropped; in-flight
    /// queries are simply abandoned with it.
    pub async fn run(&self, user_id: &str, mut events: broadcast::Receiver<RealtimeEvent>) {
        self.recompute(user_id).await;

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        interval.tick().await; // the first tick completes immediately

        let mut events_open = true;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.recompute(user_id).await;
                }
                event = events.recv(), if events_open => match event {
                    Ok(RealtimeEvent::AdminMessage { ticket_id, .. }) => {
                        tracing::debug!(ticket = %ticket_id, "admin message event");
                        self.recompute(user_id).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "realtime events lagged");
                        self.recompute(user_id).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        events_open = false;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn message(author: MessageAuthor, at: DateTime<Utc>) -> TicketMessage {
        TicketMessage {
            id: "m".to_string(),
            ticket_id: "t".to_string(),
            author,
            body: String::new(),
            created_at: at,
        }
    }

    #[test]
    fn counts_only_newer_admin_messages() {
        let read_time = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
        let messages = vec![
            message(MessageAuthor::Admin, read_time - chrono::Duration::hours(1)),
            message(MessageAuthor::Admin, read_time),
            message(MessageAuthor::Admin, read_time + chrono::Duration::hours(1)),
            message(MessageAuthor::User, read_time + chrono::Duration::hours(2)),
        ];
        // strictly-later admin messages only
        assert_eq!(unread_in(&messages, read_time), 1);
    }

    #[test]
    fn empty_thread_has_no_unread() {
        let read_time = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
        assert_eq!(unread_in(&[], read_time), 0);
    }
}
