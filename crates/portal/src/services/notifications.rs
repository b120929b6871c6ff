//! Live contact-message notifications for the admin dashboard.
//!
//! One background task holds the only upstream subscription to
//! `user_messages` inserts and fans each new message out over a broadcast
//! channel. Every open dashboard feed owns a receiver; closing the page drops
//! it. If the upstream stream ends or fails, the task waits a fixed delay and
//! subscribes again.
//!
//! The hub numbers every message it relays. A dashboard renders the current
//! number next to its counts and hands it back when the feed connects, so a
//! message relayed between page render and connect still bumps the counter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use jack_machine_core::UserMessage;

use crate::backend::DataService;
use crate::db::messages;

/// Delay before resubscribing after the upstream stream ends.
pub const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

const CHANNEL_CAPACITY: usize = 64;

/// A relayed message and its position in the hub's sequence.
#[derive(Debug, Clone)]
pub struct Notification {
    pub seq: u64,
    pub message: UserMessage,
}

/// Fan-out point for new contact messages.
#[derive(Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<Notification>,
    relayed: Arc<AtomicU64>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationHub {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            relayed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Receiver for messages relayed from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Sequence number of the last relayed message; zero before the first.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.relayed.load(Ordering::SeqCst)
    }

    /// Number the message and hand it to every open feed.
    fn relay(&self, message: UserMessage) {
        let seq = self.relayed.fetch_add(1, Ordering::SeqCst) + 1;
        // No receivers just means no dashboard is open.
        let _ = self.sender.send(Notification { seq, message });
    }

    /// Start the upstream subscription task.
    pub fn spawn(&self, data: Arc<dyn DataService>) -> JoinHandle<()> {
        let hub = self.clone();
        tokio::spawn(async move { run(data, hub).await })
    }
}

async fn run(data: Arc<dyn DataService>, hub: NotificationHub) {
    loop {
        match data.subscribe_inserts(messages::TABLE).await {
            Ok(mut stream) => {
                info!("Subscribed to new contact messages");
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(row) => match serde_json::from_value::<UserMessage>(row) {
                            Ok(message) => {
                                debug!(message_id = %message.id, "New contact message");
                                hub.relay(message);
                            }
                            Err(e) => warn!(error = %e, "Skipping undecodable message row"),
                        },
                        Err(e) => {
                            warn!(error = %e, "Message feed failed");
                            break;
                        }
                    }
                }
                warn!("Message feed ended");
            }
            Err(e) => warn!(error = %e, "Failed to subscribe to contact messages"),
        }
        tokio::time::sleep(RESUBSCRIBE_DELAY).await;
    }
}

/// One update pushed to an open dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardEvent {
    /// Toast text for the new message; absent on a catch-up update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toast: Option<String>,
    /// Unread counter after this update.
    pub unread: u64,
}

/// Per-dashboard feed: each new message yields a toast and bumps the unread
/// counter by one, starting from the count the page was rendered with.
///
/// `since` is the hub sequence the page was rendered at. Messages relayed
/// after it but before this call are added in one catch-up update without a
/// toast. The receiver is taken before the sequence is read, and anything it
/// delivers at or below that sequence has already been counted.
pub fn dashboard_feed(
    hub: &NotificationHub,
    unread: u64,
    since: Option<u64>,
) -> impl Stream<Item = DashboardEvent> + use<> {
    let mut receiver = hub.subscribe();
    let seen = hub.sequence();
    let missed = since.map_or(0, |since| seen.saturating_sub(since));

    async_stream::stream! {
        let mut unread = unread + missed;
        if missed > 0 {
            yield DashboardEvent { toast: None, unread };
        }
        loop {
            match receiver.recv().await {
                Ok(notification) if notification.seq <= seen => {}
                Ok(notification) => {
                    unread += 1;
                    yield DashboardEvent {
                        toast: Some(notification.message.toast_text()),
                        unread,
                    };
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Dashboard feed lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::backend::MemoryBackend;
    use jack_machine_core::MessageId;

    fn message(id: i64, name: &str, subject: Option<&str>) -> UserMessage {
        UserMessage {
            id: MessageId::new(id),
            name: name.to_string(),
            email: "x@example.com".to_string(),
            subject: subject.map(String::from),
            message: "Hello".to_string(),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_feed_increments_unread_once_per_message() {
        let hub = NotificationHub::new();
        let feed = dashboard_feed(&hub, 4, None);
        futures::pin_mut!(feed);

        hub.relay(message(1, "Jane", Some("Quote")));
        hub.relay(message(2, "Sam", None));

        assert_eq!(
            feed.next().await.unwrap(),
            DashboardEvent {
                toast: Some("New message from Jane: Quote".to_string()),
                unread: 5,
            }
        );
        assert_eq!(feed.next().await.unwrap().unread, 6);
        assert_eq!(hub.sequence(), 2);
    }

    #[tokio::test]
    async fn test_feed_counts_messages_relayed_before_connect() {
        let hub = NotificationHub::new();
        hub.relay(message(1, "Old", None));
        let rendered_at = hub.sequence();

        // Arrives after the page rendered, before the feed connected.
        hub.relay(message(2, "Jane", Some("Quote")));

        let feed = dashboard_feed(&hub, 3, Some(rendered_at));
        futures::pin_mut!(feed);
        assert_eq!(
            feed.next().await.unwrap(),
            DashboardEvent {
                toast: None,
                unread: 4,
            }
        );

        hub.relay(message(3, "Sam", None));
        assert_eq!(feed.next().await.unwrap().unread, 5);
    }

    #[tokio::test]
    async fn test_feed_ends_when_hub_is_dropped() {
        let hub = NotificationHub::new();
        let feed = dashboard_feed(&hub, 0, None);
        drop(hub);
        futures::pin_mut!(feed);
        assert!(feed.next().await.is_none());
    }

    #[tokio::test]
    async fn test_hub_forwards_upstream_inserts() {
        let backend = MemoryBackend::new();
        let hub = NotificationHub::new();
        let mut receiver = hub.subscribe();
        let task = hub.spawn(Arc::new(backend.clone()));

        while backend.subscriber_count() == 0 {
            tokio::task::yield_now().await;
        }
        backend.seed_row(
            messages::TABLE,
            json!({"name": "Jane", "email": "jane@example.com", "message": "Hi", "is_read": false}),
        );
        backend.seed_row("services", json!({"name": "Ignored"}));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.message.name, "Jane");
        assert_eq!(received.seq, 1);
        assert!(receiver.try_recv().is_err());
        task.abort();
    }
}
