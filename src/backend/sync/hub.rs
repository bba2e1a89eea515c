/**
 * Subscriber Hub
 *
 * Registry of live streaming connections grouped by workspace, plus the
 * broadcast fan-out. Broadcasting never blocks on a peer: each delivery is
 * a `try_send` into that peer's bounded queue, and a full queue closes the
 * offending connection without affecting the others.
 *
 * Dead entries (terminal state, receiver gone) are evicted lazily while
 * iterating; nothing reaps connections out of band.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::limiter::RateLimiter;
use super::subscriber::{ConnectionState, Subscriber, SubscriberChannels};
use crate::shared::{ChunkMessage, CursorMessage, EventMessage};

pub struct SubscriberHub {
    subscribers: Mutex<HashMap<Uuid, Arc<Subscriber>>>,
    publish_limiter: RateLimiter,
}

impl Default for SubscriberHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriberHub {
    pub fn new() -> Self {
        SubscriberHub {
            subscribers: Mutex::new(HashMap::new()),
            publish_limiter: RateLimiter::new(Duration::from_millis(100), 8),
        }
    }

    /// Register a new subscriber for `workspace_id` and hand back its
    /// queue ends for the write loop.
    pub async fn subscribe(&self, workspace_id: i64) -> (Arc<Subscriber>, SubscriberChannels) {
        let (subscriber, channels) = Subscriber::new(workspace_id);
        let subscriber = Arc::new(subscriber);

        self.subscribers
            .lock()
            .await
            .insert(subscriber.client_id, subscriber.clone());

        (subscriber, channels)
    }

    /// Drop a subscriber from the registry.
    pub async fn remove(&self, client_id: Uuid) {
        self.subscribers.lock().await.remove(&client_id);
    }

    pub async fn connection_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Deliver a chunk message to every peer in the sender's workspace,
    /// the sender included: the echo carries the authoritative version the
    /// client must adopt as its new base.
    pub async fn broadcast_chunk(&self, sender: &Subscriber, msg: ChunkMessage) {
        self.publish_limiter.acquire().await;

        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|_, sub| sub.state() != ConnectionState::Closed);

        for sub in subscribers.values() {
            if sub.workspace_id != sender.workspace_id {
                continue;
            }

            if let Err(TrySendError::Full(_)) = sub.try_send_chunk(msg.clone()) {
                tracing::warn!(client_id = %sub.client_id, "chunk queue full, closing slow consumer");
                sub.close_slow();
            }
        }
    }

    /// Deliver a file lifecycle event to workspace peers, excluding the
    /// sender: it already performed the action locally.
    pub async fn broadcast_event(&self, sender: &Subscriber, msg: EventMessage) {
        self.publish_limiter.acquire().await;

        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|_, sub| sub.state() != ConnectionState::Closed);

        for sub in subscribers.values() {
            if sub.workspace_id != sender.workspace_id || sub.client_id == sender.client_id {
                continue;
            }

            if let Err(TrySendError::Full(_)) = sub.try_send_event(msg.clone()) {
                tracing::warn!(client_id = %sub.client_id, "event queue full, closing slow consumer");
                sub.close_slow();
            }
        }
    }

    /// Deliver a cursor update to workspace peers, excluding the sender.
    pub async fn broadcast_cursor(&self, sender: &Subscriber, msg: CursorMessage) {
        self.publish_limiter.acquire().await;

        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|_, sub| sub.state() != ConnectionState::Closed);

        for sub in subscribers.values() {
            if sub.workspace_id != sender.workspace_id || sub.client_id == sender.client_id {
                continue;
            }

            if let Err(TrySendError::Full(_)) = sub.try_send_cursor(msg.clone()) {
                tracing::warn!(client_id = %sub.client_id, "cursor queue full, closing slow consumer");
                sub.close_slow();
            }
        }
    }

    /// Ask every live subscriber to close. Used during shutdown.
    pub async fn close_all(&self, reason: &str) {
        let subscribers = self.subscribers.lock().await;
        for sub in subscribers.values() {
            sub.begin_close(reason);
        }
    }
}
