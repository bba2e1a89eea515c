/**
 * Subscriber
 *
 * One authenticated streaming connection, bound to a single workspace.
 * The subscriber itself is transport-free: it owns the bounded outbound
 * queues and the connection state machine, while the WebSocket read/write
 * loops live in the API layer and drive it.
 *
 * State machine: Handshaking -> Connected -> Closing -> Closed. Only a
 * Connected subscriber accepts reads and writes; every transition is
 * one-way, so closing is idempotent.
 */

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::shared::{ChunkMessage, CursorMessage, EventMessage};

/// Bound on each per-connection queue. A peer that falls further behind
/// than this is closed as a slow consumer.
pub const SUBSCRIBER_MESSAGE_BUFFER: usize = 8;

/// Close reason for slow consumers; the write loop maps it to a policy
/// violation close code.
pub const SLOW_CONSUMER_REASON: &str = "connection too slow to keep up with messages";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Handshaking = 0,
    Connected = 1,
    Closing = 2,
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Handshaking,
            1 => ConnectionState::Connected,
            2 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

/// Receiving halves of a subscriber's queues, handed to the write loop.
pub struct SubscriberChannels {
    pub chunk_rx: mpsc::Receiver<ChunkMessage>,
    pub event_rx: mpsc::Receiver<EventMessage>,
    pub cursor_rx: mpsc::Receiver<CursorMessage>,
}

pub struct Subscriber {
    pub client_id: Uuid,
    pub workspace_id: i64,
    state: AtomicU8,
    close_reason: Mutex<Option<String>>,
    closing: CancellationToken,
    chunk_tx: mpsc::Sender<ChunkMessage>,
    event_tx: mpsc::Sender<EventMessage>,
    cursor_tx: mpsc::Sender<CursorMessage>,
}

impl Subscriber {
    /// Create a subscriber in `Handshaking` state with a fresh client id.
    pub fn new(workspace_id: i64) -> (Self, SubscriberChannels) {
        let (chunk_tx, chunk_rx) = mpsc::channel(SUBSCRIBER_MESSAGE_BUFFER);
        let (event_tx, event_rx) = mpsc::channel(SUBSCRIBER_MESSAGE_BUFFER);
        let (cursor_tx, cursor_rx) = mpsc::channel(SUBSCRIBER_MESSAGE_BUFFER);

        let subscriber = Subscriber {
            client_id: Uuid::new_v4(),
            workspace_id,
            state: AtomicU8::new(ConnectionState::Handshaking as u8),
            close_reason: Mutex::new(None),
            closing: CancellationToken::new(),
            chunk_tx,
            event_tx,
            cursor_tx,
        };

        (
            subscriber,
            SubscriberChannels {
                chunk_rx,
                event_rx,
                cursor_rx,
            },
        )
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether the connection is live and accepting traffic.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Handshake finished; the socket is up.
    pub fn mark_connected(&self) {
        let _ = self.state.compare_exchange(
            ConnectionState::Handshaking as u8,
            ConnectionState::Connected as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Ask the write loop to close the connection. Later calls keep the
    /// first reason.
    pub fn begin_close(&self, reason: &str) {
        let transitioned = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                match ConnectionState::from_u8(state) {
                    ConnectionState::Handshaking | ConnectionState::Connected => {
                        Some(ConnectionState::Closing as u8)
                    }
                    _ => None,
                }
            })
            .is_ok();

        if transitioned {
            if let Ok(mut slot) = self.close_reason.lock() {
                *slot = Some(reason.to_string());
            }
            self.closing.cancel();
        }
    }

    /// Close a peer that cannot keep up with the broadcast rate.
    pub fn close_slow(&self) {
        self.begin_close(SLOW_CONSUMER_REASON);
    }

    /// The socket is gone; terminal state.
    pub fn mark_closed(&self) {
        self.state
            .store(ConnectionState::Closed as u8, Ordering::Release);
        self.closing.cancel();
    }

    /// Reason recorded by `begin_close`, if any.
    pub fn close_reason(&self) -> Option<String> {
        self.close_reason.lock().ok().and_then(|slot| slot.clone())
    }

    /// Token cancelled when the subscriber should wind down.
    pub fn closing_token(&self) -> CancellationToken {
        self.closing.clone()
    }

    pub(crate) fn try_send_chunk(
        &self,
        msg: ChunkMessage,
    ) -> Result<(), mpsc::error::TrySendError<ChunkMessage>> {
        self.chunk_tx.try_send(msg)
    }

    pub(crate) fn try_send_event(
        &self,
        msg: EventMessage,
    ) -> Result<(), mpsc::error::TrySendError<EventMessage>> {
        self.event_tx.try_send(msg)
    }

    pub(crate) fn try_send_cursor(
        &self,
        msg: CursorMessage,
    ) -> Result<(), mpsc::error::TrySendError<CursorMessage>> {
        self.cursor_tx.try_send(msg)
    }
}
