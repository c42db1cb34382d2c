//! Reader events
//!
//! Everything the reader observes is published on one broadcast channel.
//! Publishing never waits on subscribers: a subscriber that falls more than
//! the channel capacity behind gets `RecvError::Lagged` and skips ahead.
//! Events of one kind are delivered in the order they were published.

use std::fmt;

use tokio::sync::broadcast;
use tracing::trace;

use sm25_core::{Frame, SendCommand};

/// Externally visible connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Connected,
    Closed,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => f.write_str("Connected"),
            Self::Closed => f.write_str("Closed"),
        }
    }
}

/// Something the reader did or received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    /// The connection opened or closed
    ConnectionStateChanged(ConnectionStatus),

    /// A frame finished assembling
    FrameReceived(Frame),

    /// A command was written to the socket
    CommandSent(SendCommand),
}

/// Fan-out of [`ReaderEvent`]s to any number of subscribers
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ReaderEvent>,
}

impl EventBus {
    /// Create a bus retaining up to `capacity` undelivered events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish an event; with no subscribers it is dropped
    pub fn publish(&self, event: ReaderEvent) {
        trace!(?event, "Publishing event");
        let _ = self.sender.send(event);
    }
}
