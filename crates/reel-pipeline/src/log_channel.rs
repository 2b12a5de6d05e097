//! Fire-and-forget progress broadcast.
//!
//! Producers publish [`WsMessage`]s; every connected observer holds its own
//! receiver. Nothing is buffered for late subscribers and a slow observer
//! simply misses lines once it lags behind the channel capacity.

use tokio::sync::broadcast;

use reel_models::WsMessage;

const DEFAULT_CAPACITY: usize = 512;

#[derive(Debug, Clone)]
pub struct LogChannel {
    sender: broadcast::Sender<WsMessage>,
}

impl LogChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to all current subscribers; dropped when nobody listens.
    pub fn publish(&self, message: WsMessage) {
        let _ = self.sender.send(message);
    }

    pub fn log(&self, line: impl Into<String>) {
        self.publish(WsMessage::log(line));
    }

    pub fn error(&self, line: impl Into<String>) {
        self.publish(WsMessage::error(line));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
