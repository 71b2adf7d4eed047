//! Outbound half of a room connection

use fresco_ipc::ClientMessage;
use tokio::sync::mpsc;

use crate::SyncError;

/// Where the session writes outbound messages
pub trait Outbound: Send + std::fmt::Debug {
    /// Whether a send right now could reach the server
    fn is_open(&self) -> bool;

    fn send(&mut self, message: &ClientMessage) -> Result<(), SyncError>;
}

/// Feeds serialized messages to a socket writer task
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl Outbound for ChannelTransport {
    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    fn send(&mut self, message: &ClientMessage) -> Result<(), SyncError> {
        let text = message.to_json()?;
        self.tx.send(text).map_err(|_| SyncError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_transport_closes_with_writer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut transport = ChannelTransport::new(tx);
        assert!(transport.is_open());

        let join = ClientMessage::Join {
            room_id: None,
            known: Default::default(),
        };
        transport.send(&join).unwrap();
        assert_eq!(rx.try_recv().unwrap(), r#"{"type":"join","known":{}}"#);

        drop(rx);
        assert!(!transport.is_open());
        assert!(matches!(transport.send(&join), Err(SyncError::Closed)));
    }
}
