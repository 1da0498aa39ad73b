//! Channel-backed connection.
//!
//! Writes are pushed onto an unbounded queue that a single writer task
//! drains into the real socket. Queueing never waits on the peer, so a slow
//! socket only delays its own writer task.

use async_trait::async_trait;
use roomcast_protocol::Msg;
use tokio::sync::mpsc;
use tracing::trace;

use crate::traits::{Connection, ConnectionId, TransportError};

/// A connection whose outbound messages are delivered through an mpsc queue.
#[derive(Debug)]
pub struct ChannelConnection {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<Msg>,
    remote_addr: Option<String>,
}

impl ChannelConnection {
    /// Create a connection and the receiving end of its outbound queue.
    #[must_use]
    pub fn new(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<Msg>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let conn = Self {
            id,
            sender,
            remote_addr: None,
        };
        (conn, receiver)
    }

    /// Attach the peer address.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }
}

#[async_trait]
impl Connection for ChannelConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    async fn write(&self, msg: Msg) -> Result<(), TransportError> {
        trace!(connection = %self.id, id = msg.id, bytes = msg.payload_size(), "Queueing message");
        self.sender
            .send(msg)
            .map_err(|_| TransportError::ConnectionClosed)
    }

    fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    fn remote_addr(&self) -> Option<String> {
        self.remote_addr.clone()
    }
}
