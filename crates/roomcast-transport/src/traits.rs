//! Connection traits for Roomcast.
//!
//! These traits define what the registry needs from a connection, allowing
//! it to stay independent of the transport that carries the bytes.

use async_trait::async_trait;
use roomcast_protocol::Msg;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Counter for connection IDs handed out at accept time.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Create a connection ID from a raw value.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Generate a fresh connection ID, unique within the process.
    #[must_use]
    pub fn generate() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw value.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

impl From<u64> for ConnectionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// A live connection the registry can write to.
///
/// Writes issued on one connection must be delivered in the order `write`
/// was called. Implementations must not block the caller on slow peers for
/// longer than it takes to queue the message.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the connection's unique identifier.
    fn id(&self) -> &ConnectionId;

    /// Write a framed message to the connection.
    async fn write(&self, msg: Msg) -> Result<(), TransportError>;

    /// Check if the connection is still open.
    fn is_open(&self) -> bool;

    /// Get the remote address of the connection, if available.
    fn remote_addr(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_generation() {
        let id1 = ConnectionId::generate();
        let id2 = ConnectionId::generate();
        assert_ne!(id1, id2);
        assert!(id2 > id1);
        assert!(id1.to_string().starts_with("conn_"));
    }

    #[test]
    fn test_connection_id_from_raw() {
        let id: ConnectionId = 42.into();
        assert_eq!(id.get(), 42);
        assert_eq!(id, ConnectionId::new(42));
    }
}
