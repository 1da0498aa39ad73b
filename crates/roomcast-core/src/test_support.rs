use crate::model::Client;
use crate::registry::Registry;
use async_trait::async_trait;
use roomcast_protocol::{codec, Msg, Resp};
use roomcast_transport::{ChannelConnection, Connection, ConnectionId, TransportError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Bind a fresh channel-backed connection.
pub(crate) fn connect(registry: &Registry) -> (Client, mpsc::UnboundedReceiver<Msg>) {
    let (conn, rx) = ChannelConnection::new(ConnectionId::generate());
    (registry.bind_connection(Arc::new(conn)), rx)
}

/// Wait for the next delivered message and decode its payload.
pub(crate) async fn recv_resp(rx: &mut mpsc::UnboundedReceiver<Msg>) -> (i64, Resp) {
    let msg = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for delivery")
        .expect("connection queue closed");
    let resp = codec::decode_payload(&msg.data).expect("payload is a Resp");
    (msg.id, resp)
}

/// A connection whose writes always fail.
pub(crate) struct BrokenConnection {
    id: ConnectionId,
    pub(crate) attempts: AtomicUsize,
}

impl BrokenConnection {
    pub(crate) fn new() -> Self {
        Self {
            id: ConnectionId::generate(),
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Connection for BrokenConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    async fn write(&self, _msg: Msg) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::SendFailed("peer reset".into()))
    }

    fn is_open(&self) -> bool {
        false
    }
}

/// A connection whose writes never complete, like a peer that stopped reading.
pub(crate) struct StalledConnection {
    id: ConnectionId,
    pub(crate) attempts: AtomicUsize,
}

impl StalledConnection {
    pub(crate) fn new() -> Self {
        Self {
            id: ConnectionId::generate(),
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Connection for StalledConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    async fn write(&self, _msg: Msg) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    fn is_open(&self) -> bool {
        true
    }
}
