//! Delivery to one client or to every member of a chat.
//!
//! Delivery failures stay here. They are logged and dropped; they never
//! reach the caller and never change membership. Cleaning up a dead client
//! is left to [`Registry::unbind`], driven by the transport's own disconnect.

use crate::id::{ChatId, ClientId};
use crate::registry::Registry;
use roomcast_protocol::{codec, Msg, ProtocolError, Resp};
use roomcast_transport::{Connection, TransportError};
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

/// Why a single delivery failed.
#[derive(Debug, Error)]
enum DeliveryError {
    #[error("Encoding failed: {0}")]
    Encode(#[from] ProtocolError),

    #[error("Write failed: {0}")]
    Write(#[from] TransportError),
}

impl Registry {
    /// Send `payload` to one client under `message_id`.
    ///
    /// Does nothing if the client has no bound connection.
    pub async fn reply(&self, client_id: ClientId, message_id: i64, payload: &Resp) {
        match self.connection(client_id) {
            Some(conn) => deliver(conn, client_id, message_id, payload).await,
            None => trace!(client = %client_id, "Reply to unbound client dropped"),
        }
    }

    /// Send `payload` to every member of the origin's chat.
    ///
    /// Each delivery runs as its own task, so a slow or broken connection
    /// never holds up the others. Returns the number of deliveries
    /// dispatched; they may still be in flight when this returns. Does
    /// nothing if the origin is in no chat or no tokio runtime is running.
    pub fn broadcast(&self, origin: ClientId, message_id: i64, payload: Resp) -> usize {
        let Some(chat_id) = self.clients.get(&origin).and_then(|c| c.chat_id) else {
            return 0;
        };
        self.broadcast_to(chat_id, origin, message_id, payload)
    }

    /// Send `payload` to every current member of `chat_id` on behalf of
    /// `origin`, who need not be a member.
    ///
    /// Same delivery rules as [`Registry::broadcast`]. Used to tell a room
    /// about a client that has already moved out of it.
    pub fn broadcast_to(
        &self,
        chat_id: ChatId,
        origin: ClientId,
        message_id: i64,
        payload: Resp,
    ) -> usize {
        let recipients: Vec<ClientId> = match self.members.get(&chat_id) {
            Some(set) => set.iter().copied().collect(),
            None => return 0,
        };

        let Ok(runtime) = Handle::try_current() else {
            warn!(chat = %chat_id, "Broadcast outside of a tokio runtime dropped");
            return 0;
        };

        let payload = Arc::new(payload);
        let mut dispatched = 0;

        for client_id in recipients {
            if client_id == origin && !self.config.broadcast_to_origin {
                continue;
            }
            let Some(conn) = self.connection(client_id) else {
                continue;
            };

            let payload = Arc::clone(&payload);
            runtime.spawn(async move {
                deliver(conn, client_id, message_id, &payload).await;
            });
            dispatched += 1;
        }

        trace!(chat = %chat_id, origin = %origin, recipients = dispatched, "Broadcast dispatched");
        dispatched
    }

    fn connection(&self, client_id: ClientId) -> Option<Arc<dyn Connection>> {
        self.connections.get(&client_id).map(|c| Arc::clone(c.value()))
    }
}

async fn deliver(conn: Arc<dyn Connection>, client_id: ClientId, message_id: i64, payload: &Resp) {
    if let Err(e) = try_deliver(conn.as_ref(), message_id, payload).await {
        debug!(client = %client_id, connection = %conn.id(), error = %e, "Delivery failed");
    }
}

async fn try_deliver(
    conn: &dyn Connection,
    message_id: i64,
    payload: &Resp,
) -> Result<(), DeliveryError> {
    let data = codec::encode_payload(payload)?;
    conn.write(Msg::new(message_id, data)).await?;
    Ok(())
}
