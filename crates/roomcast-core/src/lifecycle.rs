//! Binding connections to clients.
//!
//! A connection carries its own [`ConnectionId`], assigned when it was
//! accepted. Binding maps that ID to a freshly allocated client; the
//! connection object itself is never modified.

use crate::id::ClientId;
use crate::model::Client;
use crate::registry::Registry;
use roomcast_transport::{Connection, ConnectionId};
use std::sync::Arc;
use tracing::debug;

impl Registry {
    /// Register a new connection and create its client.
    ///
    /// The client starts in no chat. Binding an already bound connection
    /// again replaces its previous client.
    pub fn bind_connection(&self, conn: Arc<dyn Connection>) -> Client {
        let connection_id = *conn.id();
        let client = Client::new(self.ids.next_client_id());

        self.clients.insert(client.id, client.clone());
        self.connections.insert(client.id, conn);

        if let Some(previous) = self.bindings.insert(connection_id, client.id) {
            debug!(connection = %connection_id, client = %previous, "Replacing existing binding");
            self.purge_client(previous);
        }

        debug!(connection = %connection_id, client = %client.id, "Connection bound");
        client
    }

    /// The client bound to a connection, if any.
    #[must_use]
    pub fn resolve_client(&self, connection_id: &ConnectionId) -> Option<Client> {
        let client_id = *self.bindings.get(connection_id)?;
        self.client(client_id)
    }

    /// Forget a connection and everything its client owned.
    ///
    /// Safe to call more than once, or for a connection that was never bound.
    pub fn unbind(&self, connection_id: &ConnectionId) {
        if let Some((_, client_id)) = self.bindings.remove(connection_id) {
            self.purge_client(client_id);
            debug!(connection = %connection_id, client = %client_id, "Connection unbound");
        }
    }

    /// Set a client's display name.
    ///
    /// Returns `false` if the client is unknown.
    pub fn rename_client(&self, client_id: ClientId, name: impl Into<String>) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(mut client) => {
                client.name = name.into();
                true
            }
            None => false,
        }
    }

    fn purge_client(&self, client_id: ClientId) {
        self.connections.remove(&client_id);

        let Some((_, client)) = self.clients.remove(&client_id) else {
            return;
        };
        if let Some(chat_id) = client.chat_id {
            if let Some(mut set) = self.members.get_mut(&chat_id) {
                set.remove(&client_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::registry::Registry;
    use crate::test_support::{connect, recv_resp};
    use roomcast_protocol::Resp;
    use roomcast_transport::{ChannelConnection, ConnectionId};
    use std::sync::Arc;

    #[test]
    fn test_bind_and_resolve() {
        let registry = Registry::new();
        let (conn, _rx) = ChannelConnection::new(ConnectionId::new(10));

        let client = registry.bind_connection(Arc::new(conn));
        assert_eq!(client.chat_id, None);
        assert_eq!(client.name, "");

        let resolved = registry.resolve_client(&ConnectionId::new(10)).unwrap();
        assert_eq!(resolved, client);
        assert!(registry.resolve_client(&ConnectionId::new(11)).is_none());
    }

    #[test]
    fn test_each_connection_gets_a_new_client() {
        let registry = Registry::new();
        let (a, _rx_a) = connect(&registry);
        let (b, _rx_b) = connect(&registry);
        assert!(b.id > a.id);
    }

    #[test]
    fn test_rebinding_replaces_client() {
        let registry = Registry::new();
        let (first, _rx1) = ChannelConnection::new(ConnectionId::new(20));
        let (second, _rx2) = ChannelConnection::new(ConnectionId::new(20));

        let old = registry.bind_connection(Arc::new(first));
        let new = registry.bind_connection(Arc::new(second));

        assert!(registry.client(old.id).is_none());
        assert_eq!(
            registry.resolve_client(&ConnectionId::new(20)).map(|c| c.id),
            Some(new.id)
        );
        assert_eq!(registry.stats().connection_count, 1);
    }

    #[tokio::test]
    async fn test_unbind_cleans_up() {
        let registry = Registry::new();
        let (a, mut rx_a) = connect(&registry);
        let departing = ConnectionId::generate();
        let (conn, rx_c) = ChannelConnection::new(departing);
        let c = registry.bind_connection(Arc::new(conn));

        let chat = registry.create_chat(a.id, "lobby");
        registry.join(a.id, chat.id);
        registry.join(c.id, chat.id);

        registry.unbind(&departing);

        assert_eq!(registry.members(chat.id), vec![a.id]);
        assert!(registry.client(c.id).is_none());
        assert!(registry.resolve_client(&departing).is_none());
        assert_eq!(registry.stats().connection_count, 1);

        // Later broadcasts skip the departed client
        assert_eq!(registry.broadcast(a.id, 4, Resp::ok()), 1);
        recv_resp(&mut rx_a).await;
        drop(rx_c);
    }

    #[test]
    fn test_unbind_is_idempotent() {
        let registry = Registry::new();
        let (client, _rx) = connect(&registry);

        registry.unbind(&ConnectionId::new(u64::MAX));
        assert!(registry.client(client.id).is_some());

        let temporary = ConnectionId::generate();
        let (conn, _rx) = ChannelConnection::new(temporary);
        registry.bind_connection(Arc::new(conn));
        registry.unbind(&temporary);
        registry.unbind(&temporary);
        assert_eq!(registry.stats().client_count, 1);
    }

    #[test]
    fn test_rename_client() {
        let registry = Registry::new();
        let (client, _rx) = connect(&registry);

        assert!(registry.rename_client(client.id, "bob"));
        assert_eq!(registry.client(client.id).unwrap().name, "bob");
        assert!(!registry.rename_client(crate::ClientId(-1), "ghost"));
    }
}
