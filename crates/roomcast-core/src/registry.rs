//! The registry store.
//!
//! All tables are sharded maps, so operations on unrelated chats or clients
//! do not contend. Guards are short-lived and never held across an `.await`.
//! When two guards are needed at once, the client entry is always locked
//! before the membership entry.

use crate::id::{ChatId, ClientId, IdGenerator, DEFAULT_ID_STEP, MAX_OBSERVED_ID};
use crate::model::{Chat, Client};
use dashmap::DashMap;
use roomcast_transport::{Connection, ConnectionId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registry configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Distance between consecutive chat or client identifiers.
    pub id_step: i64,
    /// Whether a broadcast is also delivered to the client that sent it.
    pub broadcast_to_origin: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            id_step: DEFAULT_ID_STEP,
            broadcast_to_origin: true,
        }
    }
}

/// Live server state: chats, who is in them, and how to reach each client.
pub struct Registry {
    pub(crate) ids: IdGenerator,
    /// Chats indexed by ID.
    pub(crate) chats: DashMap<ChatId, Chat>,
    /// Membership set per chat.
    pub(crate) members: DashMap<ChatId, HashSet<ClientId>>,
    /// Clients indexed by ID.
    pub(crate) clients: DashMap<ClientId, Client>,
    /// Outbound connection per client.
    pub(crate) connections: DashMap<ClientId, Arc<dyn Connection>>,
    /// Which client each accepted connection is bound to.
    pub(crate) bindings: DashMap<ConnectionId, ClientId>,
    pub(crate) config: RegistryConfig,
}

impl Registry {
    /// Create a new registry with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        info!("Creating registry with config: {:?}", config);
        Self {
            ids: IdGenerator::with_step(config.id_step),
            chats: DashMap::new(),
            members: DashMap::new(),
            clients: DashMap::new(),
            connections: DashMap::new(),
            bindings: DashMap::new(),
            config,
        }
    }

    /// Get the registry configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Get registry statistics.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            chat_count: self.chats.len(),
            client_count: self.clients.len(),
            connection_count: self.connections.len(),
            total_memberships: self.members.iter().map(|m| m.len()).sum(),
        }
    }

    /// Look up a chat.
    #[must_use]
    pub fn chat(&self, chat_id: ChatId) -> Option<Chat> {
        self.chats.get(&chat_id).map(|c| c.clone())
    }

    /// Check if a chat exists.
    #[must_use]
    pub fn chat_exists(&self, chat_id: ChatId) -> bool {
        self.chats.contains_key(&chat_id)
    }

    /// Look up a client.
    #[must_use]
    pub fn client(&self, client_id: ClientId) -> Option<Client> {
        self.clients.get(&client_id).map(|c| c.clone())
    }

    /// Members of a chat, in ascending ID order. Empty if the chat is unknown.
    #[must_use]
    pub fn members(&self, chat_id: ChatId) -> Vec<ClientId> {
        let mut members: Vec<ClientId> = self
            .members
            .get(&chat_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        members.sort_unstable();
        members
    }

    /// All chats, in ascending ID order.
    #[must_use]
    pub fn list_chats(&self) -> Vec<Chat> {
        let mut chats: Vec<Chat> = self.chats.iter().map(|c| c.value().clone()).collect();
        chats.sort_unstable_by_key(|c| c.id);
        chats
    }

    /// Snapshot of the full chat table.
    #[must_use]
    pub fn export_chats(&self) -> HashMap<ChatId, Chat> {
        self.chats
            .iter()
            .map(|c| (*c.key(), c.value().clone()))
            .collect()
    }

    /// Merge chats from another registry or a snapshot.
    ///
    /// Existing chats with the same ID are replaced but keep their members.
    /// Chat IDs generated afterwards are greater than every imported ID.
    /// Chats with an ID above [`MAX_OBSERVED_ID`] are skipped. Returns the
    /// number of chats imported.
    pub fn import_chats(&self, chats: HashMap<ChatId, Chat>) -> usize {
        let mut count = 0;
        for (chat_id, mut chat) in chats {
            if !self.ids.observe_chat_id(chat_id) {
                warn!(chat = %chat_id, max = MAX_OBSERVED_ID, "Skipping chat with out of range id");
                continue;
            }
            chat.id = chat_id;
            self.members.entry(chat_id).or_default();
            self.chats.insert(chat_id, chat);
            count += 1;
        }
        debug!(count, "Imported chats");
        count
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of chats.
    pub chat_count: usize,
    /// Number of bound clients.
    pub client_count: usize,
    /// Number of connections reachable for delivery.
    pub connection_count: usize,
    /// Sum of all membership set sizes.
    pub total_memberships: usize,
}
