//! Chat creation, deletion and room membership.
//!
//! Failures are reported as `false` only. A missing chat and a caller that
//! is not allowed to act on it look the same; callers that need to tell them
//! apart should look the chat up first.

use crate::id::{ChatId, ClientId};
use crate::model::{now_millis, Chat};
use crate::registry::Registry;
use std::collections::HashSet;
use tracing::debug;

impl Registry {
    /// Create a chat owned by `creator`.
    ///
    /// Always succeeds. The creator does not join the chat.
    pub fn create_chat(&self, creator: ClientId, name: impl Into<String>) -> Chat {
        let creator_name = self
            .clients
            .get(&creator)
            .map(|c| c.name.clone())
            .unwrap_or_default();

        let chat = Chat {
            id: self.ids.next_chat_id(),
            name: name.into(),
            creator: creator_name,
            creator_id: creator,
            created_at: now_millis(),
        };

        self.members.insert(chat.id, HashSet::new());
        self.chats.insert(chat.id, chat.clone());

        debug!(chat = %chat.id, creator = %creator, name = %chat.name, "Chat created");
        chat
    }

    /// Delete a chat, evicting all of its members.
    ///
    /// Returns `false` without touching anything if the chat does not exist
    /// or `requester` is not its creator.
    pub fn delete_chat(&self, requester: ClientId, chat_id: ChatId) -> bool {
        let Some((_, chat)) = self
            .chats
            .remove_if(&chat_id, |_, chat| chat.creator_id == requester)
        else {
            debug!(chat = %chat_id, requester = %requester, "Chat delete refused");
            return false;
        };

        // Joins racing with this delete either fail on the missing set or
        // land in `evicted` and get their room cleared below.
        let evicted = self
            .members
            .remove(&chat_id)
            .map(|(_, set)| set)
            .unwrap_or_default();

        for client_id in &evicted {
            if let Some(mut client) = self.clients.get_mut(client_id) {
                if client.chat_id == Some(chat_id) {
                    client.chat_id = None;
                }
            }
        }

        debug!(chat = %chat_id, name = %chat.name, evicted = evicted.len(), "Chat deleted");
        true
    }

    /// Put a client into a chat, leaving its current one first.
    ///
    /// Returns `false` without side effects if the chat or the client is
    /// unknown.
    pub fn join(&self, client_id: ClientId, chat_id: ChatId) -> bool {
        let Some(mut client) = self.clients.get_mut(&client_id) else {
            return false;
        };

        match self.members.get_mut(&chat_id) {
            Some(mut set) => {
                set.insert(client_id);
            }
            None => {
                debug!(client = %client_id, chat = %chat_id, "Join to unknown chat");
                return false;
            }
        }

        if let Some(previous) = client.chat_id.filter(|previous| *previous != chat_id) {
            if let Some(mut set) = self.members.get_mut(&previous) {
                set.remove(&client_id);
            }
        }
        client.chat_id = Some(chat_id);

        debug!(client = %client_id, chat = %chat_id, "Joined");
        true
    }

    /// Take a client out of its current chat. Idempotent.
    pub fn leave(&self, client_id: ClientId) {
        let Some(mut client) = self.clients.get_mut(&client_id) else {
            return;
        };
        let Some(chat_id) = client.chat_id else {
            return;
        };

        if let Some(mut set) = self.members.get_mut(&chat_id) {
            set.remove(&client_id);
            client.chat_id = None;
            debug!(client = %client_id, chat = %chat_id, "Left");
        }
    }

    /// Switch a client to another chat. Same semantics as [`Registry::join`].
    pub fn change_room(&self, client_id: ClientId, chat_id: ChatId) -> bool {
        let from = self.clients.get(&client_id).and_then(|c| c.chat_id);
        debug!(client = %client_id, from = ?from, to = %chat_id, "Changing room");
        self.join(client_id, chat_id)
    }
}
