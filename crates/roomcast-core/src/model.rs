//! Chat and client records.

use crate::id::{ChatId, ClientId};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A chat room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    /// Chat ID.
    pub id: ChatId,
    /// Room name. Not required to be unique.
    pub name: String,
    /// Display name of the creator at creation time.
    pub creator: String,
    /// The only client allowed to delete this chat.
    pub creator_id: ClientId,
    /// Creation time, Unix milliseconds.
    pub created_at: u64,
}

/// A participant bound to one live connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Client ID.
    pub id: ClientId,
    /// Display name, empty until the client sets one.
    pub name: String,
    /// The chat this client is currently in.
    pub chat_id: Option<ChatId>,
}

impl Client {
    /// Create a client that is in no chat.
    #[must_use]
    pub fn new(id: ClientId) -> Self {
        Self {
            id,
            name: String::new(),
            chat_id: None,
        }
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
