//! Chat and client identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Default distance between two consecutive identifiers.
pub const DEFAULT_ID_STEP: i64 = 100;

/// Largest step a generator accepts.
pub const MAX_ID_STEP: i64 = 1 << 20;

/// Largest chat id [`IdGenerator::observe_chat_id`] accepts.
///
/// Leaves at least `2^42` ids after any observed id, even at [`MAX_ID_STEP`].
pub const MAX_OBSERVED_ID: i64 = i64::MAX / 2;

/// A chat identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

/// A client identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues chat and client identifiers from two independent sequences.
///
/// Each sequence is strictly increasing in call order and never repeats,
/// regardless of how many threads call into it.
#[derive(Debug)]
pub struct IdGenerator {
    chat: AtomicI64,
    client: AtomicI64,
    step: i64,
}

impl IdGenerator {
    /// Create a generator with the default step.
    #[must_use]
    pub fn new() -> Self {
        Self::with_step(DEFAULT_ID_STEP)
    }

    /// Create a generator with a custom step, clamped to `1..=MAX_ID_STEP`.
    #[must_use]
    pub fn with_step(step: i64) -> Self {
        Self {
            chat: AtomicI64::new(0),
            client: AtomicI64::new(0),
            step: step.clamp(1, MAX_ID_STEP),
        }
    }

    /// The configured step.
    #[must_use]
    pub fn step(&self) -> i64 {
        self.step
    }

    /// Next chat identifier.
    pub fn next_chat_id(&self) -> ChatId {
        ChatId(advance(&self.chat, self.step))
    }

    /// Next client identifier.
    pub fn next_client_id(&self) -> ClientId {
        ClientId(advance(&self.client, self.step))
    }

    /// Make sure every future chat identifier is greater than `id`.
    ///
    /// Returns `false` and leaves the sequence alone if `id` is above
    /// [`MAX_OBSERVED_ID`].
    pub fn observe_chat_id(&self, id: ChatId) -> bool {
        if id.0 > MAX_OBSERVED_ID {
            return false;
        }
        self.chat.fetch_max(id.0, Ordering::SeqCst);
        true
    }
}

/// Add `step` to the sequence and return the new value.
///
/// Saturates at `i64::MAX` instead of wrapping. With observed ids capped at
/// [`MAX_OBSERVED_ID`] that point is never reached in practice.
fn advance(seq: &AtomicI64, step: i64) -> i64 {
    let prev = seq
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
            Some(cur.saturating_add(step))
        })
        .unwrap_or_else(|cur| cur);
    prev.saturating_add(step)
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_first_ids_equal_step() {
        let ids = IdGenerator::new();
        assert_eq!(ids.next_chat_id(), ChatId(100));
        assert_eq!(ids.next_chat_id(), ChatId(200));
        // Independent sequence
        assert_eq!(ids.next_client_id(), ClientId(100));
    }

    #[test]
    fn test_step_is_clamped() {
        let ids = IdGenerator::with_step(0);
        assert_eq!(ids.step(), 1);
        assert_eq!(ids.next_client_id(), ClientId(1));
        assert_eq!(ids.next_client_id(), ClientId(2));

        assert_eq!(IdGenerator::with_step(i64::MAX).step(), MAX_ID_STEP);
    }

    #[test]
    fn test_observe_rejects_ids_near_the_limit() {
        let ids = IdGenerator::new();
        assert!(!ids.observe_chat_id(ChatId(i64::MAX - 10)));
        assert_eq!(ids.next_chat_id(), ChatId(100));

        assert!(ids.observe_chat_id(ChatId(MAX_OBSERVED_ID)));
        let next = ids.next_chat_id();
        assert!(next.0 > MAX_OBSERVED_ID);
        assert!(ids.next_chat_id() > next);
    }

    #[test]
    fn test_exhausted_sequence_saturates() {
        let ids = IdGenerator {
            chat: AtomicI64::new(i64::MAX - 150),
            client: AtomicI64::new(0),
            step: DEFAULT_ID_STEP,
        };
        assert_eq!(ids.next_chat_id(), ChatId(i64::MAX - 50));
        assert_eq!(ids.next_chat_id(), ChatId(i64::MAX));
        assert_eq!(ids.next_chat_id(), ChatId(i64::MAX));
    }

    #[test]
    fn test_observe_chat_id() {
        let ids = IdGenerator::new();
        ids.observe_chat_id(ChatId(1_050));
        assert_eq!(ids.next_chat_id(), ChatId(1_150));

        // Observing a smaller id never moves the sequence back
        ids.observe_chat_id(ChatId(10));
        assert_eq!(ids.next_chat_id(), ChatId(1_250));
    }

    #[test]
    fn test_concurrent_ids_are_unique_and_increasing() {
        let ids = Arc::new(IdGenerator::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || {
                    (0..1_000)
                        .map(|_| (ids.next_chat_id(), ids.next_client_id()))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut chats = HashSet::new();
        let mut clients = HashSet::new();
        for handle in handles {
            let seen = handle.join().unwrap();
            for pair in seen.windows(2) {
                assert!(pair[0].0 < pair[1].0);
                assert!(pair[0].1 < pair[1].1);
            }
            for (chat, client) in seen {
                assert!(chats.insert(chat));
                assert!(clients.insert(client));
            }
        }
        assert_eq!(chats.len(), 8_000);
        assert_eq!(clients.len(), 8_000);
    }
}
