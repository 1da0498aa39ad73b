//! The message envelope.
//!
//! The envelope carries a message identifier chosen by the requester and an
//! opaque payload. Responses reuse the identifier of the request they answer;
//! server-initiated broadcasts reuse the identifier of the request that
//! triggered them.

use serde::{Deserialize, Serialize};

/// A framed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Msg {
    /// Message identifier.
    pub id: i64,
    /// Serialized payload. Never interpreted by the framing layer.
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl Msg {
    /// Create a new message.
    #[must_use]
    pub fn new(id: i64, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn payload_size(&self) -> usize {
        self.data.len()
    }
}
