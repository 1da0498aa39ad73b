//! # roomcast-protocol
//!
//! Message framing and payload types for the Roomcast chat service.
//!
//! Every message on the wire is a [`Msg`] envelope: a request/response
//! identifier plus an opaque payload. Payloads are JSON documents, either a
//! client [`Request`] or a server [`Resp`].
//!
//! ## Example
//!
//! ```rust
//! use roomcast_protocol::{codec, Msg, Request};
//!
//! let payload = codec::encode_payload(&Request::Join { chat_id: 100 }).unwrap();
//! let msg = Msg::new(7, payload);
//!
//! let encoded = codec::encode(&msg).unwrap();
//! let decoded = codec::decode(&encoded).unwrap();
//! assert_eq!(decoded.id, 7);
//! ```

pub mod codec;
pub mod msg;
pub mod payload;

pub use codec::{decode, encode, ProtocolError};
pub use msg::Msg;
pub use payload::{codes, Request, Resp};
