//! # roomcast-transport
//!
//! Connection abstraction for the Roomcast chat service.
//!
//! The registry never owns a connection's I/O. It holds an
//! `Arc<dyn Connection>` and writes framed messages to it; everything else
//! (sockets, handshakes, framing on the wire) belongs to the code that
//! accepted the connection.
//!
//! ```rust,ignore
//! use roomcast_transport::{ChannelConnection, ConnectionId};
//!
//! let (conn, mut outbound) = ChannelConnection::new(ConnectionId::generate());
//! tokio::spawn(async move {
//!     while let Some(msg) = outbound.recv().await {
//!         // Encode and write to the socket
//!     }
//! });
//! ```

pub mod channel;
pub mod traits;

pub use channel::ChannelConnection;
pub use traits::{Connection, ConnectionId, TransportError};
