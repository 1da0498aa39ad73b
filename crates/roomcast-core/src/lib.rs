//! # roomcast-core
//!
//! Room registry for the Roomcast chat service.
//!
//! This crate owns all shared state of a running server:
//!
//! - **Identity** - Monotonic chat and client identifiers
//! - **Registry** - Chat, membership, client and connection tables
//! - **Membership** - Create, delete, join, leave and change room
//! - **Broadcast** - Reply to one client or fan out to a whole room
//! - **Lifecycle** - Bind connections to clients and clean up on disconnect
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Connection │────▶│  Lifecycle  │────▶│  Registry   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                                           ▲         │
//!                     ┌─────────────┐       │         ▼
//!                     │ Membership  │───────┘  ┌─────────────┐
//!                     └─────────────┘          │  Broadcast  │
//!                                              └─────────────┘
//! ```
//!
//! A client belongs to at most one chat at a time. Only the creator of a
//! chat may delete it, and deleting a chat evicts all of its members.

pub mod broadcast;
pub mod id;
pub mod lifecycle;
pub mod membership;
pub mod model;
pub mod registry;

#[cfg(test)]
mod test_support;

pub use id::{ChatId, ClientId, IdGenerator, DEFAULT_ID_STEP, MAX_ID_STEP, MAX_OBSERVED_ID};
pub use model::{Chat, Client};
pub use registry::{Registry, RegistryConfig, RegistryStats};
