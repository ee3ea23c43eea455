//! # Shared Types Crate
//!
//! Protocol primitives shared by the stream rules engine and the hosts that
//! embed it.
//!
//! ## Design Principles
//!
//! - **Validated identifiers**: a [`StreamId`] always has a known
//!   [`StreamKind`] and the right length for it.
//! - **Closed payload families**: every payload is a variant of a closed
//!   enum. The only "unknown" states are the ones the wire can carry: a
//!   missing payload and missing transaction content.
//! - **Canonical hashing**: the hash of an event is a pure function of its
//!   content, so every node computes the same id for the same event.

pub mod entities;
pub mod errors;
pub mod events;
pub mod hashing;
pub mod payloads;
pub mod transactions;

pub use entities::*;
pub use errors::*;
pub use events::*;
pub use hashing::{canonical_event_bytes, event_hash, hash_event, keccak256};
pub use payloads::*;
pub use transactions::*;
