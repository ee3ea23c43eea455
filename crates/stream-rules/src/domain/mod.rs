//! # Domain Layer - Stream Rules
//!
//! Pure decision logic. Nothing in this layer performs I/O or reads a
//! clock; every input arrives through the per-call parameter structs.
//!
//! ## Components
//!
//! - `rule_builder`: ordered rule pipelines reduced by a single `run()`
//! - `add_event`: `can_add_event` and the per-payload rule sets
//! - `create_stream`: `can_create_stream` and the per-kind inception rules
//! - `membership`: the membership transition state machine
//! - `receipts`: EVM log and Solana balance matching for transactions
//! - `chain_auth`: on-chain authorization queries
//! - `verdict`: derived events and verdict types

pub mod add_event;
pub mod chain_auth;
pub mod create_stream;
pub mod membership;
pub mod receipts;
pub(crate) mod rule_builder;
pub mod verdict;

pub use add_event::{can_add_event, AddEventParams};
pub use chain_auth::*;
pub use create_stream::{can_create_stream, CreateStreamParams};
pub use membership::*;
pub use verdict::*;
