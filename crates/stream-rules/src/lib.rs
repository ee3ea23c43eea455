//! # Stream Rules Engine
//!
//! Deterministic admission rules for replicated, append-only streams.
//!
//! ## Purpose
//!
//! Every node replicating a stream must reach the same verdict for the same
//! candidate event or inception bundle. The engines here are pure: given
//! the same event, the same [`StreamView`](ports::StreamView) and the same
//! settings snapshot, they return the same verdict on every node.
//!
//! ## Verdicts
//!
//! | Call | Outcome |
//! |------|---------|
//! | `can_add_event` | `NoOp`, `Admissible { verifications, side_effects }`, or `Err` |
//! | `can_create_stream` | `CreateStreamRules`, or `Err` |
//!
//! A verdict never evaluates chain state. It describes the on-chain
//! authorization the host must confirm ([`ChainAuthArgs`](domain::ChainAuthArgs)),
//! the receipt to look up, and the events to cascade into other streams.
//!
//! ```text
//! host ──→ can_add_event(event, view) ──→ verdict
//!   │                                        │
//!   ├── evaluate chain auth ←────────────────┤
//!   ├── append required parent event ←───────┤
//!   └── append event, or compensation on denial
//! ```
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/ - InMemoryStreamView, ValidNodes, StaticChainConfig  │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - StreamRulesApi trait                       │
//! │  ports/outbound.rs - StreamView, NodeRegistry, ... traits       │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/add_event/     - can_add_event, per-payload rule sets   │
//! │  domain/create_stream/ - can_create_stream, per-kind rules      │
//! │  domain/membership.rs  - membership transition state machine    │
//! │  domain/receipts.rs    - EVM and Solana receipt matching        │
//! │  domain/rule_builder.rs - rule pipelines                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! - Time is a parameter (`now_ms`); nothing reads a clock.
//! - No randomness. Collections that influence a verdict are ordered.
//! - No I/O. Ports answer from state the host already holds.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;
pub mod test_utils;

pub use config::{ConfigError, MembershipLimits, OnChainSettings, RulesConfig};
pub use domain::{
    can_add_event, can_create_stream, AddEventOutcome, AddEventParams, AddEventSideEffects,
    AddEventVerifications, ChainAuthArgs, ChainAuthRequirement, CreateStreamParams,
    CreateStreamRules, DerivedEvent, Permission,
};
pub use service::StreamRulesService;
