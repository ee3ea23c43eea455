//! Ports (hexagonal architecture boundary).

pub mod inbound;
pub mod outbound;

pub use inbound::StreamRulesApi;
pub use outbound::{
    EntitlementEvaluator, EntitlementVerdict, NodeRegistry, OnChainConfiguration, PinnedMessage,
    StreamView,
};
