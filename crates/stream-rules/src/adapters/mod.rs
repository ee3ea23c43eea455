//! Adapters layer: in-crate implementations of the outbound ports.
//!
//! - `memory_view`: [`InMemoryStreamView`], a [`StreamView`] folded from events
//! - `nodes`: [`ValidNodes`], an ordered node and operator registry
//! - `chain_config`: [`StaticChainConfig`], a fixed on-chain settings snapshot
//!
//! [`StreamView`]: crate::ports::StreamView

pub mod chain_config;
pub mod memory_view;
pub mod nodes;

pub use chain_config::StaticChainConfig;
pub use memory_view::InMemoryStreamView;
pub use nodes::ValidNodes;
