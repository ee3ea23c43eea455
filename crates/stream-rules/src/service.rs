//! # Stream Rules Service
//!
//! Implements [`StreamRulesApi`] over the domain engines.
//!
//! The service owns the node-local [`RulesConfig`] and reads a fresh
//! [`OnChainSettings`](crate::config::OnChainSettings) snapshot from the
//! on-chain configuration port on every call, so a settings change applies
//! to the next verdict.

use std::collections::BTreeMap;

use shared_types::{ParsedEvent, ProtocolResult, StreamId};

use crate::config::{ConfigError, RulesConfig};
use crate::domain::{
    can_add_event, can_create_stream, AddEventOutcome, AddEventParams, CreateStreamParams,
    CreateStreamRules,
};
use crate::ports::{NodeRegistry, OnChainConfiguration, StreamRulesApi, StreamView};

/// Rules engine bound to its configuration and registries.
///
/// # Example
///
/// ```rust,ignore
/// use stream_rules::adapters::{StaticChainConfig, ValidNodes};
/// use stream_rules::service::StreamRulesService;
///
/// let service = StreamRulesService::new(
///     RulesConfig::default(),
///     StaticChainConfig::default(),
///     ValidNodes::new([node_address]),
/// )?;
/// let outcome = service.can_add_event(&event, &view, now_ms)?;
/// ```
pub struct StreamRulesService<C, N>
where
    C: OnChainConfiguration,
    N: NodeRegistry,
{
    config: RulesConfig,
    chain_config: C,
    nodes: N,
}

impl<C, N> StreamRulesService<C, N>
where
    C: OnChainConfiguration,
    N: NodeRegistry,
{
    pub fn new(config: RulesConfig, chain_config: C, nodes: N) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            chain_config,
            nodes,
        })
    }

    #[must_use]
    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    #[must_use]
    pub fn nodes(&self) -> &N {
        &self.nodes
    }
}

impl<C, N> StreamRulesApi for StreamRulesService<C, N>
where
    C: OnChainConfiguration,
    N: NodeRegistry,
{
    fn can_add_event(
        &self,
        event: &ParsedEvent,
        view: &dyn StreamView,
        now_ms: u64,
    ) -> ProtocolResult<AddEventOutcome> {
        let settings = self.chain_config.get();
        can_add_event(AddEventParams {
            config: &self.config,
            settings: &settings,
            nodes: &self.nodes,
            now_ms,
            event,
            view,
        })
    }

    fn can_create_stream(
        &self,
        stream_id: &StreamId,
        events: &[ParsedEvent],
        metadata: &BTreeMap<String, Vec<u8>>,
        now_ms: u64,
    ) -> ProtocolResult<CreateStreamRules> {
        let settings = self.chain_config.get();
        can_create_stream(CreateStreamParams {
            config: &self.config,
            settings: &settings,
            nodes: &self.nodes,
            now_ms,
            stream_id,
            events,
            metadata,
        })
    }
}
