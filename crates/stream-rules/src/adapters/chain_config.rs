//! A fixed on-chain settings snapshot.

use crate::config::{ConfigError, OnChainSettings};
use crate::ports::outbound::OnChainConfiguration;

/// Serves the same validated [`OnChainSettings`] for every call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticChainConfig {
    settings: OnChainSettings,
}

impl StaticChainConfig {
    pub fn new(settings: OnChainSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self { settings })
    }
}

impl OnChainConfiguration for StaticChainConfig {
    fn get(&self) -> OnChainSettings {
        self.settings.clone()
    }
}
