//! Engine configuration.
//!
//! [`RulesConfig`] holds node-local switches. [`OnChainSettings`] is the
//! snapshot of network-wide tunables a host reads from the on-chain
//! configuration registry; every node must see the same snapshot for the
//! same block, which is what keeps verdicts identical across nodes.

use serde::{Deserialize, Serialize};
use shared_types::StreamKind;
use thiserror::Error;

/// Node-local engine switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Skip base-chain entitlement requirements when creating user streams.
    pub disable_base_chain: bool,
    /// Require DM and GDM creators to not be registered apps.
    pub require_non_app_dm_creators: bool,
    /// Valid metadata shard numbers are those with no bits outside this mask.
    pub metadata_shard_mask: u64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            disable_base_chain: false,
            require_non_app_dm_creators: false,
            metadata_shard_mask: 0xff,
        }
    }
}

impl RulesConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metadata_shard_mask == 0 {
            return Err(ConfigError::EmptyShardMask);
        }
        Ok(())
    }
}

/// Maximum joined members per stream kind. `0` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MembershipLimits {
    pub space: usize,
    pub channel: usize,
    pub dm: usize,
    pub gdm: usize,
}

impl Default for MembershipLimits {
    fn default() -> Self {
        Self {
            space: 0,
            channel: 0,
            dm: 2,
            gdm: 48,
        }
    }
}

impl MembershipLimits {
    #[must_use]
    pub fn for_kind(&self, kind: StreamKind) -> usize {
        match kind {
            StreamKind::Space => self.space,
            StreamKind::Channel => self.channel,
            StreamKind::DmChannel => self.dm,
            StreamKind::GdmChannel => self.gdm,
            _ => 0,
        }
    }
}

/// Network-wide tunables read from the on-chain configuration registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnChainSettings {
    /// Maximum size in bytes of a single media chunk.
    pub media_max_chunk_size: usize,
    /// Maximum number of chunks a media stream may declare.
    pub media_max_chunk_count: i32,
    pub membership_limits: MembershipLimits,
}

impl Default for OnChainSettings {
    fn default() -> Self {
        Self {
            media_max_chunk_size: 500_000,
            media_max_chunk_count: 50,
            membership_limits: MembershipLimits::default(),
        }
    }
}

impl OnChainSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.media_max_chunk_size == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "media_max_chunk_size",
            });
        }
        if self.media_max_chunk_count <= 0 {
            return Err(ConfigError::ZeroLimit {
                field: "media_max_chunk_count",
            });
        }
        if self.membership_limits.dm == 1 {
            return Err(ConfigError::DmLimitTooSmall);
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    ZeroLimit { field: &'static str },

    #[error("metadata_shard_mask must allow at least one bit")]
    EmptyShardMask,

    /// A DM always has two parties.
    #[error("membership_limits.dm must be 0 (unlimited) or at least 2")]
    DmLimitTooSmall,
}
