//! On-chain authorization queries.
//!
//! Rules never evaluate entitlements themselves. They describe what must
//! hold on chain as [`ChainAuthArgs`] and leave evaluation to the host.

use std::fmt;

use serde::{Deserialize, Serialize};
use shared_types::{Address, ProtocolResult, StreamId};

use crate::ports::outbound::{EntitlementEvaluator, EntitlementVerdict};

/// Space and channel permissions as defined by the on-chain registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    Undefined,
    Read,
    Write,
    Invite,
    JoinSpace,
    Redact,
    ModifyBanning,
    PinMessage,
    AddRemoveChannels,
    ModifySpaceSettings,
    React,
    Ownership,
}

impl Permission {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Permission::Undefined => "Undefined",
            Permission::Read => "Read",
            Permission::Write => "Write",
            Permission::Invite => "Invite",
            Permission::JoinSpace => "JoinSpace",
            Permission::Redact => "Redact",
            Permission::ModifyBanning => "ModifyBanning",
            Permission::PinMessage => "PinMessage",
            Permission::AddRemoveChannels => "AddRemoveChannels",
            Permission::ModifySpaceSettings => "ModifySpaceSettings",
            Permission::React => "React",
            Permission::Ownership => "Ownership",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single on-chain authorization query.
///
/// `app_address` is [`Address::ZERO`] unless the principal is acting as a
/// registered app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainAuthArgs {
    Space {
        space_id: StreamId,
        principal: Address,
        permission: Permission,
        app_address: Address,
    },
    Channel {
        space_id: StreamId,
        channel_id: StreamId,
        principal: Address,
        permission: Permission,
        app_address: Address,
    },
    IsSpaceMember {
        space_id: StreamId,
        principal: Address,
        app_address: Address,
    },
    IsWalletLinked {
        principal: Address,
        wallet: Address,
    },
    IsApp {
        principal: Address,
        app_address: Address,
    },
    IsNotApp {
        principal: Address,
    },
}

impl ChainAuthArgs {
    #[must_use]
    pub fn for_space(space_id: StreamId, principal: Address, permission: Permission) -> Self {
        ChainAuthArgs::Space {
            space_id,
            principal,
            permission,
            app_address: Address::ZERO,
        }
    }

    #[must_use]
    pub fn for_channel(
        space_id: StreamId,
        channel_id: StreamId,
        principal: Address,
        permission: Permission,
    ) -> Self {
        ChainAuthArgs::Channel {
            space_id,
            channel_id,
            principal,
            permission,
            app_address: Address::ZERO,
        }
    }

    #[must_use]
    pub fn for_is_space_member(space_id: StreamId, principal: Address) -> Self {
        ChainAuthArgs::IsSpaceMember {
            space_id,
            principal,
            app_address: Address::ZERO,
        }
    }

    #[must_use]
    pub fn for_is_wallet_linked(principal: Address, wallet: Address) -> Self {
        ChainAuthArgs::IsWalletLinked { principal, wallet }
    }

    #[must_use]
    pub fn for_is_app(principal: Address, app_address: Address) -> Self {
        ChainAuthArgs::IsApp {
            principal,
            app_address,
        }
    }

    #[must_use]
    pub fn for_is_not_app(principal: Address) -> Self {
        ChainAuthArgs::IsNotApp { principal }
    }

    /// Scopes a space, channel or space-membership query to an app.
    /// Other queries are returned unchanged.
    #[must_use]
    pub fn with_app_address(mut self, app: Address) -> Self {
        match &mut self {
            ChainAuthArgs::Space { app_address, .. }
            | ChainAuthArgs::Channel { app_address, .. }
            | ChainAuthArgs::IsSpaceMember { app_address, .. } => *app_address = app,
            _ => {}
        }
        self
    }

    #[must_use]
    pub fn principal(&self) -> &Address {
        match self {
            ChainAuthArgs::Space { principal, .. }
            | ChainAuthArgs::Channel { principal, .. }
            | ChainAuthArgs::IsSpaceMember { principal, .. }
            | ChainAuthArgs::IsWalletLinked { principal, .. }
            | ChainAuthArgs::IsApp { principal, .. }
            | ChainAuthArgs::IsNotApp { principal } => principal,
        }
    }

    #[must_use]
    pub fn permission(&self) -> Option<Permission> {
        match self {
            ChainAuthArgs::Space { permission, .. } | ChainAuthArgs::Channel { permission, .. } => {
                Some(*permission)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ChainAuthArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainAuthArgs::Space {
                space_id,
                principal,
                permission,
                ..
            } => write!(f, "space({space_id}, {principal}, {permission})"),
            ChainAuthArgs::Channel {
                channel_id,
                principal,
                permission,
                ..
            } => write!(f, "channel({channel_id}, {principal}, {permission})"),
            ChainAuthArgs::IsSpaceMember {
                space_id,
                principal,
                ..
            } => write!(f, "is_space_member({space_id}, {principal})"),
            ChainAuthArgs::IsWalletLinked { principal, wallet } => {
                write!(f, "is_wallet_linked({principal}, {wallet})")
            }
            ChainAuthArgs::IsApp {
                principal,
                app_address,
            } => write!(f, "is_app({principal}, {app_address})"),
            ChainAuthArgs::IsNotApp { principal } => write!(f, "is_not_app({principal})"),
        }
    }
}

/// The chain authorization an add-event verdict requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainAuthRequirement {
    /// Every query must be allowed.
    All(Vec<ChainAuthArgs>),
    /// At least one query must be allowed.
    OneOf(Vec<ChainAuthArgs>),
}

impl ChainAuthRequirement {
    #[must_use]
    pub fn args(&self) -> &[ChainAuthArgs] {
        match self {
            ChainAuthRequirement::All(args) | ChainAuthRequirement::OneOf(args) => args,
        }
    }

    /// Resolves the requirement against an evaluator. For `All` the first
    /// denial is returned; for `OneOf` the first allowance, else the last
    /// denial.
    pub fn evaluate(&self, evaluator: &dyn EntitlementEvaluator) -> ProtocolResult<EntitlementVerdict> {
        match self {
            ChainAuthRequirement::All(args) => {
                for arg in args {
                    let verdict = evaluator.evaluate(arg)?;
                    if !verdict.allowed {
                        return Ok(verdict);
                    }
                }
                Ok(EntitlementVerdict::allowed())
            }
            ChainAuthRequirement::OneOf(args) => {
                let mut last = EntitlementVerdict::denied("no chain auth alternatives");
                for arg in args {
                    let verdict = evaluator.evaluate(arg)?;
                    if verdict.allowed {
                        return Ok(verdict);
                    }
                    last = verdict;
                }
                Ok(last)
            }
        }
    }
}
