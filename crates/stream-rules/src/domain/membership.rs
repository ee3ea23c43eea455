//! # Membership Transition State Machine
//!
//! Shared by the event-addition and stream-creation engines.
//!
//! ## Base Table
//!
//! | current | requested | result |
//! |---------|-----------|--------|
//! | any | UNSPECIFIED | `INVALID_ARGUMENT` |
//! | X | X | no-op |
//! | INVITE | JOIN, LEAVE | apply |
//! | JOIN | LEAVE | apply |
//! | JOIN | INVITE | `PERMISSION_DENIED` |
//! | LEAVE | INVITE, JOIN | apply |
//! | UNSPECIFIED | LEAVE | no-op |
//! | UNSPECIFIED | INVITE, JOIN | apply |
//!
//! DM and GDM streams layer party and initiator checks on top of the base
//! table. The functions here are pure over values; the caller reads the
//! current state from the stream view.

use shared_types::{Address, ErrorCode, MembershipOp, MembershipReason, ProtocolError, ProtocolResult};

use super::chain_auth::Permission;

/// Whether a requested membership change has any effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Apply,
    NoOp,
}

impl Transition {
    #[must_use]
    pub fn applies(self) -> bool {
        self == Transition::Apply
    }
}

fn denied(message: &'static str, current: MembershipOp, requested: MembershipOp) -> ProtocolError {
    ProtocolError::new(ErrorCode::PermissionDenied, message)
        .tag("current", current)
        .tag("requested", requested)
}

/// The base transition table.
pub fn base_transition(current: MembershipOp, requested: MembershipOp) -> ProtocolResult<Transition> {
    use shared_types::MembershipOp::{Invite, Join, Leave, Unspecified};

    match (current, requested) {
        (_, Unspecified) => Err(ProtocolError::new(
            ErrorCode::InvalidArgument,
            "membership op is unspecified",
        )
        .tag("current", current)),
        (c, r) if c == r => Ok(Transition::NoOp),
        (Invite, _) => Ok(Transition::Apply),
        (Join, Leave) => Ok(Transition::Apply),
        (Join, _) => Err(denied("member cannot be invited", current, requested)),
        (Leave, _) => Ok(Transition::Apply),
        (Unspecified, Leave) => Ok(Transition::NoOp),
        (Unspecified, _) => Ok(Transition::Apply),
    }
}

/// The two fixed parties of a DM.
#[derive(Debug, Clone, Copy)]
pub struct DmParties<'a> {
    pub first: &'a Address,
    pub second: &'a Address,
}

impl DmParties<'_> {
    fn contains(&self, address: &Address) -> bool {
        address == self.first || address == self.second
    }
}

/// DM transitions: only the parties (or a node) may act, only the parties
/// may be targeted, and only JOIN and LEAVE exist.
pub fn dm_transition(
    current: MembershipOp,
    requested: MembershipOp,
    user: &Address,
    initiator: &Address,
    initiator_is_node: bool,
    parties: DmParties<'_>,
) -> ProtocolResult<Transition> {
    if base_transition(current, requested)? == Transition::NoOp {
        return Ok(Transition::NoOp);
    }
    if !initiator_is_node && !parties.contains(initiator) {
        return Err(denied("initiator is not a dm party", current, requested)
            .tag("initiator", initiator));
    }
    if !parties.contains(user) {
        return Err(denied("user is not a dm party", current, requested).tag("user", user));
    }
    match requested {
        MembershipOp::Join | MembershipOp::Leave => Ok(Transition::Apply),
        _ => Err(denied("dm membership only supports join and leave", current, requested)),
    }
}

/// GDM transitions: membership changes are driven by existing members.
pub fn gdm_transition(
    current: MembershipOp,
    requested: MembershipOp,
    user: &Address,
    initiator: &Address,
    initiator_membership: MembershipOp,
) -> ProtocolResult<Transition> {
    if base_transition(current, requested)? == Transition::NoOp {
        return Ok(Transition::NoOp);
    }
    let initiator_present = matches!(initiator_membership, MembershipOp::Join | MembershipOp::Invite);
    match requested {
        MembershipOp::Invite | MembershipOp::Leave if !initiator_present => Err(denied(
            "initiator is not a member of the group",
            current,
            requested,
        )
        .tag("initiator", initiator)),
        MembershipOp::Join if current == MembershipOp::Invite => Ok(Transition::Apply),
        MembershipOp::Join if initiator == user => Err(denied(
            "user must be invited to join the group",
            current,
            requested,
        )),
        MembershipOp::Join if initiator_membership != MembershipOp::Join => Err(denied(
            "initiator is not a joined member of the group",
            current,
            requested,
        )
        .tag("initiator", initiator)),
        _ => Ok(Transition::Apply),
    }
}

/// User-stream membership records: a reason may only accompany a LEAVE
/// written by a node.
pub fn user_membership_transition(
    current: MembershipOp,
    requested: MembershipOp,
    reason: MembershipReason,
    creator_is_node: bool,
) -> ProtocolResult<Transition> {
    if requested == MembershipOp::Unspecified {
        return base_transition(current, requested);
    }
    if current == requested {
        return Ok(Transition::NoOp);
    }
    if reason != MembershipReason::None && (requested != MembershipOp::Leave || !creator_is_node) {
        return Err(denied("membership reason is only allowed on node leaves", current, requested)
            .tag("reason", format!("{reason:?}")));
    }
    base_transition(current, requested)
}

/// The entitlement a membership change requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredPermission {
    pub permission: Permission,
    pub principal: Address,
    /// Whether the principal is the membership target, in which case the
    /// target's app address scopes the query.
    pub principal_is_target: bool,
}

/// Maps a membership change onto the permission its initiator or target
/// must hold. `None` means no chain check.
pub fn required_permission(
    current: MembershipOp,
    requested: MembershipOp,
    user: &Address,
    initiator: &Address,
    initiator_is_node: bool,
) -> ProtocolResult<Option<RequiredPermission>> {
    match requested {
        MembershipOp::Invite => {
            if current == MembershipOp::Join {
                return Err(ProtocolError::new(
                    ErrorCode::FailedPrecondition,
                    "user is already a member",
                )
                .tag("user", user));
            }
            Ok(Some(RequiredPermission {
                permission: Permission::Invite,
                principal: *initiator,
                principal_is_target: initiator == user,
            }))
        }
        MembershipOp::Join => Ok(Some(RequiredPermission {
            permission: Permission::Read,
            principal: *user,
            principal_is_target: true,
        })),
        MembershipOp::Leave => {
            if initiator != user && !initiator_is_node {
                Ok(Some(RequiredPermission {
                    permission: Permission::ModifyBanning,
                    principal: *initiator,
                    principal_is_target: false,
                }))
            } else {
                Ok(None)
            }
        }
        MembershipOp::Unspecified => Err(ProtocolError::new(
            ErrorCode::InvalidArgument,
            "membership op is unspecified",
        )),
    }
}
