//! # Member Payload Rules
//!
//! Member payloads are valid in every stream kind.
//!
//! ## Membership
//!
//! ```text
//! node author ──→ parent id ──→ transition ──→ capacity ──→ chain auth
//!                                   │ no change → NoOp
//! ```
//!
//! | Stream | Transition | Chain auth |
//! |--------|------------|------------|
//! | space | base table | Invite / IsSpaceMember / ModifyBanning |
//! | channel | base table | Invite / Read / ModifyBanning (space) |
//! | dm | base + parties | none |
//! | gdm | base + initiator | none |
//! | other | rejected | - |
//!
//! Channel joins also cascade a join of the parent space into the target's
//! user stream.

use shared_types::{
    hash_event, make_user_membership, Address, ErrorCode, KeyFulfillment, KeySolicitation,
    MemberNft, MemberPayload, Membership, MembershipOp, MembershipReason, Pin, ProtocolError,
    ProtocolResult, StreamId, StreamKind,
};

use super::{invalid_argument, transactions, AddEventContext};
use crate::domain::chain_auth::{ChainAuthArgs, Permission};
use crate::domain::membership::{
    base_transition, dm_transition, gdm_transition, required_permission, DmParties, Transition,
};
use crate::domain::rule_builder::AddEventRules;
use crate::domain::verdict::DerivedEvent;

/// Pins a stream may hold.
pub const MAX_PINNED_MESSAGES: usize = 100;

pub(super) fn rules<'a>(ctx: &'a AddEventContext<'a>, payload: &'a MemberPayload) -> AddEventRules<'a> {
    match payload {
        MemberPayload::Membership(membership) => membership_rules(ctx, membership),
        MemberPayload::KeySolicitation(solicitation) => key_solicitation_rules(ctx, solicitation),
        MemberPayload::KeyFulfillment(fulfillment) => AddEventRules::new()
            .check(move || ctx.creator_is_member())
            .check(move || {
                require_sorted(&fulfillment.session_ids)?;
                Ok(true)
            })
            .check(move || fulfillment_matches_solicitation(ctx, fulfillment)),
        MemberPayload::DisplayName(_)
        | MemberPayload::Username(_)
        | MemberPayload::EncryptionAlgorithm(_) => {
            AddEventRules::new().check(move || ctx.creator_is_member())
        }
        MemberPayload::EnsAddress(address) => AddEventRules::new()
            .check(move || ctx.creator_is_member())
            .check(move || {
                validate_ens_address(address)?;
                Ok(true)
            }),
        MemberPayload::Nft(nft) => AddEventRules::new()
            .check(move || ctx.creator_is_member())
            .check(move || {
                validate_nft(nft)?;
                Ok(true)
            }),
        MemberPayload::Pin(pin) => AddEventRules::new()
            .check(move || ctx.creator_is_member())
            .check(move || valid_pin(ctx, pin))
            .require_chain_auth(move || ctx.creator_permission(Permission::PinMessage)),
        MemberPayload::Unpin(unpin) => AddEventRules::new()
            .check(move || ctx.creator_is_member())
            .check(move || is_pinned(ctx, &unpin.event_id))
            .require_chain_auth(move || ctx.creator_permission(Permission::PinMessage)),
        MemberPayload::MemberBlockchainTransaction(transaction) => {
            transactions::member_transaction_rules(ctx, transaction)
        }
    }
}

// =============================================================================
// MEMBERSHIP
// =============================================================================

fn membership_rules<'a>(ctx: &'a AddEventContext<'a>, membership: &'a Membership) -> AddEventRules<'a> {
    let kind = ctx.stream_kind();
    if !matches!(
        kind,
        StreamKind::Space | StreamKind::Channel | StreamKind::DmChannel | StreamKind::GdmChannel
    ) {
        return AddEventRules::fail(
            invalid_argument("invalid stream id for membership payload")
                .tag("stream_id", ctx.stream_id())
                .tag("kind", kind),
        );
    }
    AddEventRules::new()
        .check(move || {
            valid_membership_payload(ctx, membership)?;
            Ok(true)
        })
        .check(move || ctx.creator_is_valid_node())
        .check(move || Ok(membership_transition(ctx, membership)?.applies()))
        .check(move || {
            within_membership_limit(ctx, membership)?;
            Ok(true)
        })
        .require_chain_auth(move || membership_chain_auth(ctx, membership))
        .require_parent_event(move || channel_join_parent_event(ctx, membership))
}

/// Joins must name the stream's parent, when the stream has one.
fn valid_membership_payload(ctx: &AddEventContext<'_>, membership: &Membership) -> ProtocolResult<()> {
    if membership.op != MembershipOp::Join {
        return Ok(());
    }
    match ctx.view().stream_parent_id() {
        Some(parent) if membership.stream_parent_id.as_ref() != Some(parent) => {
            Err(invalid_argument("membership parent id does not match the stream")
                .tag("expected", parent)
                .tag("user", &membership.user_address))
        }
        _ => Ok(()),
    }
}

fn membership_transition(ctx: &AddEventContext<'_>, membership: &Membership) -> ProtocolResult<Transition> {
    let view = ctx.view();
    let current = view.membership(&membership.user_address)?;
    let requested = membership.op;
    match ctx.stream_kind() {
        StreamKind::DmChannel => {
            let inception = view.dm_inception()?;
            let first = Address::from_bytes_lossy(&inception.first_party_address);
            let second = Address::from_bytes_lossy(&inception.second_party_address);
            dm_transition(
                current,
                requested,
                &membership.user_address,
                &membership.initiator_address,
                ctx.is_valid_node(&membership.initiator_address),
                DmParties {
                    first: &first,
                    second: &second,
                },
            )
        }
        StreamKind::GdmChannel => gdm_transition(
            current,
            requested,
            &membership.user_address,
            &membership.initiator_address,
            view.membership(&membership.initiator_address)?,
        ),
        StreamKind::Space | StreamKind::Channel => base_transition(current, requested),
        kind => Err(invalid_argument("invalid stream id for membership payload").tag("kind", kind)),
    }
}

fn within_membership_limit(ctx: &AddEventContext<'_>, membership: &Membership) -> ProtocolResult<()> {
    if !matches!(membership.op, MembershipOp::Join | MembershipOp::Invite) {
        return Ok(());
    }
    let limit = ctx.settings().membership_limits.for_kind(ctx.stream_kind());
    if limit == 0 {
        return Ok(());
    }
    let joined = ctx.view().joined_member_count()?;
    if joined >= limit {
        return Err(invalid_argument("membership limit reached")
            .tag("limit", limit)
            .tag("joined", joined)
            .tag("stream_id", ctx.stream_id()));
    }
    Ok(())
}

fn membership_chain_auth(
    ctx: &AddEventContext<'_>,
    membership: &Membership,
) -> ProtocolResult<Option<ChainAuthArgs>> {
    let kind = ctx.stream_kind();
    if !matches!(kind, StreamKind::Space | StreamKind::Channel) {
        return Ok(None);
    }
    let current = ctx.view().membership(&membership.user_address)?;
    let Some(required) = required_permission(
        current,
        membership.op,
        &membership.user_address,
        &membership.initiator_address,
        ctx.is_valid_node(&membership.initiator_address),
    )?
    else {
        return Ok(None);
    };

    let space_id = ctx.space_id()?.clone();
    let args = match (kind, required.permission) {
        (StreamKind::Space, Permission::Read) => {
            ChainAuthArgs::for_is_space_member(space_id, required.principal)
        }
        (StreamKind::Channel, Permission::Read | Permission::Invite) => ChainAuthArgs::for_channel(
            space_id,
            ctx.stream_id().clone(),
            required.principal,
            required.permission,
        ),
        (_, permission) => ChainAuthArgs::for_space(space_id, required.principal, permission),
    };
    Ok(Some(if required.principal_is_target {
        args.with_app_address(membership.app_address.unwrap_or(Address::ZERO))
    } else {
        args
    }))
}

/// A channel join also records the parent space join in the user stream.
fn channel_join_parent_event(
    ctx: &AddEventContext<'_>,
    membership: &Membership,
) -> ProtocolResult<Option<DerivedEvent>> {
    if ctx.stream_kind() != StreamKind::Channel || membership.op != MembershipOp::Join {
        return Ok(None);
    }
    let space_id = ctx.space_id()?.clone();
    Ok(Some(DerivedEvent::new(
        StreamId::user_stream(&membership.user_address),
        make_user_membership(
            MembershipOp::Join,
            space_id,
            Some(membership.initiator_address),
            None,
            MembershipReason::None,
        ),
    )))
}

// =============================================================================
// KEY EXCHANGE
// =============================================================================

fn key_solicitation_rules<'a>(
    ctx: &'a AddEventContext<'a>,
    solicitation: &'a KeySolicitation,
) -> AddEventRules<'a> {
    let rules = AddEventRules::new()
        .check(move || ctx.creator_is_member())
        .check(move || {
            validate_solicitation_session_ids(&solicitation.session_ids)?;
            Ok(true)
        });
    if ctx.stream_kind() != StreamKind::Channel {
        return rules;
    }
    // Members who lost Read are removed instead of being served keys.
    rules
        .require_chain_auth(move || ctx.creator_permission(Permission::Read))
        .on_chain_auth_failure(move || {
            let space_id = ctx.space_id()?.clone();
            Ok(Some(DerivedEvent::new(
                StreamId::user_stream(ctx.creator()),
                make_user_membership(
                    MembershipOp::Leave,
                    ctx.stream_id().clone(),
                    Some(*ctx.creator()),
                    Some(space_id),
                    MembershipReason::NotEntitled,
                ),
            )))
        })
}

fn validate_solicitation_session_ids(session_ids: &[String]) -> ProtocolResult<()> {
    if session_ids.is_empty() {
        return Err(invalid_argument("session ids are required"));
    }
    if session_ids.iter().any(String::is_empty) {
        return Err(invalid_argument("session ids must not be empty strings"));
    }
    require_sorted(session_ids)
}

fn require_sorted(session_ids: &[String]) -> ProtocolResult<()> {
    if session_ids.windows(2).all(|pair| pair[0] <= pair[1]) {
        Ok(())
    } else {
        Err(invalid_argument("session ids must be sorted"))
    }
}

fn fulfillment_matches_solicitation(
    ctx: &AddEventContext<'_>,
    fulfillment: &KeyFulfillment,
) -> ProtocolResult<bool> {
    if ctx.event().event.ephemeral {
        return Ok(true);
    }
    let solicitations = ctx.view().key_solicitations(&fulfillment.user_address)?;
    let solicitation = solicitations
        .iter()
        .find(|s| s.device_key == fulfillment.device_key)
        .ok_or_else(|| {
            invalid_argument("no key solicitation for device")
                .tag("user", &fulfillment.user_address)
                .tag("device_key", &fulfillment.device_key)
        })?;
    if solicitation.is_new_device
        || sorted_intersect(&solicitation.session_ids, &fulfillment.session_ids)
    {
        return Ok(true);
    }
    Err(
        ProtocolError::new(ErrorCode::NotFound, "no matching session ids in solicitation")
            .tag("device_key", &fulfillment.device_key),
    )
}

fn sorted_intersect(a: &[String], b: &[String]) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => return true,
        }
    }
    false
}

// =============================================================================
// PROFILE
// =============================================================================

/// Empty clears the ENS address.
fn validate_ens_address(address: &[u8]) -> ProtocolResult<()> {
    if address.is_empty() || address.len() == 20 {
        Ok(())
    } else {
        Err(invalid_argument("ens address must be 20 bytes").tag("len", address.len()))
    }
}

/// An empty contract address clears the NFT.
fn validate_nft(nft: &MemberNft) -> ProtocolResult<()> {
    if nft.contract_address.is_empty() {
        return Ok(());
    }
    if nft.contract_address.len() != 20 {
        return Err(invalid_argument("nft contract address must be 20 bytes")
            .tag("len", nft.contract_address.len()));
    }
    if nft.token_id.is_empty() {
        return Err(invalid_argument("nft token id is required"));
    }
    if nft.chain_id == 0 {
        return Err(invalid_argument("nft chain id is required"));
    }
    Ok(())
}

// =============================================================================
// PINS
// =============================================================================

fn valid_pin(ctx: &AddEventContext<'_>, pin: &Pin) -> ProtocolResult<bool> {
    if pin.event_id.len() != 32 {
        return Err(invalid_argument("pinned event id must be 32 bytes").tag("len", pin.event_id.len()));
    }
    let hash = hash_event(&pin.event)?;
    if pin.event_id != hash {
        return Err(invalid_argument("pinned event id does not match the event")
            .tag("event_id", hex::encode(&pin.event_id)));
    }
    let pinned = ctx.view().pinned_messages()?;
    if pinned.len() >= MAX_PINNED_MESSAGES {
        return Err(invalid_argument("too many pinned messages").tag("pinned", pinned.len()));
    }
    if pinned.iter().any(|p| p.event_id == pin.event_id) {
        return Err(
            ProtocolError::new(ErrorCode::AlreadyExists, "message is already pinned")
                .tag("event_id", hex::encode(&pin.event_id)),
        );
    }
    Ok(true)
}

fn is_pinned(ctx: &AddEventContext<'_>, event_id: &[u8]) -> ProtocolResult<bool> {
    if event_id.len() != 32 {
        return Err(invalid_argument("unpinned event id must be 32 bytes").tag("len", event_id.len()));
    }
    if ctx.view().pinned_messages()?.iter().any(|p| p.event_id == event_id) {
        Ok(true)
    } else {
        Err(invalid_argument("message is not pinned").tag("event_id", hex::encode(event_id)))
    }
}
