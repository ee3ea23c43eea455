//! User-scoped stream rules: user, user metadata, user settings and inbox.

use shared_types::{
    make_member_membership, make_user_membership, Address, ErrorCode, MembershipOp,
    MembershipReason, ProtocolError, ProtocolResult, StreamId, StreamKind, UserInboxPayload,
    UserMembership, UserMembershipAction, UserMetadataPayload, UserPayload, UserSettingsPayload,
};

use super::{invalid_argument, transactions, AddEventContext};
use crate::domain::chain_auth::{ChainAuthArgs, Permission};
use crate::domain::membership::user_membership_transition;
use crate::domain::rule_builder::{AddEventRules, Check};
use crate::domain::verdict::DerivedEvent;

pub(super) fn user_rules<'a>(ctx: &'a AddEventContext<'a>, payload: &'a UserPayload) -> AddEventRules<'a> {
    match payload {
        UserPayload::Inception(_) => AddEventRules::fail(invalid_argument("user inception cannot be added")),
        UserPayload::UserMembership(membership) => user_membership_rules(ctx, membership),
        UserPayload::UserMembershipAction(action) => AddEventRules::new()
            .check(move || ctx.creator_is_member())
            .require_parent_event(move || Ok(Some(membership_action_parent_event(ctx, action)))),
        UserPayload::BlockchainTransaction(transaction) => {
            transactions::user_transaction_rules(ctx, transaction)
        }
        UserPayload::ReceivedBlockchainTransaction(received) => {
            transactions::received_transaction_rules(ctx, received)
        }
    }
}

pub(super) fn user_metadata_rules<'a>(
    ctx: &'a AddEventContext<'a>,
    payload: &'a UserMetadataPayload,
) -> AddEventRules<'a> {
    match payload {
        UserMetadataPayload::Inception(_) => {
            AddEventRules::fail(invalid_argument("user metadata inception cannot be added"))
        }
        UserMetadataPayload::EncryptionDevice(_)
        | UserMetadataPayload::ProfileImage(_)
        | UserMetadataPayload::Bio(_) => AddEventRules::new().check(move || ctx.creator_is_member()),
    }
}

pub(super) fn user_settings_rules<'a>(
    ctx: &'a AddEventContext<'a>,
    payload: &'a UserSettingsPayload,
) -> AddEventRules<'a> {
    match payload {
        UserSettingsPayload::Inception(_) => {
            AddEventRules::fail(invalid_argument("user settings inception cannot be added"))
        }
        UserSettingsPayload::FullyReadMarkers(_) | UserSettingsPayload::UserBlock(_) => {
            AddEventRules::new().check(move || ctx.creator_is_member())
        }
    }
}

pub(super) fn user_inbox_rules<'a>(
    ctx: &'a AddEventContext<'a>,
    payload: &'a UserInboxPayload,
) -> AddEventRules<'a> {
    match payload {
        UserInboxPayload::Inception(_) => {
            AddEventRules::fail(invalid_argument("user inbox inception cannot be added"))
        }
        // Anyone may deliver keys to a user's devices.
        UserInboxPayload::GroupEncryptionSessions(_) => AddEventRules::new(),
        UserInboxPayload::Ack(_) => AddEventRules::new().check(move || ctx.creator_is_member()),
    }
}

// =============================================================================
// USER MEMBERSHIP
// =============================================================================

fn user_membership_rules<'a>(
    ctx: &'a AddEventContext<'a>,
    membership: &'a UserMembership,
) -> AddEventRules<'a> {
    let member: Check<'a> = Box::new(move || ctx.creator_is_member());
    let node: Check<'a> = Box::new(move || ctx.creator_is_valid_node());
    AddEventRules::new()
        .check_one_of(vec![member, node])
        .check(move || {
            let current = ctx.view().user_membership(&membership.stream_id)?;
            let transition = user_membership_transition(
                current,
                membership.op,
                membership.reason,
                ctx.is_valid_node(ctx.creator()),
            )?;
            Ok(transition.applies())
        })
        .check(move || app_may_join(ctx, membership))
        .require_chain_auth(move || app_membership_chain_auth(ctx, membership))
        .require_parent_event(move || user_membership_parent_event(ctx, membership).map(Some))
}

/// Apps never join DMs or GDMs.
fn app_may_join(ctx: &AddEventContext<'_>, membership: &UserMembership) -> ProtocolResult<bool> {
    let conversation = matches!(
        membership.stream_id.kind(),
        StreamKind::DmChannel | StreamKind::GdmChannel
    );
    if conversation && membership.op == MembershipOp::Join && ctx.view().is_app_user()? {
        return Ok(false);
    }
    Ok(true)
}

fn inviter(ctx: &AddEventContext<'_>, membership: &UserMembership) -> Address {
    if ctx.is_valid_node(ctx.creator()) {
        membership.inviter.unwrap_or(*ctx.creator())
    } else {
        *ctx.creator()
    }
}

/// Apps are added to spaces and channels by their owners, except for
/// node-initiated removals.
fn app_membership_chain_auth(
    ctx: &AddEventContext<'_>,
    membership: &UserMembership,
) -> ProtocolResult<Option<ChainAuthArgs>> {
    if !ctx.view().is_app_user()? {
        return Ok(None);
    }
    if membership.op == MembershipOp::Leave && ctx.is_valid_node(ctx.creator()) {
        return Ok(None);
    }
    let owner = inviter(ctx, membership);
    let args = match membership.stream_id.kind() {
        StreamKind::Space => {
            ChainAuthArgs::for_space(membership.stream_id.clone(), owner, Permission::Ownership)
        }
        StreamKind::Channel => {
            let space_id = membership.stream_parent_id.clone().ok_or_else(|| {
                ProtocolError::new(ErrorCode::BadStreamId, "channel membership has no parent space")
                    .tag("stream_id", &membership.stream_id)
            })?;
            ChainAuthArgs::for_channel(
                space_id,
                membership.stream_id.clone(),
                owner,
                Permission::Ownership,
            )
        }
        kind => {
            return Err(ProtocolError::new(
                ErrorCode::BadStreamId,
                "apps can only be members of spaces and channels",
            )
            .tag("kind", kind))
        }
    };
    Ok(Some(args))
}

/// The membership change mirrored into the target stream.
fn user_membership_parent_event(
    ctx: &AddEventContext<'_>,
    membership: &UserMembership,
) -> ProtocolResult<DerivedEvent> {
    let user = ctx.stream_id().embedded_address()?;
    let app_address = ctx.view().user_inception()?.app_address;
    Ok(DerivedEvent::new(
        membership.stream_id.clone(),
        make_member_membership(
            membership.op,
            user,
            inviter(ctx, membership),
            membership.stream_parent_id.clone(),
            membership.reason,
            app_address,
        ),
    ))
}

/// The owner acting on someone else: recorded in the target's user stream.
fn membership_action_parent_event(ctx: &AddEventContext<'_>, action: &UserMembershipAction) -> DerivedEvent {
    DerivedEvent::new(
        StreamId::user_stream(&action.user_id),
        make_user_membership(
            action.op,
            action.stream_id.clone(),
            Some(*ctx.creator()),
            action.stream_parent_id.clone(),
            MembershipReason::None,
        ),
    )
}
