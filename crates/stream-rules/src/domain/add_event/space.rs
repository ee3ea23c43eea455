//! Space stream rules: channel lifecycle records, channel settings and the
//! space image.

use shared_types::{ChannelOp, ChannelUpdate, ErrorCode, ProtocolError, ProtocolResult, SpacePayload, StreamId};

use super::{invalid_argument, AddEventContext};
use crate::domain::chain_auth::Permission;
use crate::domain::rule_builder::AddEventRules;

pub(super) fn rules<'a>(ctx: &'a AddEventContext<'a>, payload: &'a SpacePayload) -> AddEventRules<'a> {
    match payload {
        SpacePayload::Inception(_) => {
            AddEventRules::fail(invalid_argument("space inception cannot be added"))
        }
        SpacePayload::Channel(update) => {
            let rules = if update.op == ChannelOp::Updated {
                AddEventRules::new().check(move || ctx.creator_is_member())
            } else {
                AddEventRules::new().check(move || ctx.creator_is_valid_node())
            };
            rules.check(move || valid_space_channel_op(ctx, update))
        }
        SpacePayload::UpdateChannelAutojoin(update) => {
            channel_setting_rules(ctx, &update.channel_id)
        }
        SpacePayload::UpdateChannelHideUserJoinLeaveEvents(update) => {
            channel_setting_rules(ctx, &update.channel_id)
        }
        SpacePayload::SpaceImage(_) => AddEventRules::new()
            .check(move || ctx.creator_is_member())
            .require_chain_auth(move || ctx.creator_permission(Permission::ModifySpaceSettings)),
    }
}

fn channel_setting_rules<'a>(ctx: &'a AddEventContext<'a>, channel_id: &'a StreamId) -> AddEventRules<'a> {
    AddEventRules::new()
        .check(move || ctx.creator_is_member())
        .check(move || channel_exists(ctx, channel_id))
        .require_chain_auth(move || ctx.creator_permission(Permission::AddRemoveChannels))
}

fn channel_exists(ctx: &AddEventContext<'_>, channel_id: &StreamId) -> ProtocolResult<bool> {
    if ctx.view().channel_info(channel_id)?.is_some() {
        Ok(true)
    } else {
        Err(ProtocolError::new(ErrorCode::NotFound, "channel not found in space")
            .tag("channel_id", channel_id)
            .tag("space_id", ctx.stream_id()))
    }
}

/// A channel the space has never seen can only be created; a deleted
/// channel is final; creating an existing channel again changes nothing.
fn valid_space_channel_op(ctx: &AddEventContext<'_>, update: &ChannelUpdate) -> ProtocolResult<bool> {
    match ctx.view().channel_info(&update.channel_id)? {
        None => Ok(update.op == ChannelOp::Created),
        Some(existing) if existing.op == ChannelOp::Deleted => Err(ProtocolError::new(
            ErrorCode::PermissionDenied,
            "channel has been deleted",
        )
        .tag("channel_id", &update.channel_id)
        .tag("op", update.op)),
        Some(_) => Ok(update.op != ChannelOp::Created),
    }
}
