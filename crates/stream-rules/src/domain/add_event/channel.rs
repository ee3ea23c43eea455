//! Conversation rules: channel, DM and GDM payloads.

use shared_types::{ChannelPayload, DmChannelPayload, GdmChannelPayload};

use super::{invalid_argument, AddEventContext};
use crate::domain::chain_auth::Permission;
use crate::domain::rule_builder::{AddEventRules, ChainAuthProducer};

pub(super) fn channel_rules<'a>(
    ctx: &'a AddEventContext<'a>,
    payload: &'a ChannelPayload,
) -> AddEventRules<'a> {
    match payload {
        ChannelPayload::Inception(_) => {
            AddEventRules::fail(invalid_argument("channel inception cannot be added"))
        }
        // React alone is enough for reactions.
        ChannelPayload::Message(_) => {
            let write: ChainAuthProducer<'a> =
                Box::new(move || ctx.creator_permission(Permission::Write));
            let react: ChainAuthProducer<'a> =
                Box::new(move || ctx.creator_permission(Permission::React));
            AddEventRules::new()
                .check(move || ctx.creator_is_member())
                .require_one_of_chain_auths(vec![write, react])
        }
        ChannelPayload::Redaction(_) => AddEventRules::new()
            .check(move || ctx.creator_is_member())
            .require_chain_auth(move || ctx.creator_permission(Permission::Redact)),
    }
}

pub(super) fn dm_rules<'a>(
    ctx: &'a AddEventContext<'a>,
    payload: &'a DmChannelPayload,
) -> AddEventRules<'a> {
    match payload {
        DmChannelPayload::Inception(_) => {
            AddEventRules::fail(invalid_argument("dm inception cannot be added"))
        }
        DmChannelPayload::Message(_) => AddEventRules::new().check(move || ctx.creator_is_member()),
    }
}

pub(super) fn gdm_rules<'a>(
    ctx: &'a AddEventContext<'a>,
    payload: &'a GdmChannelPayload,
) -> AddEventRules<'a> {
    match payload {
        GdmChannelPayload::Inception(_) => {
            AddEventRules::fail(invalid_argument("gdm inception cannot be added"))
        }
        GdmChannelPayload::Message(_) | GdmChannelPayload::ChannelProperties(_) => {
            AddEventRules::new().check(move || ctx.creator_is_member())
        }
    }
}
