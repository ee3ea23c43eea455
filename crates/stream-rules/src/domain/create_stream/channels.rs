//! Space, channel, DM and GDM creation.

use shared_types::{
    make_space_channel, make_user_membership, Address, ChannelInception, ChannelOp,
    DmChannelInception, MembershipOp, MembershipReason, ProtocolResult, StreamId, StreamKind,
};

use super::{bad_params, CreateStreamContext};
use crate::domain::chain_auth::{ChainAuthArgs, Permission};
use crate::domain::rule_builder::CreateStreamRuleSet;
use crate::domain::verdict::DerivedEvent;

/// The creator's own record of joining `stream_id`.
fn user_join(user: Address, stream_id: StreamId, inviter: Address, parent: Option<StreamId>) -> DerivedEvent {
    DerivedEvent::new(
        StreamId::user_stream(&user),
        make_user_membership(
            MembershipOp::Join,
            stream_id,
            Some(inviter),
            parent,
            MembershipReason::None,
        ),
    )
}

fn not_an_app(ctx: &CreateStreamContext<'_>) -> Option<ChainAuthArgs> {
    ctx.config()
        .require_non_app_dm_creators
        .then(|| ChainAuthArgs::for_is_not_app(ctx.creator()))
}

pub(super) fn space_rules<'a>(ctx: &'a CreateStreamContext<'a>) -> CreateStreamRuleSet<'a> {
    CreateStreamRuleSet::new()
        .check(move || ctx.event_count_is(2))
        .check(move || ctx.creator_join_at(1).map(|_| ()))
        .require_chain_auth(move || {
            Ok(Some(ChainAuthArgs::for_space(
                ctx.stream_id().clone(),
                ctx.creator(),
                Permission::AddRemoveChannels,
            )))
        })
        .require_derived_event(move || {
            Ok(Some(user_join(ctx.creator(), ctx.stream_id().clone(), ctx.creator(), None)))
        })
}

pub(super) fn channel_rules<'a>(
    ctx: &'a CreateStreamContext<'a>,
    inception: &'a ChannelInception,
) -> CreateStreamRuleSet<'a> {
    let space_id = &inception.space_id;
    CreateStreamRuleSet::new()
        .check(move || ctx.event_count_is(2))
        .check(move || {
            if space_id.kind() != StreamKind::Space {
                return Err(bad_params("channel parent must be a space").tag("space_id", space_id));
            }
            Ok(())
        })
        .check(move || {
            let join = ctx.creator_join_at(1)?;
            if join.stream_parent_id.as_ref() != Some(space_id) {
                return Err(bad_params("channel join must name the parent space"));
            }
            Ok(())
        })
        .require_chain_auth(move || {
            Ok(Some(ChainAuthArgs::for_space(
                space_id.clone(),
                ctx.creator(),
                Permission::AddRemoveChannels,
            )))
        })
        .require_derived_event(move || {
            let origin = ctx.events().first().map(|event| event.event_ref(ctx.stream_id()));
            Ok(Some(DerivedEvent::new(
                space_id.clone(),
                make_space_channel(
                    ChannelOp::Created,
                    ctx.stream_id().clone(),
                    origin,
                    inception.channel_properties.clone(),
                ),
            )))
        })
        .require_derived_event(move || {
            Ok(Some(user_join(
                ctx.creator(),
                ctx.stream_id().clone(),
                ctx.creator(),
                Some(space_id.clone()),
            )))
        })
        .require_memberships(move || Ok(vec![space_id.clone()]))
}

/// The two DM parties, validated against the bundle and the stream id.
fn dm_parties(ctx: &CreateStreamContext<'_>, inception: &DmChannelInception) -> ProtocolResult<(Address, Address)> {
    let first = Address::from_slice(&inception.first_party_address)
        .ok_or_else(|| bad_params("first party address must be 20 bytes"))?;
    let second = Address::from_slice(&inception.second_party_address)
        .ok_or_else(|| bad_params("second party address must be 20 bytes"))?;
    if first == second {
        return Err(bad_params("dm parties must be distinct").tag("party", first));
    }
    if first != ctx.creator() {
        return Err(bad_params("dm creator must be the first party").tag("creator", ctx.creator()));
    }
    let expected = StreamId::dm_between(&first, &second);
    if &expected != ctx.stream_id() {
        return Err(bad_params("dm stream id does not match the parties")
            .tag("expected", expected)
            .tag("stream_id", ctx.stream_id()));
    }
    Ok((first, second))
}

pub(super) fn dm_rules<'a>(
    ctx: &'a CreateStreamContext<'a>,
    inception: &'a DmChannelInception,
) -> CreateStreamRuleSet<'a> {
    CreateStreamRuleSet::new()
        .check(move || ctx.event_count_is(3))
        .check(move || {
            let (first, second) = dm_parties(ctx, inception)?;
            if ctx.join_at(1)?.user_address != first {
                return Err(bad_params("second event must be the first party joining"));
            }
            if ctx.join_at(2)?.user_address != second {
                return Err(bad_params("third event must be the second party joining"));
            }
            Ok(())
        })
        .require_chain_auth(move || Ok(not_an_app(ctx)))
        .require_derived_events(move || {
            let (first, second) = dm_parties(ctx, inception)?;
            let stream_id = ctx.stream_id();
            Ok(vec![
                user_join(second, stream_id.clone(), first, None),
                user_join(first, stream_id.clone(), first, None),
            ])
        })
        .require_user_streams(move || {
            let (_, second) = dm_parties(ctx, inception)?;
            Ok(vec![StreamId::user_stream(&second)])
        })
}

/// Participants of a GDM in bundle order, creator first.
fn gdm_participants(ctx: &CreateStreamContext<'_>) -> ProtocolResult<Vec<Address>> {
    let creator = ctx.creator_join_at(1)?.user_address;
    let mut participants = vec![creator];
    for index in 2..ctx.events().len() {
        let user = ctx.join_at(index)?.user_address;
        if participants.contains(&user) {
            return Err(bad_params("duplicate gdm participant").tag("user", user));
        }
        participants.push(user);
    }
    Ok(participants)
}

pub(super) fn gdm_rules<'a>(ctx: &'a CreateStreamContext<'a>) -> CreateStreamRuleSet<'a> {
    CreateStreamRuleSet::new()
        .check(move || {
            let count = ctx.events().len();
            if count < 4 {
                return Err(bad_params("gdm needs the creator and at least two other members")
                    .tag("count", count));
            }
            Ok(())
        })
        .check(move || {
            let participants = gdm_participants(ctx)?.len();
            let limit = ctx.settings().membership_limits.gdm;
            if limit > 0 && participants > limit {
                return Err(bad_params("too many gdm participants")
                    .tag("participants", participants)
                    .tag("limit", limit));
            }
            Ok(())
        })
        .require_chain_auth(move || Ok(not_an_app(ctx)))
        .require_derived_events(move || {
            let creator = ctx.creator();
            let stream_id = ctx.stream_id();
            let participants = gdm_participants(ctx)?;
            let mut events: Vec<DerivedEvent> = participants
                .iter()
                .filter(|user| **user != creator)
                .map(|user| user_join(*user, stream_id.clone(), creator, None))
                .collect();
            events.push(user_join(creator, stream_id.clone(), creator, None));
            Ok(events)
        })
        .require_user_streams(move || {
            let creator = ctx.creator();
            Ok(gdm_participants(ctx)?
                .iter()
                .filter(|user| **user != creator)
                .map(StreamId::user_stream)
                .collect())
        })
}
