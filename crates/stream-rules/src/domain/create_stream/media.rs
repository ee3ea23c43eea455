//! Media stream creation.
//!
//! A media stream is attached to one owner, checked in this order:
//!
//! | Owner | Requirement |
//! |-------|-------------|
//! | channel | Write on the channel (space id required) |
//! | dm or gdm | creator is a member |
//! | space | ModifySpaceSettings on the space |
//! | user | the creator |

use shared_types::{MediaInception, MediaPayload, Payload, ProtocolResult, StreamId, StreamKind};

use super::{bad_params, CreateStreamContext};
use crate::domain::add_event::validate_chunk;
use crate::domain::chain_auth::{ChainAuthArgs, Permission};
use crate::domain::rule_builder::CreateStreamRuleSet;

pub(super) fn rules<'a>(
    ctx: &'a CreateStreamContext<'a>,
    inception: &'a MediaInception,
) -> CreateStreamRuleSet<'a> {
    CreateStreamRuleSet::new()
        .check(move || {
            let count = ctx.events().len();
            if count == 0 || count > 2 {
                return Err(bad_params("media streams take one or two inception events")
                    .tag("count", count));
            }
            Ok(())
        })
        .check(move || {
            let max = ctx.settings().media_max_chunk_count;
            if inception.chunk_count < 1 || inception.chunk_count > max {
                return Err(bad_params("invalid media chunk count")
                    .tag("chunk_count", inception.chunk_count)
                    .tag("max", max));
            }
            Ok(())
        })
        .check(move || first_chunk_is_valid(ctx, inception))
        .check(move || owner_is_valid(ctx, inception))
        .require_chain_auth(move || media_chain_auth(ctx, inception))
        .require_memberships(move || {
            Ok(match &inception.channel_id {
                Some(channel_id) if is_group_conversation(channel_id) => vec![channel_id.clone()],
                _ => Vec::new(),
            })
        })
}

fn is_group_conversation(stream_id: &StreamId) -> bool {
    matches!(stream_id.kind(), StreamKind::DmChannel | StreamKind::GdmChannel)
}

fn first_chunk_is_valid(ctx: &CreateStreamContext<'_>, inception: &MediaInception) -> ProtocolResult<()> {
    let Some(second) = ctx.events().get(1) else {
        return Ok(());
    };
    match second.payload() {
        Some(Payload::Media(MediaPayload::Chunk(chunk))) => validate_chunk(
            chunk,
            inception.chunk_count,
            ctx.settings().media_max_chunk_size,
        )
        .map_err(|err| bad_params("invalid first media chunk").tag("cause", err.message().to_string())),
        _ => Err(bad_params("second media event must be a chunk")),
    }
}

fn owner_is_valid(ctx: &CreateStreamContext<'_>, inception: &MediaInception) -> ProtocolResult<()> {
    if let Some(channel_id) = &inception.channel_id {
        return match channel_id.kind() {
            StreamKind::Channel if inception.space_id.is_none() => {
                Err(bad_params("channel media requires a space id"))
            }
            StreamKind::Channel | StreamKind::DmChannel | StreamKind::GdmChannel => Ok(()),
            kind => Err(bad_params("media channel id must be a channel, dm or gdm").tag("kind", kind)),
        };
    }
    if let Some(space_id) = &inception.space_id {
        if space_id.kind() != StreamKind::Space {
            return Err(bad_params("media space id must be a space").tag("space_id", space_id));
        }
        return Ok(());
    }
    match inception.user_id {
        Some(user) if user == ctx.creator() => Ok(()),
        Some(user) => Err(bad_params("user media must be created by its user").tag("user", user)),
        None => Err(bad_params("media stream has no owner")),
    }
}

fn media_chain_auth(
    ctx: &CreateStreamContext<'_>,
    inception: &MediaInception,
) -> ProtocolResult<Option<ChainAuthArgs>> {
    match (&inception.channel_id, &inception.space_id) {
        (Some(channel_id), Some(space_id)) if channel_id.kind() == StreamKind::Channel => {
            Ok(Some(ChainAuthArgs::for_channel(
                space_id.clone(),
                channel_id.clone(),
                ctx.creator(),
                Permission::Write,
            )))
        }
        (None, Some(space_id)) => Ok(Some(ChainAuthArgs::for_space(
            space_id.clone(),
            ctx.creator(),
            Permission::ModifySpaceSettings,
        ))),
        _ => Ok(None),
    }
}
