//! User-scoped and metadata stream creation.

use shared_types::{
    Address, ErrorCode, MetadataInception, ProtocolError, ProtocolResult, StreamId, StreamKind,
};

use super::{bad_params, CreateStreamContext, APP_ADDRESS_METADATA_KEY, SPACE_ID_METADATA_KEY};
use crate::domain::chain_auth::ChainAuthArgs;
use crate::domain::rule_builder::CreateStreamRuleSet;

pub(super) fn user_stream_rules<'a>(
    ctx: &'a CreateStreamContext<'a>,
    app_address: Option<Address>,
) -> CreateStreamRuleSet<'a> {
    CreateStreamRuleSet::new()
        .check(move || ctx.event_count_is(1))
        .check(move || {
            let owner = ctx.stream_id().embedded_address()?;
            if owner != ctx.creator() {
                return Err(bad_params("user streams must be created by their owner")
                    .tag("owner", owner)
                    .tag("creator", ctx.creator()));
            }
            Ok(())
        })
        .require_chain_auth(move || new_user_chain_auth(ctx, app_address))
}

/// New users are either registered apps or members of some space.
fn new_user_chain_auth(
    ctx: &CreateStreamContext<'_>,
    app_address: Option<Address>,
) -> ProtocolResult<Option<ChainAuthArgs>> {
    if ctx.config().disable_base_chain {
        return Ok(None);
    }
    let app_address = match app_address.filter(|app| !app.is_zero()) {
        Some(app) => Some(app),
        None => ctx
            .metadata()
            .get(APP_ADDRESS_METADATA_KEY)
            .map(|bytes| {
                Address::from_slice(bytes).ok_or_else(|| {
                    bad_params("app address metadata must be 20 bytes").tag("len", bytes.len())
                })
            })
            .transpose()?,
    };
    if let Some(app) = app_address {
        return Ok(Some(ChainAuthArgs::for_is_app(ctx.creator(), app)));
    }

    let Some(space_bytes) = ctx.metadata().get(SPACE_ID_METADATA_KEY) else {
        return Err(ProtocolError::new(
            ErrorCode::PermissionDenied,
            "new users must be an app or join through a space",
        )
        .tag("creator", ctx.creator()));
    };
    let space_id = StreamId::from_bytes(space_bytes)
        .ok()
        .filter(|id| id.kind() == StreamKind::Space)
        .ok_or_else(|| bad_params("space id metadata is not a space stream id"))?;
    Ok(Some(ChainAuthArgs::for_is_space_member(space_id, ctx.creator())))
}

pub(super) fn metadata_rules<'a>(
    ctx: &'a CreateStreamContext<'a>,
    inception: &'a MetadataInception,
) -> CreateStreamRuleSet<'a> {
    CreateStreamRuleSet::new()
        .check(move || ctx.event_count_is(1))
        .check(move || {
            if ctx.nodes().is_operator(&ctx.creator()) {
                Ok(())
            } else {
                Err(ProtocolError::new(
                    ErrorCode::PermissionDenied,
                    "metadata streams are created by node operators",
                )
                .tag("creator", ctx.creator()))
            }
        })
        .check(move || {
            let mask = ctx.config().metadata_shard_mask;
            if inception.shard & !mask != 0 {
                return Err(bad_params("metadata shard outside the configured mask")
                    .tag("shard", inception.shard)
                    .tag("mask", format!("{mask:#x}")));
            }
            Ok(())
        })
}
