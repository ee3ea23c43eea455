//! Media chunk rules, shared with media stream creation.

use shared_types::{MediaChunk, MediaPayload, ProtocolResult};

use super::{invalid_argument, AddEventContext};
use crate::domain::rule_builder::AddEventRules;

pub(super) fn rules<'a>(ctx: &'a AddEventContext<'a>, payload: &'a MediaPayload) -> AddEventRules<'a> {
    match payload {
        MediaPayload::Inception(_) => {
            AddEventRules::fail(invalid_argument("media inception cannot be added"))
        }
        MediaPayload::Chunk(chunk) => AddEventRules::new()
            .check(move || ctx.creator_is_member())
            .check(move || {
                let inception = ctx.view().media_inception()?;
                validate_chunk(chunk, inception.chunk_count, ctx.settings().media_max_chunk_size)?;
                Ok(true)
            }),
    }
}

/// A chunk must index into the declared chunk count and fit the size limit.
pub(crate) fn validate_chunk(
    chunk: &MediaChunk,
    chunk_count: i32,
    max_chunk_size: usize,
) -> ProtocolResult<()> {
    if chunk.chunk_index < 0 || chunk.chunk_index >= chunk_count {
        return Err(invalid_argument("chunk index out of bounds")
            .tag("chunk_index", chunk.chunk_index)
            .tag("chunk_count", chunk_count));
    }
    if chunk.data.len() > max_chunk_size {
        return Err(invalid_argument("chunk size exceeds limit")
            .tag("size", chunk.data.len())
            .tag("max_chunk_size", max_chunk_size));
    }
    Ok(())
}
