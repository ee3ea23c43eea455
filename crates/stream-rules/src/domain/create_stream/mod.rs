//! # Stream Creation Engine
//!
//! Decides whether a stream may be created from an inception bundle.
//!
//! ## Bundle Shape
//!
//! | Kind | Events | After the inception |
//! |------|--------|---------------------|
//! | space, channel | 2 | creator JOIN |
//! | dm | 3 | first party JOIN, second party JOIN |
//! | gdm | >= 4 | creator JOIN, then participant JOINs |
//! | media | 1-2 | optional first chunk |
//! | user, user metadata, user settings, user inbox | 1 | - |
//! | metadata | 1 | - |
//!
//! Every bundle is checked for: a single creator, no miniblock reference,
//! an unexpired delegate key, and an inception matching the requested id.
//! Creation has no no-op outcome.

mod channels;
mod media;
mod user;

use std::collections::BTreeMap;

use shared_types::{
    Address, ErrorCode, InceptionPayload, Membership, MembershipOp, ParsedEvent, ProtocolError,
    ProtocolResult, StreamId,
};
use tracing::debug;

use super::rule_builder::CreateStreamRuleSet;
use super::verdict::CreateStreamRules;
use crate::config::{OnChainSettings, RulesConfig};
use crate::ports::outbound::NodeRegistry;

/// Request metadata key carrying the app address of a new user.
pub const APP_ADDRESS_METADATA_KEY: &str = "appAddress";
/// Request metadata key carrying the space a new user is joining through.
pub const SPACE_ID_METADATA_KEY: &str = "spaceId";

/// Inputs of a single `can_create_stream` call.
#[derive(Clone, Copy)]
pub struct CreateStreamParams<'a> {
    pub config: &'a RulesConfig,
    pub settings: &'a OnChainSettings,
    pub nodes: &'a dyn NodeRegistry,
    /// Current time in epoch milliseconds.
    pub now_ms: u64,
    pub stream_id: &'a StreamId,
    pub events: &'a [ParsedEvent],
    pub metadata: &'a BTreeMap<String, Vec<u8>>,
}

/// Decides whether the stream `params.stream_id` may be created from
/// `params.events`.
///
/// # Errors
///
/// `PERMISSION_DENIED` for an expired delegate or a missing entitlement,
/// `BAD_STREAM_CREATION_PARAMS` for a malformed bundle.
pub fn can_create_stream(params: CreateStreamParams<'_>) -> ProtocolResult<CreateStreamRules> {
    debug!(
        stream_id = %params.stream_id,
        events = params.events.len(),
        "can_create_stream"
    );
    let result = check_bundle(&params).and_then(|inception| {
        let ctx = CreateStreamContext { params, inception };
        dispatch(&ctx).run()
    });
    match &result {
        Ok(rules) => debug!(
            stream_id = %params.stream_id,
            derived_events = rules.derived_events.len(),
            chain_auth = rules.chain_auth.is_some(),
            "stream creation verdict"
        ),
        Err(err) => debug!(stream_id = %params.stream_id, error = %err, "stream creation rejected"),
    }
    result.map_err(|err| err.func("can_create_stream"))
}

fn dispatch<'a>(ctx: &'a CreateStreamContext<'a>) -> CreateStreamRuleSet<'a> {
    match &ctx.inception {
        InceptionPayload::Space(_) => channels::space_rules(ctx),
        InceptionPayload::Channel(inception) => channels::channel_rules(ctx, inception),
        InceptionPayload::DmChannel(inception) => channels::dm_rules(ctx, inception),
        InceptionPayload::GdmChannel(_) => channels::gdm_rules(ctx),
        InceptionPayload::Media(inception) => media::rules(ctx, inception),
        InceptionPayload::User(inception) => user::user_stream_rules(ctx, inception.app_address),
        InceptionPayload::UserMetadata(_)
        | InceptionPayload::UserSettings(_)
        | InceptionPayload::UserInbox(_) => user::user_stream_rules(ctx, None),
        InceptionPayload::Metadata(inception) => user::metadata_rules(ctx, inception),
    }
}

pub(crate) fn bad_params(message: &'static str) -> ProtocolError {
    ProtocolError::new(ErrorCode::BadStreamCreationParams, message)
}

/// Cross-cutting checks. Returns the inception of the first event.
fn check_bundle(params: &CreateStreamParams<'_>) -> ProtocolResult<InceptionPayload> {
    let Some(first) = params.events.first() else {
        return Err(bad_params("no events"));
    };
    let creator = first.creator();
    for (index, parsed) in params.events.iter().enumerate() {
        let event = &parsed.event;
        if event.delegate_expired(params.now_ms) {
            return Err(ProtocolError::new(
                ErrorCode::PermissionDenied,
                "event delegate has expired",
            )
            .tag("index", index)
            .tag("delegate_expiry_epoch_ms", event.delegate_expiry_epoch_ms));
        }
        if event.prev_miniblock_hash.is_some() {
            return Err(bad_params("inception events must not reference a miniblock").tag("index", index));
        }
        if parsed.creator() != creator {
            return Err(bad_params("all events must have the same creator")
                .tag("index", index)
                .tag("creator", parsed.creator()));
        }
    }

    let inception = first
        .payload()
        .and_then(|payload| payload.inception())
        .ok_or_else(|| bad_params("first event must be an inception"))?;
    if inception.stream_id() != params.stream_id {
        return Err(bad_params("inception stream id does not match the request")
            .tag("requested", params.stream_id)
            .tag("inception", inception.stream_id()));
    }
    if inception.kind() != params.stream_id.kind() {
        return Err(bad_params("inception kind does not match the stream id")
            .tag("inception", inception.kind())
            .tag("stream_id", params.stream_id));
    }
    Ok(inception)
}

/// Per-call state shared by the per-kind rules.
pub(crate) struct CreateStreamContext<'a> {
    params: CreateStreamParams<'a>,
    inception: InceptionPayload,
}

impl<'a> CreateStreamContext<'a> {
    pub(crate) fn config(&self) -> &'a RulesConfig {
        self.params.config
    }

    pub(crate) fn settings(&self) -> &'a OnChainSettings {
        self.params.settings
    }

    pub(crate) fn nodes(&self) -> &'a dyn NodeRegistry {
        self.params.nodes
    }

    pub(crate) fn stream_id(&self) -> &'a StreamId {
        self.params.stream_id
    }

    pub(crate) fn events(&self) -> &'a [ParsedEvent] {
        self.params.events
    }

    pub(crate) fn metadata(&self) -> &'a BTreeMap<String, Vec<u8>> {
        self.params.metadata
    }

    /// The creator of the bundle. `check_bundle` guarantees one exists.
    pub(crate) fn creator(&self) -> Address {
        self.params.events.first().map(|e| *e.creator()).unwrap_or_default()
    }

    pub(crate) fn event_count_is(&self, expected: usize) -> ProtocolResult<()> {
        let count = self.params.events.len();
        if count == expected {
            Ok(())
        } else {
            Err(bad_params("wrong number of inception events")
                .tag("expected", expected)
                .tag("count", count))
        }
    }

    /// The JOIN carried by event `index`.
    pub(crate) fn join_at(&self, index: usize) -> ProtocolResult<&'a Membership> {
        let membership = self
            .params
            .events
            .get(index)
            .and_then(|event| event.payload())
            .and_then(|payload| payload.membership())
            .ok_or_else(|| bad_params("expected a membership event").tag("index", index))?;
        if membership.op != MembershipOp::Join {
            return Err(bad_params("expected a join")
                .tag("index", index)
                .tag("op", membership.op));
        }
        Ok(membership)
    }

    /// Event `index` must be the creator joining.
    pub(crate) fn creator_join_at(&self, index: usize) -> ProtocolResult<&'a Membership> {
        let membership = self.join_at(index)?;
        if membership.user_address != self.creator() {
            return Err(bad_params("join must be for the creator")
                .tag("index", index)
                .tag("user", &membership.user_address));
        }
        Ok(membership)
    }
}
