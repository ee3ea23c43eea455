//! # Event Addition Engine
//!
//! Decides whether a candidate event may be appended to a stream.
//!
//! ## Flow
//!
//! ```text
//! ParsedEvent ──→ preconditions ──→ dispatch(payload) ──→ AddEventRules::run()
//!                   │                  │
//!                   └── Err            └── space / channel / user / media /
//!                                          member / transactions rule sets
//! ```
//!
//! ## Preconditions (in order)
//!
//! | Check | Error |
//! |-------|-------|
//! | delegate key not expired | `PERMISSION_DENIED` |
//! | `prev_miniblock_hash` present | `INVALID_ARGUMENT` |
//! | `StreamView::validate_next_event` | whatever the view returns |
//! | payload kind matches the stream | `INVALID_ARGUMENT` |
//!
//! Member payloads are valid in every stream kind.

mod channel;
mod media;
mod member;
mod space;
mod transactions;
mod user;

pub(crate) use media::validate_chunk;
pub use member::MAX_PINNED_MESSAGES;

use shared_types::{
    Address, ErrorCode, ParsedEvent, Payload, ProtocolError, ProtocolResult, StreamId, StreamKind,
};
use tracing::debug;

use super::chain_auth::{ChainAuthArgs, Permission};
use super::rule_builder::AddEventRules;
use super::verdict::AddEventOutcome;
use crate::config::{OnChainSettings, RulesConfig};
use crate::ports::outbound::{NodeRegistry, StreamView};

/// Inputs of a single `can_add_event` call.
#[derive(Clone, Copy)]
pub struct AddEventParams<'a> {
    pub config: &'a RulesConfig,
    pub settings: &'a OnChainSettings,
    pub nodes: &'a dyn NodeRegistry,
    /// Current time in epoch milliseconds.
    pub now_ms: u64,
    pub event: &'a ParsedEvent,
    pub view: &'a dyn StreamView,
}

/// Decides whether `params.event` may be appended to `params.view`.
///
/// # Errors
///
/// Any precondition or rule failure. `Ok(AddEventOutcome::NoOp)` is not an
/// error: the event is harmless but must not be appended.
pub fn can_add_event(params: AddEventParams<'_>) -> ProtocolResult<AddEventOutcome> {
    let ctx = AddEventContext { params };
    debug!(
        stream_id = %ctx.stream_id(),
        creator = %ctx.creator(),
        payload = ctx.payload_name(),
        "can_add_event"
    );

    let result = ctx.check_preconditions().and_then(|payload| dispatch(&ctx, payload).run());
    match &result {
        Ok(outcome) => debug!(stream_id = %ctx.stream_id(), outcome = outcome.name(), "event verdict"),
        Err(err) => debug!(stream_id = %ctx.stream_id(), error = %err, "event rejected"),
    }
    result.map_err(|err| err.func("can_add_event"))
}

fn dispatch<'a>(ctx: &'a AddEventContext<'a>, payload: &'a Payload) -> AddEventRules<'a> {
    match payload {
        Payload::Space(space) => space::rules(ctx, space),
        Payload::Channel(channel) => channel::channel_rules(ctx, channel),
        Payload::DmChannel(dm) => channel::dm_rules(ctx, dm),
        Payload::GdmChannel(gdm) => channel::gdm_rules(ctx, gdm),
        Payload::User(user) => user::user_rules(ctx, user),
        Payload::UserMetadata(metadata) => user::user_metadata_rules(ctx, metadata),
        Payload::UserSettings(settings) => user::user_settings_rules(ctx, settings),
        Payload::UserInbox(inbox) => user::user_inbox_rules(ctx, inbox),
        Payload::Media(media) => media::rules(ctx, media),
        Payload::Member(member) => member::rules(ctx, member),
        Payload::Metadata(_) => AddEventRules::fail(
            ProtocolError::new(
                ErrorCode::InvalidArgument,
                "metadata payloads cannot be added to a stream",
            )
            .tag("stream_id", ctx.stream_id()),
        ),
    }
}

/// Per-call state shared by the rule sets.
pub(crate) struct AddEventContext<'a> {
    params: AddEventParams<'a>,
}

impl<'a> AddEventContext<'a> {
    pub(crate) fn event(&self) -> &'a ParsedEvent {
        self.params.event
    }

    pub(crate) fn view(&self) -> &'a dyn StreamView {
        self.params.view
    }

    pub(crate) fn settings(&self) -> &'a OnChainSettings {
        self.params.settings
    }

    pub(crate) fn creator(&self) -> &'a Address {
        self.params.event.creator()
    }

    pub(crate) fn stream_id(&self) -> &'a StreamId {
        self.params.view.stream_id()
    }

    pub(crate) fn stream_kind(&self) -> StreamKind {
        self.stream_id().kind()
    }

    fn payload_name(&self) -> &'static str {
        self.params.event.payload().map_or("none", Payload::name)
    }

    pub(crate) fn is_valid_node(&self, address: &Address) -> bool {
        self.params.nodes.is_valid_node(address)
    }

    fn check_preconditions(&self) -> ProtocolResult<&'a Payload> {
        let event = &self.params.event.event;
        if event.delegate_expired(self.params.now_ms) {
            return Err(ProtocolError::new(
                ErrorCode::PermissionDenied,
                "event delegate has expired",
            )
            .tag("delegate_expiry_epoch_ms", event.delegate_expiry_epoch_ms)
            .tag("now_ms", self.params.now_ms));
        }
        if event.prev_miniblock_hash.is_none() {
            return Err(ProtocolError::new(
                ErrorCode::InvalidArgument,
                "event has no previous miniblock hash",
            ));
        }
        self.params
            .view
            .validate_next_event(self.params.settings, self.params.event, self.params.now_ms)?;

        let payload = self.params.event.payload().ok_or_else(|| {
            ProtocolError::new(ErrorCode::InvalidArgument, "event has no known payload")
        })?;
        if payload.inception().is_some() {
            return Err(ProtocolError::new(
                ErrorCode::InvalidArgument,
                "inception events cannot be added to an existing stream",
            )
            .tag("payload", payload.name()));
        }
        let stream_kind = self.params.view.inception().kind();
        if let Some(kind) = payload.stream_kind() {
            if kind != stream_kind {
                return Err(ProtocolError::new(
                    ErrorCode::InvalidArgument,
                    "payload kind does not match the stream",
                )
                .tag("payload", payload.name())
                .tag("stream_kind", stream_kind));
            }
        }
        Ok(payload)
    }

    // ===== COMMON CHECKS =====

    /// Rejects unless the creator is a joined member of the stream.
    pub(crate) fn creator_is_member(&self) -> ProtocolResult<bool> {
        if self.params.view.is_member(self.creator())? {
            Ok(true)
        } else {
            Err(ProtocolError::new(
                ErrorCode::PermissionDenied,
                "event creator is not a member of the stream",
            )
            .tag("creator", self.creator())
            .tag("stream_id", self.stream_id()))
        }
    }

    /// Rejects unless the creator is a registered node.
    pub(crate) fn creator_is_valid_node(&self) -> ProtocolResult<bool> {
        if self.is_valid_node(self.creator()) {
            Ok(true)
        } else {
            Err(
                ProtocolError::new(ErrorCode::UnknownNode, "event creator is not a valid node")
                    .tag("creator", self.creator()),
            )
        }
    }

    // ===== CHAIN AUTH =====

    /// The space a space or channel stream belongs to.
    pub(crate) fn space_id(&self) -> ProtocolResult<&'a StreamId> {
        match self.stream_kind() {
            StreamKind::Space => Ok(self.stream_id()),
            StreamKind::Channel => Ok(&self.params.view.channel_inception()?.space_id),
            kind => Err(ProtocolError::new(
                ErrorCode::BadStreamId,
                "stream does not belong to a space",
            )
            .tag("kind", kind)),
        }
    }

    /// `permission` held by the creator on the stream, scoped to the space
    /// or channel. DMs, GDMs and other streams need no chain auth.
    pub(crate) fn creator_permission(
        &self,
        permission: Permission,
    ) -> ProtocolResult<Option<ChainAuthArgs>> {
        let creator = *self.creator();
        let args = match self.stream_kind() {
            StreamKind::Space => ChainAuthArgs::for_space(self.stream_id().clone(), creator, permission),
            StreamKind::Channel => ChainAuthArgs::for_channel(
                self.space_id()?.clone(),
                self.stream_id().clone(),
                creator,
                permission,
            ),
            _ => return Ok(None),
        };
        let app = self.params.view.member_app_address(&creator)?;
        Ok(Some(args.with_app_address(app)))
    }

    /// `permission` held by the creator on the enclosing space.
    pub(crate) fn creator_space_permission(&self, permission: Permission) -> ProtocolResult<ChainAuthArgs> {
        let creator = *self.creator();
        let app = self.params.view.member_app_address(&creator)?;
        Ok(ChainAuthArgs::for_space(self.space_id()?.clone(), creator, permission).with_app_address(app))
    }
}

/// An `INVALID_ARGUMENT` error for a malformed payload field.
pub(crate) fn invalid_argument(message: &'static str) -> ProtocolError {
    ProtocolError::new(ErrorCode::InvalidArgument, message)
}
