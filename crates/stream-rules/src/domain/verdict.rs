//! Verdict types returned by the engines.

use serde::{Deserialize, Serialize};
use shared_types::{EvmReceipt, Payload, StreamId, Tags};

use super::chain_auth::{ChainAuthArgs, ChainAuthRequirement};

/// An event the host must append to another stream as a consequence of a
/// verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedEvent {
    pub payload: Payload,
    pub stream_id: StreamId,
    pub tags: Option<Tags>,
}

impl DerivedEvent {
    #[must_use]
    pub fn new(stream_id: StreamId, payload: Payload) -> Self {
        Self {
            payload,
            stream_id,
            tags: None,
        }
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Option<Tags>) -> Self {
        self.tags = tags;
        self
    }
}

/// Checks the host must complete before committing an admissible event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddEventVerifications {
    pub chain_auth: Option<ChainAuthRequirement>,
    /// Receipt whose existence on chain must be confirmed.
    pub receipt: Option<EvmReceipt>,
}

impl AddEventVerifications {
    fn is_empty(&self) -> bool {
        self.chain_auth.is_none() && self.receipt.is_none()
    }
}

/// Events the host must append alongside, or instead of, the candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddEventSideEffects {
    /// Must be appended to its stream before the candidate event.
    pub required_parent_event: Option<DerivedEvent>,
    /// Appended instead of the candidate when chain auth is denied.
    pub on_chain_auth_failure: Option<DerivedEvent>,
}

impl AddEventSideEffects {
    fn is_empty(&self) -> bool {
        self.required_parent_event.is_none() && self.on_chain_auth_failure.is_none()
    }

    /// The compensating event to append when chain auth is denied.
    #[must_use]
    pub fn compensation_on_denial(&self) -> Option<&DerivedEvent> {
        self.on_chain_auth_failure.as_ref()
    }
}

/// Verdict of `can_add_event` when the event is not rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddEventOutcome {
    /// Harmless but redundant; the host must not append the event.
    NoOp,
    /// The event may be appended once verifications pass.
    Admissible {
        verifications: Option<AddEventVerifications>,
        side_effects: Option<AddEventSideEffects>,
    },
}

impl AddEventOutcome {
    pub(crate) fn admissible(
        verifications: AddEventVerifications,
        side_effects: AddEventSideEffects,
    ) -> Self {
        AddEventOutcome::Admissible {
            verifications: (!verifications.is_empty()).then_some(verifications),
            side_effects: (!side_effects.is_empty()).then_some(side_effects),
        }
    }

    #[must_use]
    pub fn is_admissible(&self) -> bool {
        matches!(self, AddEventOutcome::Admissible { .. })
    }

    #[must_use]
    pub fn verifications(&self) -> Option<&AddEventVerifications> {
        match self {
            AddEventOutcome::Admissible { verifications, .. } => verifications.as_ref(),
            AddEventOutcome::NoOp => None,
        }
    }

    #[must_use]
    pub fn side_effects(&self) -> Option<&AddEventSideEffects> {
        match self {
            AddEventOutcome::Admissible { side_effects, .. } => side_effects.as_ref(),
            AddEventOutcome::NoOp => None,
        }
    }

    #[must_use]
    pub fn chain_auth(&self) -> Option<&ChainAuthRequirement> {
        self.verifications().and_then(|v| v.chain_auth.as_ref())
    }

    #[must_use]
    pub fn required_parent_event(&self) -> Option<&DerivedEvent> {
        self.side_effects()
            .and_then(|s| s.required_parent_event.as_ref())
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            AddEventOutcome::NoOp => "no_op",
            AddEventOutcome::Admissible { .. } => "admissible",
        }
    }
}

/// Verdict of `can_create_stream`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStreamRules {
    pub chain_auth: Option<ChainAuthArgs>,
    /// Appended by the host after the stream is created, in order.
    pub derived_events: Vec<DerivedEvent>,
    /// Streams the creator must already be a member of.
    pub required_memberships: Vec<StreamId>,
    /// User streams that must already exist.
    pub required_user_streams: Vec<StreamId>,
}
