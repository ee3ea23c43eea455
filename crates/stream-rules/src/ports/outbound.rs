//! Outbound (Driven) ports for the rules engine.
//!
//! These traits describe what the engine reads from its host. None of them
//! may perform I/O on the engine's behalf during a call: a [`StreamView`]
//! is a snapshot of materialized state, and the other ports answer from
//! data the host already holds.

use serde::{Deserialize, Serialize};
use shared_types::{
    Address, ChannelInception, ChannelUpdate, DmChannelInception, ErrorCode, EvmReceipt,
    InceptionPayload, KeySolicitation, MediaInception, MembershipOp, ParsedEvent, ProtocolError,
    ProtocolResult, SolanaReceipt, StreamId, UserInception,
};

use crate::config::OnChainSettings;
use crate::domain::chain_auth::ChainAuthArgs;

/// A pinned message as recorded in the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedMessage {
    pub event_id: Vec<u8>,
    pub creator: Address,
}

/// Read-only view over the materialized state of one stream.
pub trait StreamView {
    fn stream_id(&self) -> &StreamId;

    fn inception(&self) -> &InceptionPayload;

    /// The enclosing stream, if any (a channel's space).
    fn stream_parent_id(&self) -> Option<&StreamId> {
        self.inception().stream_parent_id()
    }

    /// Checks that `event` can follow the current state: it references a
    /// known miniblock and is not already part of the stream.
    fn validate_next_event(
        &self,
        settings: &OnChainSettings,
        event: &ParsedEvent,
        now_ms: u64,
    ) -> ProtocolResult<()>;

    /// Current membership of `user`; `Unspecified` if never a member.
    fn membership(&self, user: &Address) -> ProtocolResult<MembershipOp>;

    fn is_member(&self, user: &Address) -> ProtocolResult<bool> {
        Ok(self.membership(user)? == MembershipOp::Join)
    }

    fn joined_member_count(&self) -> ProtocolResult<usize>;

    /// For user streams: the owner's recorded membership in `stream_id`.
    fn user_membership(&self, stream_id: &StreamId) -> ProtocolResult<MembershipOp>;

    fn pinned_messages(&self) -> ProtocolResult<Vec<PinnedMessage>>;

    /// Outstanding key solicitations posted by `user`.
    fn key_solicitations(&self, user: &Address) -> ProtocolResult<Vec<KeySolicitation>>;

    /// For spaces: the latest lifecycle record of `channel_id`.
    fn channel_info(&self, channel_id: &StreamId) -> ProtocolResult<Option<ChannelUpdate>>;

    /// App address recorded for a member, or [`Address::ZERO`].
    fn member_app_address(&self, user: &Address) -> ProtocolResult<Address>;

    /// For user streams: whether the owner is a registered app.
    fn is_app_user(&self) -> ProtocolResult<bool>;

    /// Whether a transaction with this receipt is already in the stream.
    fn has_transaction(
        &self,
        receipt: Option<&EvmReceipt>,
        solana_receipt: Option<&SolanaReceipt>,
    ) -> ProtocolResult<bool>;

    fn channel_inception(&self) -> ProtocolResult<&ChannelInception> {
        match self.inception() {
            InceptionPayload::Channel(inception) => Ok(inception),
            other => Err(wrong_inception("channel", other)),
        }
    }

    fn dm_inception(&self) -> ProtocolResult<&DmChannelInception> {
        match self.inception() {
            InceptionPayload::DmChannel(inception) => Ok(inception),
            other => Err(wrong_inception("dm_channel", other)),
        }
    }

    fn media_inception(&self) -> ProtocolResult<&MediaInception> {
        match self.inception() {
            InceptionPayload::Media(inception) => Ok(inception),
            other => Err(wrong_inception("media", other)),
        }
    }

    fn user_inception(&self) -> ProtocolResult<&UserInception> {
        match self.inception() {
            InceptionPayload::User(inception) => Ok(inception),
            other => Err(wrong_inception("user", other)),
        }
    }
}

fn wrong_inception(expected: &'static str, actual: &InceptionPayload) -> ProtocolError {
    ProtocolError::new(ErrorCode::BadEvent, "unexpected stream inception")
        .tag("expected", expected)
        .tag("actual", actual.kind())
}

/// Snapshot accessor for network-wide settings.
pub trait OnChainConfiguration {
    fn get(&self) -> OnChainSettings;
}

/// Node identities known to the registry.
pub trait NodeRegistry {
    fn is_valid_node(&self, address: &Address) -> bool;

    /// Whether `address` is a registered node operator.
    fn is_operator(&self, address: &Address) -> bool;
}

/// Outcome of evaluating one [`ChainAuthArgs`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementVerdict {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl EntitlementVerdict {
    #[must_use]
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Resolves on-chain authorization queries. Used by hosts after a verdict,
/// never by the engines.
pub trait EntitlementEvaluator {
    fn evaluate(&self, args: &ChainAuthArgs) -> ProtocolResult<EntitlementVerdict>;
}
