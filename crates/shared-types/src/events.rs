//! # Stream Events
//!
//! [`StreamEvent`] is the signed unit appended to a stream. A
//! [`ParsedEvent`] is an event whose envelope has already been decoded and
//! whose signature has already been recovered by the host.
//!
//! The `make_*` constructors build the payloads rules cascade into other
//! streams.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

use crate::entities::{Address, ChannelOp, Hash, MembershipOp, MembershipReason, StreamId};
use crate::errors::ProtocolResult;
use crate::hashing::hash_event;
use crate::payloads::{
    ChannelUpdate, EncryptedData, EventRef, MemberBlockchainTransaction, MemberPayload,
    Membership, Payload, ReceivedBlockchainTransaction, SpacePayload, UserMembership, UserPayload,
};
use crate::transactions::BlockchainTransaction;

/// Interaction metadata attached by clients, preserved on derived events.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tags {
    pub message_interaction_type: MessageInteractionType,
    pub group_mentions: Vec<GroupMention>,
    pub mentioned_user_addresses: Vec<Address>,
    pub participating_user_addresses: Vec<Address>,
    pub thread_id: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MessageInteractionType {
    #[default]
    Unspecified,
    Reaction,
    Reply,
    Mention,
    Edit,
    Redaction,
    Post,
    Tip,
    Trade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupMention {
    AtChannel,
}

/// A stream event as signed by its creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub creator_address: Address,
    pub salt: Vec<u8>,
    /// Absent only on inception bundles.
    pub prev_miniblock_hash: Option<Hash>,
    pub prev_miniblock_num: i64,
    /// `None` when the payload kind is unknown to this node.
    pub payload: Option<Payload>,
    pub created_at_epoch_ms: i64,
    /// Expiry of the creator's delegate key; `0` means no expiry.
    pub delegate_expiry_epoch_ms: u64,
    pub ephemeral: bool,
    pub tags: Option<Tags>,
}

impl StreamEvent {
    /// A fresh event with no miniblock reference and no expiry.
    #[must_use]
    pub fn new(creator_address: Address, payload: Payload) -> Self {
        Self {
            creator_address,
            salt: Vec::new(),
            prev_miniblock_hash: None,
            prev_miniblock_num: -1,
            payload: Some(payload),
            created_at_epoch_ms: 0,
            delegate_expiry_epoch_ms: 0,
            ephemeral: false,
            tags: None,
        }
    }

    #[must_use]
    pub fn with_prev_miniblock(mut self, num: i64, hash: Hash) -> Self {
        self.prev_miniblock_num = num;
        self.prev_miniblock_hash = Some(hash);
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = Some(tags);
        self
    }

    #[must_use]
    pub fn with_delegate_expiry(mut self, expiry_epoch_ms: u64) -> Self {
        self.delegate_expiry_epoch_ms = expiry_epoch_ms;
        self
    }

    #[must_use]
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// Whether the creator's delegate key has expired at `now_ms`.
    #[must_use]
    pub fn delegate_expired(&self, now_ms: u64) -> bool {
        self.delegate_expiry_epoch_ms > 0 && now_ms >= self.delegate_expiry_epoch_ms
    }
}

/// The miniblock an event was built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MiniblockRef {
    pub num: i64,
    pub hash: Hash,
}

/// A decoded, signature-checked event.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedEvent {
    pub event: StreamEvent,
    pub hash: Hash,
    #[serde_as(as = "Bytes")]
    pub signature: Vec<u8>,
    pub miniblock_ref: Option<MiniblockRef>,
}

impl ParsedEvent {
    /// Wraps an event, computing its canonical hash.
    pub fn new(event: StreamEvent, signature: Vec<u8>) -> ProtocolResult<Self> {
        let hash = hash_event(&event)?;
        let miniblock_ref = event.prev_miniblock_hash.map(|hash| MiniblockRef {
            num: event.prev_miniblock_num,
            hash,
        });
        Ok(Self {
            event,
            hash,
            signature,
            miniblock_ref,
        })
    }

    #[must_use]
    pub fn creator(&self) -> &Address {
        &self.event.creator_address
    }

    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        self.event.payload.as_ref()
    }

    #[must_use]
    pub fn tags(&self) -> Option<&Tags> {
        self.event.tags.as_ref()
    }

    /// A reference to this event for use in other streams.
    #[must_use]
    pub fn event_ref(&self, stream_id: &StreamId) -> EventRef {
        EventRef {
            stream_id: stream_id.as_bytes().to_vec(),
            hash: self.hash,
            signature: self.signature.clone(),
        }
    }
}

// =============================================================================
// PAYLOAD CONSTRUCTORS
// =============================================================================

/// A membership record for the user's own user stream.
#[must_use]
pub fn make_user_membership(
    op: MembershipOp,
    stream_id: StreamId,
    inviter: Option<Address>,
    stream_parent_id: Option<StreamId>,
    reason: MembershipReason,
) -> Payload {
    Payload::User(UserPayload::UserMembership(UserMembership {
        stream_id,
        op,
        inviter,
        stream_parent_id,
        reason,
    }))
}

/// A membership change inside the target stream.
#[must_use]
pub fn make_member_membership(
    op: MembershipOp,
    user_address: Address,
    initiator_address: Address,
    stream_parent_id: Option<StreamId>,
    reason: MembershipReason,
    app_address: Option<Address>,
) -> Payload {
    Payload::Member(MemberPayload::Membership(Membership {
        op,
        user_address,
        initiator_address,
        stream_parent_id,
        reason,
        app_address,
    }))
}

/// A channel lifecycle record for the space stream.
#[must_use]
pub fn make_space_channel(
    op: ChannelOp,
    channel_id: StreamId,
    origin_event: Option<EventRef>,
    channel_properties: Option<EncryptedData>,
) -> Payload {
    Payload::Space(SpacePayload::Channel(ChannelUpdate {
        op,
        channel_id,
        origin_event,
        channel_properties,
    }))
}

#[must_use]
pub fn make_member_blockchain_transaction(
    from_user_address: Address,
    transaction: BlockchainTransaction,
) -> Payload {
    Payload::Member(MemberPayload::MemberBlockchainTransaction(
        MemberBlockchainTransaction {
            transaction,
            from_user_address,
        },
    ))
}

#[must_use]
pub fn make_received_blockchain_transaction(
    from_user_address: Address,
    transaction: BlockchainTransaction,
) -> Payload {
    Payload::User(UserPayload::ReceivedBlockchainTransaction(
        ReceivedBlockchainTransaction {
            transaction,
            from_user_address,
        },
    ))
}
