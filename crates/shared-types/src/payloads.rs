//! # Event Payloads
//!
//! One payload family per stream kind, plus the [`MemberPayload`] family
//! that is valid in every stream. Each family has an `Inception` variant
//! that only ever appears as the first event of a stream.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::{Address, ChannelOp, Hash, MembershipOp, MembershipReason, StreamId, StreamKind};
use crate::events::StreamEvent;
use crate::transactions::BlockchainTransaction;

/// Client-encrypted content the node never inspects.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EncryptedData {
    pub ciphertext: String,
    pub algorithm: String,
    pub sender_key: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamSettings {
    pub disable_miniblock_creation: bool,
}

/// Reference to an event in another stream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventRef {
    pub stream_id: Vec<u8>,
    pub hash: Hash,
    pub signature: Vec<u8>,
}

/// Top-level payload of a [`StreamEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    Space(SpacePayload),
    Channel(ChannelPayload),
    DmChannel(DmChannelPayload),
    GdmChannel(GdmChannelPayload),
    User(UserPayload),
    UserMetadata(UserMetadataPayload),
    UserSettings(UserSettingsPayload),
    UserInbox(UserInboxPayload),
    Media(MediaPayload),
    Member(MemberPayload),
    Metadata(MetadataPayload),
}

impl Payload {
    /// The stream kind this payload family belongs to. Member payloads
    /// belong to every kind and return `None`.
    #[must_use]
    pub const fn stream_kind(&self) -> Option<StreamKind> {
        Some(match self {
            Payload::Space(_) => StreamKind::Space,
            Payload::Channel(_) => StreamKind::Channel,
            Payload::DmChannel(_) => StreamKind::DmChannel,
            Payload::GdmChannel(_) => StreamKind::GdmChannel,
            Payload::User(_) => StreamKind::User,
            Payload::UserMetadata(_) => StreamKind::UserMetadata,
            Payload::UserSettings(_) => StreamKind::UserSettings,
            Payload::UserInbox(_) => StreamKind::UserInbox,
            Payload::Media(_) => StreamKind::Media,
            Payload::Metadata(_) => StreamKind::Metadata,
            Payload::Member(_) => return None,
        })
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Payload::Space(_) => "space",
            Payload::Channel(_) => "channel",
            Payload::DmChannel(_) => "dm_channel",
            Payload::GdmChannel(_) => "gdm_channel",
            Payload::User(_) => "user",
            Payload::UserMetadata(_) => "user_metadata",
            Payload::UserSettings(_) => "user_settings",
            Payload::UserInbox(_) => "user_inbox",
            Payload::Media(_) => "media",
            Payload::Member(_) => "member",
            Payload::Metadata(_) => "metadata",
        }
    }

    /// The inception carried by this payload, if it is one.
    #[must_use]
    pub fn inception(&self) -> Option<InceptionPayload> {
        Some(match self {
            Payload::Space(SpacePayload::Inception(i)) => InceptionPayload::Space(i.clone()),
            Payload::Channel(ChannelPayload::Inception(i)) => InceptionPayload::Channel(i.clone()),
            Payload::DmChannel(DmChannelPayload::Inception(i)) => {
                InceptionPayload::DmChannel(i.clone())
            }
            Payload::GdmChannel(GdmChannelPayload::Inception(i)) => {
                InceptionPayload::GdmChannel(i.clone())
            }
            Payload::User(UserPayload::Inception(i)) => InceptionPayload::User(i.clone()),
            Payload::UserMetadata(UserMetadataPayload::Inception(i)) => {
                InceptionPayload::UserMetadata(i.clone())
            }
            Payload::UserSettings(UserSettingsPayload::Inception(i)) => {
                InceptionPayload::UserSettings(i.clone())
            }
            Payload::UserInbox(UserInboxPayload::Inception(i)) => {
                InceptionPayload::UserInbox(i.clone())
            }
            Payload::Media(MediaPayload::Inception(i)) => InceptionPayload::Media(i.clone()),
            Payload::Metadata(MetadataPayload::Inception(i)) => {
                InceptionPayload::Metadata(i.clone())
            }
            _ => return None,
        })
    }

    /// The membership change carried by this payload, if it is one.
    #[must_use]
    pub fn membership(&self) -> Option<&Membership> {
        match self {
            Payload::Member(MemberPayload::Membership(m)) => Some(m),
            _ => None,
        }
    }
}

/// The first event of a stream, typed by stream kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InceptionPayload {
    Space(SpaceInception),
    Channel(ChannelInception),
    DmChannel(DmChannelInception),
    GdmChannel(GdmChannelInception),
    User(UserInception),
    UserMetadata(UserMetadataInception),
    UserSettings(UserSettingsInception),
    UserInbox(UserInboxInception),
    Media(MediaInception),
    Metadata(MetadataInception),
}

impl InceptionPayload {
    #[must_use]
    pub fn stream_id(&self) -> &StreamId {
        match self {
            InceptionPayload::Space(i) => &i.stream_id,
            InceptionPayload::Channel(i) => &i.stream_id,
            InceptionPayload::DmChannel(i) => &i.stream_id,
            InceptionPayload::GdmChannel(i) => &i.stream_id,
            InceptionPayload::User(i) => &i.stream_id,
            InceptionPayload::UserMetadata(i) => &i.stream_id,
            InceptionPayload::UserSettings(i) => &i.stream_id,
            InceptionPayload::UserInbox(i) => &i.stream_id,
            InceptionPayload::Media(i) => &i.stream_id,
            InceptionPayload::Metadata(i) => &i.stream_id,
        }
    }

    /// The kind of payload family this inception belongs to.
    #[must_use]
    pub const fn kind(&self) -> StreamKind {
        match self {
            InceptionPayload::Space(_) => StreamKind::Space,
            InceptionPayload::Channel(_) => StreamKind::Channel,
            InceptionPayload::DmChannel(_) => StreamKind::DmChannel,
            InceptionPayload::GdmChannel(_) => StreamKind::GdmChannel,
            InceptionPayload::User(_) => StreamKind::User,
            InceptionPayload::UserMetadata(_) => StreamKind::UserMetadata,
            InceptionPayload::UserSettings(_) => StreamKind::UserSettings,
            InceptionPayload::UserInbox(_) => StreamKind::UserInbox,
            InceptionPayload::Media(_) => StreamKind::Media,
            InceptionPayload::Metadata(_) => StreamKind::Metadata,
        }
    }

    /// The enclosing stream. Only channels have one: their space.
    #[must_use]
    pub fn stream_parent_id(&self) -> Option<&StreamId> {
        match self {
            InceptionPayload::Channel(i) => Some(&i.space_id),
            _ => None,
        }
    }
}

// =============================================================================
// SPACE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpacePayload {
    Inception(SpaceInception),
    Channel(ChannelUpdate),
    UpdateChannelAutojoin(UpdateChannelAutojoin),
    UpdateChannelHideUserJoinLeaveEvents(UpdateChannelHideUserJoinLeaveEvents),
    SpaceImage(EncryptedData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceInception {
    pub stream_id: StreamId,
    pub settings: Option<StreamSettings>,
}

/// A channel lifecycle change recorded in the space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelUpdate {
    pub op: ChannelOp,
    pub channel_id: StreamId,
    pub origin_event: Option<EventRef>,
    pub channel_properties: Option<EncryptedData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateChannelAutojoin {
    pub channel_id: StreamId,
    pub autojoin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateChannelHideUserJoinLeaveEvents {
    pub channel_id: StreamId,
    pub hide_user_join_leave_events: bool,
}

// =============================================================================
// CHANNEL, DM, GDM
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelPayload {
    Inception(ChannelInception),
    Message(EncryptedData),
    Redaction(Redaction),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInception {
    pub stream_id: StreamId,
    pub space_id: StreamId,
    pub channel_properties: Option<EncryptedData>,
    pub settings: Option<StreamSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Redaction {
    pub event_id: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DmChannelPayload {
    Inception(DmChannelInception),
    Message(EncryptedData),
}

/// DM parties arrive as raw bytes and are length-checked at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmChannelInception {
    pub stream_id: StreamId,
    pub first_party_address: Vec<u8>,
    pub second_party_address: Vec<u8>,
    pub settings: Option<StreamSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GdmChannelPayload {
    Inception(GdmChannelInception),
    Message(EncryptedData),
    ChannelProperties(EncryptedData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GdmChannelInception {
    pub stream_id: StreamId,
    pub channel_properties: Option<EncryptedData>,
    pub settings: Option<StreamSettings>,
}

// =============================================================================
// USER STREAMS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserPayload {
    Inception(UserInception),
    UserMembership(UserMembership),
    UserMembershipAction(UserMembershipAction),
    BlockchainTransaction(BlockchainTransaction),
    ReceivedBlockchainTransaction(ReceivedBlockchainTransaction),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInception {
    pub stream_id: StreamId,
    /// Set when the account is a bot/app registered on chain.
    pub app_address: Option<Address>,
    pub settings: Option<StreamSettings>,
}

/// The user's own record of a membership in another stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMembership {
    pub stream_id: StreamId,
    pub op: MembershipOp,
    pub inviter: Option<Address>,
    pub stream_parent_id: Option<StreamId>,
    pub reason: MembershipReason,
}

/// A request by the stream owner to change someone else's membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMembershipAction {
    pub stream_id: StreamId,
    pub op: MembershipOp,
    pub user_id: Address,
    pub stream_parent_id: Option<StreamId>,
}

/// A tip received from another user, derived by a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedBlockchainTransaction {
    pub transaction: BlockchainTransaction,
    pub from_user_address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserMetadataPayload {
    Inception(UserMetadataInception),
    EncryptionDevice(EncryptionDevice),
    ProfileImage(EncryptedData),
    Bio(EncryptedData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadataInception {
    pub stream_id: StreamId,
    pub settings: Option<StreamSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EncryptionDevice {
    pub device_key: String,
    pub fallback_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserSettingsPayload {
    Inception(UserSettingsInception),
    FullyReadMarkers(FullyReadMarkers),
    UserBlock(UserBlock),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettingsInception {
    pub stream_id: StreamId,
    pub settings: Option<StreamSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullyReadMarkers {
    pub stream_id: StreamId,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBlock {
    pub user_id: Address,
    pub is_blocked: bool,
    pub event_num: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserInboxPayload {
    Inception(UserInboxInception),
    GroupEncryptionSessions(GroupEncryptionSessions),
    Ack(InboxAck),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInboxInception {
    pub stream_id: StreamId,
    pub settings: Option<StreamSettings>,
}

/// Session keys delivered to a user's devices, keyed by device key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEncryptionSessions {
    pub stream_id: StreamId,
    pub sender_key: String,
    pub session_ids: Vec<String>,
    pub ciphertexts: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InboxAck {
    pub device_key: String,
    pub miniblock_num: i64,
}

// =============================================================================
// MEDIA & METADATA
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaPayload {
    Inception(MediaInception),
    Chunk(MediaChunk),
}

/// A media stream is attached to exactly one of: a conversation
/// (`channel_id`, which may be a channel, DM or GDM id), a space, or a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInception {
    pub stream_id: StreamId,
    pub channel_id: Option<StreamId>,
    pub space_id: Option<StreamId>,
    pub user_id: Option<Address>,
    pub chunk_count: i32,
    pub per_chunk_encryption: bool,
    pub settings: Option<StreamSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MediaChunk {
    pub data: Vec<u8>,
    pub chunk_index: i32,
    pub iv: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataPayload {
    Inception(MetadataInception),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataInception {
    pub stream_id: StreamId,
    pub shard: u64,
}

// =============================================================================
// MEMBER (VALID IN EVERY STREAM)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberPayload {
    Membership(Membership),
    KeySolicitation(KeySolicitation),
    KeyFulfillment(KeyFulfillment),
    DisplayName(EncryptedData),
    Username(EncryptedData),
    EnsAddress(Vec<u8>),
    Nft(MemberNft),
    Pin(Pin),
    Unpin(Unpin),
    MemberBlockchainTransaction(MemberBlockchainTransaction),
    EncryptionAlgorithm(EncryptionAlgorithm),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub op: MembershipOp,
    pub user_address: Address,
    pub initiator_address: Address,
    pub stream_parent_id: Option<StreamId>,
    pub reason: MembershipReason,
    pub app_address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeySolicitation {
    pub device_key: String,
    pub fallback_key: String,
    pub is_new_device: bool,
    pub session_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFulfillment {
    pub user_address: Address,
    pub device_key: String,
    pub session_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemberNft {
    pub chain_id: u32,
    pub contract_address: Vec<u8>,
    pub token_id: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    pub event_id: Vec<u8>,
    pub event: Box<StreamEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Unpin {
    pub event_id: Vec<u8>,
}

/// A transaction cascaded into a conversation or space by a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBlockchainTransaction {
    pub transaction: BlockchainTransaction,
    pub from_user_address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EncryptionAlgorithm {
    pub algorithm: Option<String>,
}
