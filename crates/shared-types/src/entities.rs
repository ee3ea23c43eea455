//! # Core Protocol Entities
//!
//! Identity primitives every payload and rule refers to.
//!
//! ## Clusters
//!
//! - **Identity**: [`Address`], [`Hash`]
//! - **Streams**: [`StreamKind`], [`StreamId`]
//! - **Membership**: [`MembershipOp`], [`MembershipReason`], [`ChannelOp`]
//!
//! ## Stream Identifiers
//!
//! The first byte of a stream id names the stream kind. User-scoped streams
//! and spaces embed a 20-byte address after the prefix; every other kind is
//! a 32-byte opaque identifier.
//!
//! | Kind | Prefix | Length |
//! |------|--------|--------|
//! | Space | `0x10` | 21 |
//! | Channel | `0x20` | 32 |
//! | GDM | `0x77` | 32 |
//! | DM | `0x88` | 32 |
//! | User inbox | `0xa1` | 21 |
//! | User settings | `0xa5` | 21 |
//! | User | `0xa8` | 21 |
//! | User metadata | `0xad` | 21 |
//! | Metadata shard | `0xdd` | 32 |
//! | Media | `0xff` | 32 |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorCode, ProtocolError, ProtocolResult};
use crate::hashing::keccak256;

// Re-export U256 from primitive-types for amount arithmetic
pub use primitive_types::U256;

// =============================================================================
// IDENTITY
// =============================================================================

/// A 32-byte Keccak-256 digest.
pub type Hash = [u8; 32];

/// A 20-byte account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address, used where "no app" is meant.
    pub const ZERO: Self = Self([0u8; 20]);

    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an address from a slice. Returns None if wrong length.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 20]>::try_from(slice).ok().map(Self)
    }

    /// Interprets arbitrary bytes as an address: longer inputs keep their
    /// trailing 20 bytes, shorter inputs are left-padded with zeros.
    #[must_use]
    pub fn from_bytes_lossy(bytes: &[u8]) -> Self {
        let mut out = [0u8; 20];
        if bytes.len() >= 20 {
            out.copy_from_slice(&bytes[bytes.len() - 20..]);
        } else {
            out[20 - bytes.len()..].copy_from_slice(bytes);
        }
        Self(out)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// STREAMS
// =============================================================================

/// The kind of a stream, encoded in the first byte of its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StreamKind {
    Space,
    Channel,
    DmChannel,
    GdmChannel,
    User,
    UserMetadata,
    UserSettings,
    UserInbox,
    Media,
    Metadata,
}

impl StreamKind {
    pub const ALL: [StreamKind; 10] = [
        StreamKind::Space,
        StreamKind::Channel,
        StreamKind::DmChannel,
        StreamKind::GdmChannel,
        StreamKind::User,
        StreamKind::UserMetadata,
        StreamKind::UserSettings,
        StreamKind::UserInbox,
        StreamKind::Media,
        StreamKind::Metadata,
    ];

    #[must_use]
    pub const fn prefix(self) -> u8 {
        match self {
            StreamKind::Space => 0x10,
            StreamKind::Channel => 0x20,
            StreamKind::GdmChannel => 0x77,
            StreamKind::DmChannel => 0x88,
            StreamKind::UserInbox => 0xa1,
            StreamKind::UserSettings => 0xa5,
            StreamKind::User => 0xa8,
            StreamKind::UserMetadata => 0xad,
            StreamKind::Metadata => 0xdd,
            StreamKind::Media => 0xff,
        }
    }

    #[must_use]
    pub fn from_prefix(prefix: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.prefix() == prefix)
    }

    /// Total id length in bytes, prefix included.
    #[must_use]
    pub const fn id_len(self) -> usize {
        if self.embeds_address() {
            21
        } else {
            32
        }
    }

    /// Spaces and user-scoped streams carry an address after the prefix.
    #[must_use]
    pub const fn embeds_address(self) -> bool {
        matches!(
            self,
            StreamKind::Space
                | StreamKind::User
                | StreamKind::UserMetadata
                | StreamKind::UserSettings
                | StreamKind::UserInbox
        )
    }

    /// Streams owned by a single user account.
    #[must_use]
    pub const fn is_user_scoped(self) -> bool {
        matches!(
            self,
            StreamKind::User
                | StreamKind::UserMetadata
                | StreamKind::UserSettings
                | StreamKind::UserInbox
        )
    }

    /// Streams a tip or token transfer can reference as its channel.
    #[must_use]
    pub const fn is_conversation(self) -> bool {
        matches!(
            self,
            StreamKind::Channel | StreamKind::DmChannel | StreamKind::GdmChannel
        )
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            StreamKind::Space => "space",
            StreamKind::Channel => "channel",
            StreamKind::DmChannel => "dm_channel",
            StreamKind::GdmChannel => "gdm_channel",
            StreamKind::User => "user",
            StreamKind::UserMetadata => "user_metadata",
            StreamKind::UserSettings => "user_settings",
            StreamKind::UserInbox => "user_inbox",
            StreamKind::Media => "media",
            StreamKind::Metadata => "metadata",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated stream identifier.
///
/// The kind is resolved from the prefix once, at construction. `bytes`
/// comes first so comparisons and hashing follow the wire bytes.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct StreamId {
    bytes: Vec<u8>,
    kind: StreamKind,
}

impl StreamId {
    /// Parses a stream id from its wire bytes.
    pub fn from_bytes(bytes: &[u8]) -> ProtocolResult<Self> {
        let Some(&prefix) = bytes.first() else {
            return Err(ProtocolError::new(ErrorCode::BadStreamId, "empty stream id"));
        };
        let kind = StreamKind::from_prefix(prefix).ok_or_else(|| {
            ProtocolError::new(ErrorCode::BadStreamId, "unknown stream id prefix")
                .tag("prefix", format!("{prefix:#04x}"))
        })?;
        if bytes.len() != kind.id_len() {
            return Err(
                ProtocolError::new(ErrorCode::BadStreamId, "invalid stream id length")
                    .tag("kind", kind)
                    .tag("len", bytes.len()),
            );
        }
        Ok(Self {
            bytes: bytes.to_vec(),
            kind,
        })
    }

    /// Builds an id of `kind` from the bytes that follow the prefix.
    pub fn from_parts(kind: StreamKind, body: &[u8]) -> ProtocolResult<Self> {
        let mut bytes = Vec::with_capacity(1 + body.len());
        bytes.push(kind.prefix());
        bytes.extend_from_slice(body);
        Self::from_bytes(&bytes)
    }

    /// The id of a stream that embeds `address` (space or user-scoped).
    pub fn for_address(kind: StreamKind, address: &Address) -> ProtocolResult<Self> {
        if !kind.embeds_address() {
            return Err(
                ProtocolError::new(ErrorCode::BadStreamId, "stream kind does not embed an address")
                    .tag("kind", kind),
            );
        }
        Self::from_parts(kind, address.as_bytes())
    }

    /// The user stream of `user`.
    #[must_use]
    pub fn user_stream(user: &Address) -> Self {
        Self::address_id(StreamKind::User, user)
    }

    /// The space stream for the on-chain space contract at `space`.
    #[must_use]
    pub fn space(space: &Address) -> Self {
        Self::address_id(StreamKind::Space, space)
    }

    fn address_id(kind: StreamKind, address: &Address) -> Self {
        let mut bytes = Vec::with_capacity(21);
        bytes.push(kind.prefix());
        bytes.extend_from_slice(address.as_bytes());
        Self { bytes, kind }
    }

    /// The canonical DM stream id for a pair of parties. Order-independent.
    #[must_use]
    pub fn dm_between(a: &Address, b: &Address) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let mut preimage = [0u8; 40];
        preimage[..20].copy_from_slice(low.as_bytes());
        preimage[20..].copy_from_slice(high.as_bytes());
        let digest = keccak256(&preimage);
        let mut bytes = Vec::with_capacity(32);
        bytes.push(StreamKind::DmChannel.prefix());
        bytes.extend_from_slice(&digest[..31]);
        Self {
            bytes,
            kind: StreamKind::DmChannel,
        }
    }

    #[must_use]
    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The address embedded in a space or user-scoped stream id.
    pub fn embedded_address(&self) -> ProtocolResult<Address> {
        let kind = self.kind();
        if !kind.embeds_address() {
            return Err(
                ProtocolError::new(ErrorCode::BadStreamId, "stream id does not embed an address")
                    .tag("stream_id", self)
                    .tag("kind", kind),
            );
        }
        Address::from_slice(&self.bytes[1..]).ok_or_else(|| {
            ProtocolError::new(ErrorCode::BadStreamId, "invalid stream id length")
                .tag("stream_id", self)
        })
    }
}

impl TryFrom<Vec<u8>> for StreamId {
    type Error = ProtocolError;

    fn try_from(bytes: Vec<u8>) -> ProtocolResult<Self> {
        Self::from_bytes(&bytes)
    }
}

impl From<StreamId> for Vec<u8> {
    fn from(id: StreamId) -> Self {
        id.bytes
    }
}

impl AsRef<[u8]> for StreamId {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.bytes))
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// MEMBERSHIP
// =============================================================================

/// Membership state of a user in a stream, and the operation requesting a
/// change of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum MembershipOp {
    #[default]
    Unspecified,
    Invite,
    Join,
    Leave,
}

impl MembershipOp {
    pub const ALL: [MembershipOp; 4] = [
        MembershipOp::Unspecified,
        MembershipOp::Invite,
        MembershipOp::Join,
        MembershipOp::Leave,
    ];
}

impl fmt::Display for MembershipOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MembershipOp::Unspecified => "MEMBERSHIP_OP_UNSPECIFIED",
            MembershipOp::Invite => "MEMBERSHIP_OP_INVITE",
            MembershipOp::Join => "MEMBERSHIP_OP_JOIN",
            MembershipOp::Leave => "MEMBERSHIP_OP_LEAVE",
        })
    }
}

/// Why a membership changed. Only node-authored leaves carry a reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MembershipReason {
    #[default]
    None,
    NotEntitled,
    Banned,
    Expired,
}

/// Lifecycle operation on a channel recorded in its space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChannelOp {
    #[default]
    Unspecified,
    Created,
    Deleted,
    Updated,
}

impl fmt::Display for ChannelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChannelOp::Unspecified => "CO_UNSPECIFIED",
            ChannelOp::Created => "CO_CHANNEL_CREATED",
            ChannelOp::Deleted => "CO_CHANNEL_DELETED",
            ChannelOp::Updated => "CO_CHANNEL_UPDATED",
        })
    }
}
