//! Shared fixtures: a service harness and ready-made stream views.

use std::collections::BTreeMap;

use shared_types::{
    make_member_membership, Address, ChannelInception, DmChannelInception, EncryptedData,
    GdmChannelInception, InceptionPayload, MembershipOp, MembershipReason, ParsedEvent, Payload,
    ProtocolResult, SpaceInception, StreamId, StreamKind, UserInception,
};
use stream_rules::adapters::{InMemoryStreamView, StaticChainConfig, ValidNodes};
use stream_rules::ports::StreamRulesApi;
use stream_rules::test_utils::{make_event, opaque_stream_id, GENESIS_MINIBLOCK_HASH};
use stream_rules::{AddEventOutcome, CreateStreamRules, OnChainSettings, RulesConfig, StreamRulesService};

// =============================================================================
// IDENTITIES
// =============================================================================

pub const NODE: Address = Address([0xaa; 20]);
pub const OPERATOR: Address = Address([0xee; 20]);
pub const ALICE: Address = Address([0x01; 20]);
pub const BOB: Address = Address([0x02; 20]);
pub const CAROL: Address = Address([0x03; 20]);
pub const DAVE: Address = Address([0x04; 20]);
pub const ERIN: Address = Address([0x05; 20]);
pub const APP: Address = Address([0x99; 20]);

/// Fixed clock for every call.
pub const NOW_MS: u64 = 1_700_000_000_000;

pub fn space_id() -> StreamId {
    StreamId::space(&Address([0x51; 20]))
}

pub fn channel_id() -> StreamId {
    opaque_stream_id(StreamKind::Channel, 0x20)
}

pub fn gdm_id() -> StreamId {
    opaque_stream_id(StreamKind::GdmChannel, 0x77)
}

/// Installs a test subscriber once; honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// HARNESS
// =============================================================================

/// The service under test with a single registered node.
pub struct Harness {
    service: StreamRulesService<StaticChainConfig, ValidNodes>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(RulesConfig::default(), OnChainSettings::default())
    }

    pub fn with_settings(settings: OnChainSettings) -> Self {
        Self::with(RulesConfig::default(), settings)
    }

    pub fn with(config: RulesConfig, settings: OnChainSettings) -> Self {
        init_tracing();
        let chain_config = StaticChainConfig::new(settings).expect("valid settings");
        let nodes = ValidNodes::new([NODE]).with_operators([OPERATOR]);
        let service = StreamRulesService::new(config, chain_config, nodes).expect("valid config");
        Self { service }
    }

    pub fn add(&self, event: &ParsedEvent, view: &InMemoryStreamView) -> ProtocolResult<AddEventOutcome> {
        self.service.can_add_event(event, view, NOW_MS)
    }

    pub fn create(&self, stream_id: &StreamId, events: &[ParsedEvent]) -> ProtocolResult<CreateStreamRules> {
        self.create_with_metadata(stream_id, events, &BTreeMap::new())
    }

    pub fn create_with_metadata(
        &self,
        stream_id: &StreamId,
        events: &[ParsedEvent],
        metadata: &BTreeMap<String, Vec<u8>>,
    ) -> ProtocolResult<CreateStreamRules> {
        self.service.can_create_stream(stream_id, events, metadata, NOW_MS)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// VIEWS
// =============================================================================

fn with_genesis(view: InMemoryStreamView) -> InMemoryStreamView {
    view.with_miniblock(0, GENESIS_MINIBLOCK_HASH)
}

pub fn space_view(members: &[Address]) -> InMemoryStreamView {
    with_genesis(InMemoryStreamView::new(InceptionPayload::Space(SpaceInception {
        stream_id: space_id(),
        settings: None,
    })))
    .with_members(members.iter().copied())
}

pub fn channel_view(members: &[Address]) -> InMemoryStreamView {
    with_genesis(InMemoryStreamView::new(InceptionPayload::Channel(ChannelInception {
        stream_id: channel_id(),
        space_id: space_id(),
        channel_properties: None,
        settings: None,
    })))
    .with_members(members.iter().copied())
}

pub fn dm_view(first: Address, second: Address) -> InMemoryStreamView {
    with_genesis(InMemoryStreamView::new(InceptionPayload::DmChannel(DmChannelInception {
        stream_id: StreamId::dm_between(&first, &second),
        first_party_address: first.as_slice().to_vec(),
        second_party_address: second.as_slice().to_vec(),
        settings: None,
    })))
    .with_members([first, second])
}

pub fn gdm_view(members: &[Address]) -> InMemoryStreamView {
    with_genesis(InMemoryStreamView::new(InceptionPayload::GdmChannel(GdmChannelInception {
        stream_id: gdm_id(),
        channel_properties: Some(EncryptedData::default()),
        settings: None,
    })))
    .with_members(members.iter().copied())
}

/// A user stream whose owner is joined to it.
pub fn user_view(owner: Address, app_address: Option<Address>) -> InMemoryStreamView {
    with_genesis(InMemoryStreamView::new(InceptionPayload::User(UserInception {
        stream_id: StreamId::user_stream(&owner),
        app_address,
        settings: None,
    })))
    .with_member(owner, MembershipOp::Join)
}

// =============================================================================
// EVENTS
// =============================================================================

/// A node-authored membership change.
pub fn membership_event(
    op: MembershipOp,
    user: Address,
    initiator: Address,
    parent: Option<StreamId>,
) -> ParsedEvent {
    make_event(
        NODE,
        make_member_membership(op, user, initiator, parent, MembershipReason::None, None),
    )
}

pub fn message(creator: Address) -> ParsedEvent {
    make_event(
        creator,
        Payload::Channel(shared_types::ChannelPayload::Message(EncryptedData::default())),
    )
}
