//! In-memory [`StreamView`] materialized from a list of events.
//!
//! Hosts with persistent storage implement [`StreamView`] over their own
//! state. This adapter folds events in memory and is what the integration
//! tests drive the engines through.

use std::collections::{BTreeMap, BTreeSet};

use shared_types::{
    Address, BlockchainTransaction, ChannelUpdate, ErrorCode, EvmReceipt, Hash, InceptionPayload,
    KeySolicitation, MemberPayload, MembershipOp, ParsedEvent, Payload, ProtocolError,
    ProtocolResult, SolanaReceipt, SpacePayload, StreamId, UserPayload,
};
use tracing::trace;

use crate::config::OnChainSettings;
use crate::ports::outbound::{PinnedMessage, StreamView};

/// Materialized state of one stream.
#[derive(Debug, Clone)]
pub struct InMemoryStreamView {
    stream_id: StreamId,
    inception: InceptionPayload,
    miniblocks: BTreeMap<i64, Hash>,
    event_hashes: BTreeSet<Hash>,
    memberships: BTreeMap<Address, MembershipOp>,
    app_addresses: BTreeMap<Address, Address>,
    user_memberships: BTreeMap<StreamId, MembershipOp>,
    pins: Vec<PinnedMessage>,
    solicitations: BTreeMap<Address, Vec<KeySolicitation>>,
    channels: BTreeMap<StreamId, ChannelUpdate>,
    app_user: bool,
    evm_transactions: BTreeSet<(u64, Vec<u8>)>,
    solana_transactions: BTreeSet<String>,
}

impl InMemoryStreamView {
    #[must_use]
    pub fn new(inception: InceptionPayload) -> Self {
        let app_user = matches!(
            &inception,
            InceptionPayload::User(user) if user.app_address.is_some_and(|app| !app.is_zero())
        );
        Self {
            stream_id: inception.stream_id().clone(),
            inception,
            miniblocks: BTreeMap::new(),
            event_hashes: BTreeSet::new(),
            memberships: BTreeMap::new(),
            app_addresses: BTreeMap::new(),
            user_memberships: BTreeMap::new(),
            pins: Vec::new(),
            solicitations: BTreeMap::new(),
            channels: BTreeMap::new(),
            app_user,
            evm_transactions: BTreeSet::new(),
            solana_transactions: BTreeSet::new(),
        }
    }

    /// Builds a view from an inception bundle followed by any later events.
    pub fn from_events(events: &[ParsedEvent]) -> ProtocolResult<Self> {
        let inception = events
            .first()
            .and_then(ParsedEvent::payload)
            .and_then(Payload::inception)
            .ok_or_else(|| ProtocolError::new(ErrorCode::BadEvent, "first event is not an inception"))?;
        let mut view = Self::new(inception);
        for event in events {
            view.apply(event);
        }
        Ok(view)
    }

    /// Records a sealed miniblock events may reference.
    #[must_use]
    pub fn with_miniblock(mut self, num: i64, hash: Hash) -> Self {
        self.miniblocks.insert(num, hash);
        self
    }

    #[must_use]
    pub fn with_member(mut self, user: Address, op: MembershipOp) -> Self {
        self.memberships.insert(user, op);
        self
    }

    #[must_use]
    pub fn with_members(self, users: impl IntoIterator<Item = Address>) -> Self {
        users
            .into_iter()
            .fold(self, |view, user| view.with_member(user, MembershipOp::Join))
    }

    #[must_use]
    pub fn with_member_app(mut self, user: Address, app: Address) -> Self {
        self.app_addresses.insert(user, app);
        self
    }

    #[must_use]
    pub fn with_user_membership(mut self, stream_id: StreamId, op: MembershipOp) -> Self {
        self.user_memberships.insert(stream_id, op);
        self
    }

    #[must_use]
    pub fn with_channel(mut self, update: ChannelUpdate) -> Self {
        self.channels.insert(update.channel_id.clone(), update);
        self
    }

    #[must_use]
    pub fn with_pin(mut self, event_id: Vec<u8>, creator: Address) -> Self {
        self.pins.push(PinnedMessage { event_id, creator });
        self
    }

    #[must_use]
    pub fn with_key_solicitation(mut self, user: Address, solicitation: KeySolicitation) -> Self {
        self.add_solicitation(user, solicitation);
        self
    }

    #[must_use]
    pub fn with_transaction(mut self, transaction: &BlockchainTransaction) -> Self {
        self.record_transaction(transaction);
        self
    }

    /// Folds an accepted event into the state.
    pub fn apply(&mut self, parsed: &ParsedEvent) {
        self.event_hashes.insert(parsed.hash);
        let creator = *parsed.creator();
        let Some(payload) = parsed.payload() else {
            return;
        };
        trace!(stream_id = %self.stream_id, payload = payload.name(), "applying event");
        match payload {
            Payload::Member(member) => self.apply_member(creator, member),
            Payload::Space(SpacePayload::Channel(update)) => {
                self.channels.insert(update.channel_id.clone(), update.clone());
            }
            Payload::User(UserPayload::UserMembership(membership)) => {
                self.user_memberships
                    .insert(membership.stream_id.clone(), membership.op);
            }
            Payload::User(UserPayload::BlockchainTransaction(transaction)) => {
                self.record_transaction(transaction);
            }
            Payload::User(UserPayload::ReceivedBlockchainTransaction(received)) => {
                self.record_transaction(&received.transaction);
            }
            _ => {}
        }
    }

    fn apply_member(&mut self, creator: Address, member: &MemberPayload) {
        match member {
            MemberPayload::Membership(membership) => {
                self.memberships.insert(membership.user_address, membership.op);
                if let Some(app) = membership.app_address {
                    self.app_addresses.insert(membership.user_address, app);
                }
            }
            MemberPayload::KeySolicitation(solicitation) => {
                self.add_solicitation(creator, solicitation.clone());
            }
            MemberPayload::KeyFulfillment(fulfillment) => {
                if let Some(list) = self.solicitations.get_mut(&fulfillment.user_address) {
                    for solicitation in list.iter_mut().filter(|s| s.device_key == fulfillment.device_key) {
                        solicitation.is_new_device = false;
                        solicitation
                            .session_ids
                            .retain(|id| fulfillment.session_ids.binary_search(id).is_err());
                    }
                }
            }
            MemberPayload::Pin(pin) => self.pins.push(PinnedMessage {
                event_id: pin.event_id.clone(),
                creator,
            }),
            MemberPayload::Unpin(unpin) => self.pins.retain(|p| p.event_id != unpin.event_id),
            MemberPayload::MemberBlockchainTransaction(member) => {
                self.record_transaction(&member.transaction);
            }
            _ => {}
        }
    }

    /// A newer solicitation from the same device replaces the older one.
    fn add_solicitation(&mut self, user: Address, solicitation: KeySolicitation) {
        let list = self.solicitations.entry(user).or_default();
        list.retain(|s| s.device_key != solicitation.device_key);
        list.push(solicitation);
    }

    fn record_transaction(&mut self, transaction: &BlockchainTransaction) {
        if let Some(receipt) = &transaction.receipt {
            self.evm_transactions
                .insert((receipt.chain_id, receipt.transaction_hash.clone()));
        }
        if let Some(signature) = transaction.solana_receipt.as_ref().and_then(SolanaReceipt::signature) {
            self.solana_transactions.insert(signature.to_string());
        }
    }
}

impl StreamView for InMemoryStreamView {
    fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    fn inception(&self) -> &InceptionPayload {
        &self.inception
    }

    fn validate_next_event(
        &self,
        _settings: &OnChainSettings,
        event: &ParsedEvent,
        _now_ms: u64,
    ) -> ProtocolResult<()> {
        let Some(reference) = event.miniblock_ref else {
            return Err(ProtocolError::new(
                ErrorCode::BadPrevMiniblockHash,
                "event does not reference a miniblock",
            ));
        };
        if self.miniblocks.get(&reference.num) != Some(&reference.hash) {
            return Err(ProtocolError::new(
                ErrorCode::BadPrevMiniblockHash,
                "event references an unknown miniblock",
            )
            .tag("num", reference.num)
            .tag("hash", hex::encode(reference.hash)));
        }
        if self.event_hashes.contains(&event.hash) {
            return Err(
                ProtocolError::new(ErrorCode::DuplicateEvent, "event is already in the stream")
                    .tag("hash", hex::encode(event.hash)),
            );
        }
        Ok(())
    }

    fn membership(&self, user: &Address) -> ProtocolResult<MembershipOp> {
        Ok(self.memberships.get(user).copied().unwrap_or_default())
    }

    fn joined_member_count(&self) -> ProtocolResult<usize> {
        Ok(self
            .memberships
            .values()
            .filter(|op| **op == MembershipOp::Join)
            .count())
    }

    fn user_membership(&self, stream_id: &StreamId) -> ProtocolResult<MembershipOp> {
        Ok(self.user_memberships.get(stream_id).copied().unwrap_or_default())
    }

    fn pinned_messages(&self) -> ProtocolResult<Vec<PinnedMessage>> {
        Ok(self.pins.clone())
    }

    fn key_solicitations(&self, user: &Address) -> ProtocolResult<Vec<KeySolicitation>> {
        Ok(self.solicitations.get(user).cloned().unwrap_or_default())
    }

    fn channel_info(&self, channel_id: &StreamId) -> ProtocolResult<Option<ChannelUpdate>> {
        Ok(self.channels.get(channel_id).cloned())
    }

    fn member_app_address(&self, user: &Address) -> ProtocolResult<Address> {
        Ok(self.app_addresses.get(user).copied().unwrap_or(Address::ZERO))
    }

    fn is_app_user(&self) -> ProtocolResult<bool> {
        Ok(self.app_user)
    }

    fn has_transaction(
        &self,
        receipt: Option<&EvmReceipt>,
        solana_receipt: Option<&SolanaReceipt>,
    ) -> ProtocolResult<bool> {
        let evm_seen = receipt.is_some_and(|r| {
            self.evm_transactions
                .contains(&(r.chain_id, r.transaction_hash.clone()))
        });
        let solana_seen = solana_receipt
            .and_then(SolanaReceipt::signature)
            .is_some_and(|signature| self.solana_transactions.contains(signature));
        Ok(evm_seen || solana_seen)
    }
}
