//! Test helpers: deterministic ids and ABI-encoded receipt logs.

use primitive_types::U256;
use shared_types::{
    Address, ParsedEvent, Payload, ReceiptLog, ReviewAction, SolanaTokenAmount, SolanaTokenBalance,
    StreamEvent, StreamId, StreamKind,
};

use crate::domain::receipts::{
    event_topic, REVIEW_ADDED_EVENT_SIGNATURE, REVIEW_DELETED_EVENT_SIGNATURE,
    REVIEW_UPDATED_EVENT_SIGNATURE, TIP_EVENT_SIGNATURE, TRANSFER_EVENT_SIGNATURE,
};

/// Miniblock hash every test view knows about.
pub const GENESIS_MINIBLOCK_HASH: [u8; 32] = [0x6d; 32];

/// An id of `kind` whose body is filled with `fill`.
#[must_use]
pub fn opaque_stream_id(kind: StreamKind, fill: u8) -> StreamId {
    let mut bytes = vec![fill; kind.id_len()];
    bytes[0] = kind.prefix();
    StreamId::from_bytes(&bytes).unwrap_or_else(|_| StreamId::user_stream(&Address([fill; 20])))
}

/// Wraps `payload` into a parsed event referencing the genesis miniblock.
#[must_use]
pub fn make_event(creator: Address, payload: Payload) -> ParsedEvent {
    parse(StreamEvent::new(creator, payload).with_prev_miniblock(0, GENESIS_MINIBLOCK_HASH))
}

/// Wraps `payload` into an inception-bundle event (no miniblock reference).
#[must_use]
pub fn make_inception_event(creator: Address, payload: Payload) -> ParsedEvent {
    parse(StreamEvent::new(creator, payload))
}

/// Parses an already-built event.
#[must_use]
pub fn parse(event: StreamEvent) -> ParsedEvent {
    match ParsedEvent::new(event, vec![0x5a; 65]) {
        Ok(parsed) => parsed,
        Err(err) => panic!("test event failed to hash: {err}"),
    }
}

fn address_word(address: &Address) -> Vec<u8> {
    let mut word = vec![0u8; 12];
    word.extend_from_slice(address.as_slice());
    word
}

fn u256_word(value: U256) -> Vec<u8> {
    let mut word = vec![0u8; 32];
    value.to_big_endian(&mut word);
    word
}

/// Field values of an on-chain `Tip` log.
#[derive(Debug, Clone)]
pub struct TipLogFields {
    pub token_id: u64,
    pub currency: Address,
    pub sender: Address,
    pub receiver: Address,
    pub amount: u64,
    pub message_id: [u8; 32],
    pub channel_id: [u8; 32],
}

#[must_use]
pub fn tip_log(contract: &Address, fields: &TipLogFields) -> ReceiptLog {
    let mut data = address_word(&fields.sender);
    data.extend(address_word(&fields.receiver));
    data.extend(u256_word(U256::from(fields.amount)));
    data.extend_from_slice(&fields.message_id);
    data.extend_from_slice(&fields.channel_id);
    ReceiptLog {
        address: contract.as_slice().to_vec(),
        topics: vec![
            event_topic(TIP_EVENT_SIGNATURE).to_vec(),
            u256_word(U256::from(fields.token_id)),
            address_word(&fields.currency),
        ],
        data,
    }
}

#[must_use]
pub fn transfer_log(token: &Address, from: &Address, to: &Address, value: U256) -> ReceiptLog {
    ReceiptLog {
        address: token.as_slice().to_vec(),
        topics: vec![
            event_topic(TRANSFER_EVENT_SIGNATURE).to_vec(),
            address_word(from),
            address_word(to),
        ],
        data: u256_word(value),
    }
}

#[must_use]
pub fn review_log(space: &Address, action: ReviewAction, user: &Address, rating: u8) -> ReceiptLog {
    let signature = match action {
        ReviewAction::Update => REVIEW_UPDATED_EVENT_SIGNATURE,
        ReviewAction::Delete => REVIEW_DELETED_EVENT_SIGNATURE,
        ReviewAction::Add | ReviewAction::Unspecified => REVIEW_ADDED_EVENT_SIGNATURE,
    };
    let data = if action == ReviewAction::Delete {
        Vec::new()
    } else {
        // offset of the comment, the rating, then an empty string
        let mut data = u256_word(U256::from(64));
        data.extend(u256_word(U256::from(rating)));
        data.extend(u256_word(U256::zero()));
        data
    };
    ReceiptLog {
        address: space.as_slice().to_vec(),
        topics: vec![event_topic(signature).to_vec(), address_word(user)],
        data,
    }
}

#[must_use]
pub fn solana_balance(mint: &str, owner: &str, amount: &str) -> SolanaTokenBalance {
    SolanaTokenBalance {
        mint: mint.to_string(),
        owner: owner.to_string(),
        amount: SolanaTokenAmount {
            amount: amount.to_string(),
            decimals: 6,
        },
    }
}
