//! # Receipt Verifier
//!
//! Matches the content a user claims for a blockchain transaction against
//! the receipt they attached.
//!
//! ## EVM
//!
//! Logs are decoded by hand: `topics[0]` is the Keccak-256 of the event
//! signature, indexed arguments follow as topics, and the remaining
//! arguments are packed into 32-byte words in `data`.
//!
//! | Content | Event | Match |
//! |---------|-------|-------|
//! | Tip | `Tip(uint256,address,address,address,uint256,bytes32,bytes32)` | every field |
//! | Token transfer | `Transfer(address,address,uint256)` | token, value, sender side |
//! | Review add/update | `ReviewAdded` / `ReviewUpdated` `(address,string,uint8)` | space, user, rating |
//! | Review delete | `ReviewDeleted(address)` | space, user |
//!
//! ## Solana
//!
//! Only token transfers are supported. The sender's balance of the mint
//! before and after the transaction must differ by exactly the claimed
//! amount, in the direction the trade claims.

use primitive_types::U256;
use shared_types::{
    keccak256, Address, ErrorCode, EvmReceipt, Hash, ProtocolError, ProtocolResult, ReceiptLog,
    ReviewAction, SolanaReceipt, SolanaTokenBalance, SpaceReview, Tip, TokenTransfer,
    TransactionContent,
};

pub const TIP_EVENT_SIGNATURE: &str =
    "Tip(uint256,address,address,address,uint256,bytes32,bytes32)";
pub const TRANSFER_EVENT_SIGNATURE: &str = "Transfer(address,address,uint256)";
pub const REVIEW_ADDED_EVENT_SIGNATURE: &str = "ReviewAdded(address,string,uint8)";
pub const REVIEW_UPDATED_EVENT_SIGNATURE: &str = "ReviewUpdated(address,string,uint8)";
pub const REVIEW_DELETED_EVENT_SIGNATURE: &str = "ReviewDeleted(address)";

/// `topics[0]` of a log emitted by the event with this signature.
#[must_use]
pub fn event_topic(signature: &str) -> Hash {
    keccak256(signature.as_bytes())
}

fn invalid(message: &'static str) -> ProtocolError {
    ProtocolError::new(ErrorCode::InvalidArgument, message)
}

// =============================================================================
// ABI DECODING
// =============================================================================

/// Whether `log` was emitted by `signature` with `topic_count` well-formed
/// topics.
fn is_event(log: &ReceiptLog, signature: &str, topic_count: usize) -> bool {
    log.topics.len() == topic_count
        && log.topics.iter().all(|topic| topic.len() == 32)
        && log.topics[0] == event_topic(signature)
}

fn data_word(data: &[u8], index: usize) -> Option<&[u8]> {
    data.get(index * 32..(index + 1) * 32)
}

fn word_to_address(word: &[u8]) -> Address {
    Address::from_bytes_lossy(word)
}

fn word_to_u256(word: &[u8]) -> U256 {
    U256::from_big_endian(word)
}

fn word_to_bytes32(word: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let start = 32usize.saturating_sub(word.len());
    out[start..].copy_from_slice(&word[word.len().saturating_sub(32)..]);
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipLog {
    pub token_id: U256,
    pub currency: Address,
    pub sender: Address,
    pub receiver: Address,
    pub amount: U256,
    pub message_id: [u8; 32],
    pub channel_id: [u8; 32],
}

/// Decodes a `Tip` log; `None` when the log is something else.
#[must_use]
pub fn decode_tip(log: &ReceiptLog) -> Option<TipLog> {
    if !is_event(log, TIP_EVENT_SIGNATURE, 3) {
        return None;
    }
    Some(TipLog {
        token_id: word_to_u256(&log.topics[1]),
        currency: word_to_address(&log.topics[2]),
        sender: word_to_address(data_word(&log.data, 0)?),
        receiver: word_to_address(data_word(&log.data, 1)?),
        amount: word_to_u256(data_word(&log.data, 2)?),
        message_id: word_to_bytes32(data_word(&log.data, 3)?),
        channel_id: word_to_bytes32(data_word(&log.data, 4)?),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLog {
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

/// Decodes an ERC-20 `Transfer` log.
#[must_use]
pub fn decode_transfer(log: &ReceiptLog) -> Option<TransferLog> {
    if !is_event(log, TRANSFER_EVENT_SIGNATURE, 3) {
        return None;
    }
    Some(TransferLog {
        from: word_to_address(&log.topics[1]),
        to: word_to_address(&log.topics[2]),
        value: word_to_u256(data_word(&log.data, 0)?),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewLog {
    pub user: Address,
    /// Absent for deletions.
    pub rating: Option<u8>,
}

/// Decodes the review log emitted for `action`.
#[must_use]
pub fn decode_review(log: &ReceiptLog, action: ReviewAction) -> Option<ReviewLog> {
    let signature = match action {
        ReviewAction::Add => REVIEW_ADDED_EVENT_SIGNATURE,
        ReviewAction::Update => REVIEW_UPDATED_EVENT_SIGNATURE,
        ReviewAction::Delete => REVIEW_DELETED_EVENT_SIGNATURE,
        ReviewAction::Unspecified => return None,
    };
    if !is_event(log, signature, 2) {
        return None;
    }
    let user = word_to_address(&log.topics[1]);
    if action == ReviewAction::Delete {
        return Some(ReviewLog { user, rating: None });
    }
    // (string comment, uint8 rating): word 0 is the string offset.
    let rating = word_to_u256(data_word(&log.data, 1)?);
    if rating > U256::from(u8::MAX) {
        return None;
    }
    Some(ReviewLog {
        user,
        rating: Some(rating.low_u32() as u8),
    })
}

// =============================================================================
// AMOUNTS
// =============================================================================

/// Parses an unsigned integer in `radix`, with overflow detection.
fn parse_radix(digits: &str, radix: u32) -> Option<U256> {
    if digits.is_empty() {
        return None;
    }
    let base = U256::from(radix);
    digits.chars().filter(|c| *c != '_').try_fold(U256::zero(), |acc, c| {
        let digit = c.to_digit(radix)?;
        acc.checked_mul(base)?.checked_add(U256::from(digit))
    })
}

/// Parses a decimal amount.
#[must_use]
pub fn parse_decimal_amount(amount: &str) -> Option<U256> {
    if amount.contains('_') {
        return None;
    }
    parse_radix(amount, 10)
}

/// Parses an amount whose base is given by its prefix (`0x`, `0o`, `0b`,
/// else decimal). A leading sign is accepted; the magnitude is returned.
#[must_use]
pub fn parse_prefixed_amount(amount: &str) -> Option<U256> {
    let magnitude = amount
        .strip_prefix('-')
        .or_else(|| amount.strip_prefix('+'))
        .unwrap_or(amount);
    let lower = magnitude.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        parse_radix(hex, 16)
    } else if let Some(octal) = lower.strip_prefix("0o") {
        parse_radix(octal, 8)
    } else if let Some(binary) = lower.strip_prefix("0b") {
        parse_radix(binary, 2)
    } else {
        parse_radix(&lower, 10)
    }
}

// =============================================================================
// EVM MATCHING
// =============================================================================

/// Checks that `receipt` contains a log proving `content`. Content-less
/// transactions carry no claim and always match.
pub fn verify_evm_receipt(
    receipt: &EvmReceipt,
    content: Option<&TransactionContent>,
) -> ProtocolResult<()> {
    match content {
        None => Ok(()),
        Some(TransactionContent::Tip(tip)) => match_tip(receipt, tip),
        Some(TransactionContent::TokenTransfer(transfer)) => match_transfer(receipt, transfer),
        Some(TransactionContent::SpaceReview(review)) => match_review(receipt, review),
    }
}

fn match_tip(receipt: &EvmReceipt, tip: &Tip) -> ProtocolResult<()> {
    let claimed = &tip.event;
    let found = receipt.logs.iter().filter_map(decode_tip).any(|log| {
        log.token_id == U256::from(claimed.token_id)
            && log.currency.as_slice() == claimed.currency
            && log.sender.as_slice() == claimed.sender
            && log.receiver.as_slice() == claimed.receiver
            && log.amount == U256::from(claimed.amount)
            && log.message_id.as_slice() == claimed.message_id
            && log.channel_id.as_slice() == claimed.channel_id
    });
    if found {
        Ok(())
    } else {
        Err(invalid("matching tip event not found in receipt logs")
            .tag("transaction_hash", hex::encode(&receipt.transaction_hash)))
    }
}

fn match_transfer(receipt: &EvmReceipt, transfer: &TokenTransfer) -> ProtocolResult<()> {
    let amount = parse_decimal_amount(&transfer.amount)
        .ok_or_else(|| invalid("failed to parse amount").tag("amount", &transfer.amount))?;
    let sender = Address::from_bytes_lossy(&transfer.sender);
    let found = receipt
        .logs
        .iter()
        .filter(|log| log.address == transfer.address)
        .filter_map(decode_transfer)
        .any(|log| {
            let party = if transfer.is_buy { log.to } else { log.from };
            log.value == amount && party == sender
        });
    if found {
        Ok(())
    } else {
        Err(invalid("matching transfer event not found in receipt logs")
            .tag("transaction_hash", hex::encode(&receipt.transaction_hash)))
    }
}

fn match_review(receipt: &EvmReceipt, review: &SpaceReview) -> ProtocolResult<()> {
    let claimed_rating = review.event.rating as u8;
    let found = receipt
        .logs
        .iter()
        .filter(|log| log.address == review.space_address)
        .filter_map(|log| decode_review(log, review.action))
        .any(|log| {
            log.user.as_slice() == review.event.user
                && log.rating.map_or(true, |rating| rating == claimed_rating)
        });
    if found {
        Ok(())
    } else {
        Err(invalid("matching review event not found in receipt logs")
            .tag("transaction_hash", hex::encode(&receipt.transaction_hash)))
    }
}

// =============================================================================
// SOLANA MATCHING
// =============================================================================

/// Checks that `receipt` proves `content`.
pub fn verify_solana_receipt(
    receipt: &SolanaReceipt,
    content: Option<&TransactionContent>,
) -> ProtocolResult<()> {
    match content {
        None => Ok(()),
        Some(TransactionContent::Tip(_)) => Err(invalid("solana tip transactions are not supported")),
        Some(TransactionContent::TokenTransfer(transfer)) => match_solana_transfer(receipt, transfer),
        Some(TransactionContent::SpaceReview(_)) => {
            Err(invalid("solana space review transactions are not supported"))
        }
    }
}

fn find_balance<'a>(
    balances: &'a [SolanaTokenBalance],
    mint: &str,
    owner: &str,
) -> Option<&'a SolanaTokenBalance> {
    balances
        .iter()
        .find(|balance| balance.mint == mint && balance.owner == owner)
}

fn match_solana_transfer(receipt: &SolanaReceipt, transfer: &TokenTransfer) -> ProtocolResult<()> {
    let meta = receipt
        .meta
        .as_ref()
        .ok_or_else(|| invalid("solana transfer transaction meta is nil"))?;
    let (Ok(mint), Ok(owner)) = (
        std::str::from_utf8(&transfer.address),
        std::str::from_utf8(&transfer.sender),
    ) else {
        return Err(invalid("solana mint and sender must be utf-8 encoded"));
    };

    // A first purchase opens the token account, so there is no pre balance.
    let before = match find_balance(&meta.pre_token_balances, mint, owner) {
        Some(balance) => parse_prefixed_amount(&balance.amount.amount).ok_or_else(|| {
            invalid("invalid pre token balance amount").tag("amount", &balance.amount.amount)
        })?,
        None => U256::zero(),
    };
    let after_balance = find_balance(&meta.post_token_balances, mint, owner)
        .ok_or_else(|| invalid("solana transfer transaction mint not found in postTokenBalances"))?;
    let after = parse_prefixed_amount(&after_balance.amount.amount)
        .ok_or_else(|| invalid("invalid post token balance amount"))?;
    let expected = parse_prefixed_amount(&transfer.amount)
        .ok_or_else(|| invalid("invalid balance amount").tag("amount", &transfer.amount))?;

    let diff = if after >= before { after - before } else { before - after };
    if expected != diff {
        return Err(invalid("solana transfer transaction amount not equal to balance diff")
            .tag("expected", expected)
            .tag("diff", diff));
    }
    if transfer.is_buy && after < before {
        return Err(invalid("solana transfer transaction is buy but balance decreased"));
    }
    if !transfer.is_buy && after > before {
        return Err(invalid("solana transfer transaction is sell but balance increased"));
    }
    Ok(())
}
