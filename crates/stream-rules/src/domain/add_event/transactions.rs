//! # Blockchain Transaction Rules
//!
//! | Payload | Stream | Author | Cascade |
//! |---------|--------|--------|---------|
//! | `BlockchainTransaction` | sender's user stream | the user | tip → receiver's user stream, transfer → conversation, review → space |
//! | `ReceivedBlockchainTransaction` | receiver's user stream | node | tip → conversation |
//! | `MemberBlockchainTransaction` | conversation or space | node | none |
//!
//! Every variant is idempotent: a receipt already present in the stream
//! turns the event into a no-op.

use shared_types::{
    make_member_blockchain_transaction, make_received_blockchain_transaction, Address,
    BlockchainTransaction, ErrorCode, MemberBlockchainTransaction, ProtocolError,
    ProtocolResult, ReceivedBlockchainTransaction, StreamId, StreamKind, TransactionContent,
};

use super::{invalid_argument, AddEventContext};
use crate::domain::chain_auth::ChainAuthArgs;
use crate::domain::receipts::{verify_evm_receipt, verify_solana_receipt};
use crate::domain::rule_builder::AddEventRules;
use crate::domain::verdict::DerivedEvent;

fn is_new_transaction(ctx: &AddEventContext<'_>, transaction: &BlockchainTransaction) -> ProtocolResult<bool> {
    let seen = ctx
        .view()
        .has_transaction(transaction.receipt.as_ref(), transaction.solana_receipt.as_ref())?;
    Ok(!seen)
}

fn parse_stream_id(bytes: &[u8], field: &'static str) -> ProtocolResult<StreamId> {
    StreamId::from_bytes(bytes).map_err(|err| {
        invalid_argument("transaction references an invalid stream id")
            .tag("field", field)
            .tag("cause", err.message().to_string())
    })
}

fn parse_address(bytes: &[u8], field: &'static str) -> ProtocolResult<Address> {
    Address::from_slice(bytes).ok_or_else(|| {
        invalid_argument("transaction references an invalid address")
            .tag("field", field)
            .tag("len", bytes.len())
    })
}

// =============================================================================
// USER-SUBMITTED
// =============================================================================

pub(super) fn user_transaction_rules<'a>(
    ctx: &'a AddEventContext<'a>,
    transaction: &'a BlockchainTransaction,
) -> AddEventRules<'a> {
    AddEventRules::new()
        .check(move || ctx.creator_is_member())
        .check(move || is_new_transaction(ctx, transaction))
        .check(move || {
            verify_receipt_metadata(transaction)?;
            Ok(true)
        })
        .verify_receipt(move || Ok(transaction.receipt.clone()))
        .require_chain_auth(move || wallet_link_chain_auth(ctx.creator(), transaction))
        .require_parent_event(move || user_transaction_parent_event(ctx, transaction))
}

fn verify_receipt_metadata(transaction: &BlockchainTransaction) -> ProtocolResult<()> {
    let content = transaction.content.as_ref();
    match (&transaction.receipt, &transaction.solana_receipt) {
        (Some(receipt), _) => verify_evm_receipt(receipt, content),
        (None, Some(receipt)) => verify_solana_receipt(receipt, content),
        (None, None) => Err(invalid_argument("transaction has no receipt")),
    }
}

/// The creator must own the wallet that sent the transaction.
fn wallet_link_chain_auth(
    creator: &Address,
    transaction: &BlockchainTransaction,
) -> ProtocolResult<Option<ChainAuthArgs>> {
    let Some(receipt) = &transaction.receipt else {
        return Ok(None);
    };
    if receipt.from.as_slice() == creator.as_slice() {
        return Ok(None);
    }
    let (wallet, field) = match &transaction.content {
        None => (&receipt.from, "receipt.from"),
        Some(TransactionContent::Tip(tip)) => (&tip.event.sender, "tip.sender"),
        Some(TransactionContent::TokenTransfer(transfer)) => (&transfer.sender, "transfer.sender"),
        Some(TransactionContent::SpaceReview(review)) => (&review.event.user, "review.user"),
    };
    let wallet = parse_address(wallet, field)?;
    Ok(Some(ChainAuthArgs::for_is_wallet_linked(*creator, wallet)))
}

fn user_transaction_parent_event(
    ctx: &AddEventContext<'_>,
    transaction: &BlockchainTransaction,
) -> ProtocolResult<Option<DerivedEvent>> {
    let creator = *ctx.creator();
    let tags = ctx.event().tags().cloned();
    let derived = match &transaction.content {
        None => return Ok(None),
        Some(TransactionContent::Tip(tip)) => {
            let channel_id = parse_stream_id(&tip.event.channel_id, "tip.channel_id")?;
            if !channel_id.kind().is_conversation() && channel_id.kind() != StreamKind::Space {
                return Err(invalid_argument("tip channel id is not a channel, dm, gdm or space")
                    .tag("channel_id", channel_id));
            }
            let receiver = parse_address(&tip.to_user_address, "tip.to_user_address")?;
            DerivedEvent::new(
                StreamId::user_stream(&receiver),
                make_received_blockchain_transaction(creator, transaction.clone()),
            )
        }
        Some(TransactionContent::TokenTransfer(transfer)) => {
            if transfer.channel_id.is_empty() {
                return Err(invalid_argument("transfer channel id is required"));
            }
            let channel_id = parse_stream_id(&transfer.channel_id, "transfer.channel_id")?;
            if !channel_id.kind().is_conversation() {
                return Err(invalid_argument("transfer channel id is not a channel, dm or gdm")
                    .tag("channel_id", channel_id));
            }
            DerivedEvent::new(
                channel_id,
                make_member_blockchain_transaction(creator, transaction.clone()),
            )
        }
        Some(TransactionContent::SpaceReview(review)) => {
            let space = parse_address(&review.space_address, "review.space_address")?;
            DerivedEvent::new(
                StreamId::space(&space),
                make_member_blockchain_transaction(creator, transaction.clone()),
            )
        }
    };
    Ok(Some(derived.with_tags(tags)))
}

// =============================================================================
// NODE-DERIVED
// =============================================================================

pub(super) fn received_transaction_rules<'a>(
    ctx: &'a AddEventContext<'a>,
    received: &'a ReceivedBlockchainTransaction,
) -> AddEventRules<'a> {
    AddEventRules::new()
        .check(move || ctx.creator_is_valid_node())
        .check(move || is_new_transaction(ctx, &received.transaction))
        .require_chain_auth(move || received_tip_chain_auth(ctx, &received.transaction))
        .require_parent_event(move || received_tip_parent_event(ctx, received))
}

/// The tip must be addressed to this stream's user, and the on-chain
/// receiver must be one of their wallets.
fn received_tip_chain_auth(
    ctx: &AddEventContext<'_>,
    transaction: &BlockchainTransaction,
) -> ProtocolResult<Option<ChainAuthArgs>> {
    match &transaction.content {
        None => Ok(None),
        Some(TransactionContent::Tip(tip)) => {
            let user = ctx.stream_id().embedded_address()?;
            if tip.to_user_address.as_slice() != user.as_slice() {
                return Err(invalid_argument("tip recipient is not the stream owner")
                    .tag("user", user)
                    .tag("to_user_address", hex::encode(&tip.to_user_address)));
            }
            let receiver = parse_address(&tip.event.receiver, "tip.receiver")?;
            Ok(Some(ChainAuthArgs::for_is_wallet_linked(user, receiver)))
        }
        Some(other) => Err(invalid_argument("received transaction must be a tip")
            .tag("content", other.name())),
    }
}

fn received_tip_parent_event(
    ctx: &AddEventContext<'_>,
    received: &ReceivedBlockchainTransaction,
) -> ProtocolResult<Option<DerivedEvent>> {
    let Some(TransactionContent::Tip(tip)) = &received.transaction.content else {
        return Err(invalid_argument("received transaction must be a tip"));
    };
    let channel_id = parse_stream_id(&tip.event.channel_id, "tip.channel_id")?;
    Ok(Some(
        DerivedEvent::new(
            channel_id,
            make_member_blockchain_transaction(received.from_user_address, received.transaction.clone()),
        )
        .with_tags(ctx.event().tags().cloned()),
    ))
}

pub(super) fn member_transaction_rules<'a>(
    ctx: &'a AddEventContext<'a>,
    member: &'a MemberBlockchainTransaction,
) -> AddEventRules<'a> {
    AddEventRules::new()
        .check(move || ctx.creator_is_valid_node())
        .check(move || is_new_transaction(ctx, &member.transaction))
        .check(move || {
            valid_member_transaction(ctx, member)?;
            Ok(true)
        })
}

fn valid_member_transaction(ctx: &AddEventContext<'_>, member: &MemberBlockchainTransaction) -> ProtocolResult<()> {
    let view = ctx.view();
    let require_member = |address: &Address, role: &'static str| -> ProtocolResult<()> {
        if view.is_member(address)? {
            Ok(())
        } else {
            Err(ProtocolError::new(ErrorCode::PermissionDenied, "transaction party is not a member")
                .tag("role", role)
                .tag("address", address))
        }
    };
    let require_message_id = |message_id: &[u8]| -> ProtocolResult<()> {
        if message_id.is_empty() {
            Err(invalid_argument("transaction message id is required"))
        } else {
            Ok(())
        }
    };

    match &member.transaction.content {
        None => Err(invalid_argument("member transaction has no content")),
        Some(TransactionContent::Tip(tip)) => {
            require_member(&member.from_user_address, "sender")?;
            let receiver = parse_address(&tip.to_user_address, "tip.to_user_address")?;
            require_member(&receiver, "receiver")?;
            require_message_id(tip.event.message_id.as_slice())
        }
        Some(TransactionContent::TokenTransfer(transfer)) => {
            require_member(&member.from_user_address, "sender")?;
            require_message_id(transfer.message_id.as_slice())
        }
        Some(TransactionContent::SpaceReview(_)) => require_member(&member.from_user_address, "sender"),
    }
}
