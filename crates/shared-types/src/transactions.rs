//! # Blockchain Transaction Payloads
//!
//! On-chain activity users attach to their streams: an EVM or Solana
//! receipt plus the content it is claimed to prove (a tip, a token trade or
//! a space review).
//!
//! Fields copied from chain data stay raw bytes; rules compare them against
//! the decoded receipt and convert them into typed ids only when needed.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// A user-submitted on-chain transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockchainTransaction {
    pub receipt: Option<EvmReceipt>,
    pub solana_receipt: Option<SolanaReceipt>,
    /// `None` for a bare receipt, or for content kinds this node does not know.
    pub content: Option<TransactionContent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionContent {
    Tip(Tip),
    TokenTransfer(TokenTransfer),
    SpaceReview(SpaceReview),
}

impl TransactionContent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            TransactionContent::Tip(_) => "tip",
            TransactionContent::TokenTransfer(_) => "token_transfer",
            TransactionContent::SpaceReview(_) => "space_review",
        }
    }
}

/// A tip sent to the author of a message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tip {
    pub event: TipEvent,
    /// The user (not wallet) receiving the tip.
    pub to_user_address: Vec<u8>,
}

/// Mirror of the on-chain `Tip` log.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TipEvent {
    pub token_id: u64,
    pub currency: Vec<u8>,
    pub sender: Vec<u8>,
    pub receiver: Vec<u8>,
    pub amount: u64,
    pub message_id: Vec<u8>,
    pub channel_id: Vec<u8>,
}

/// A token buy or sell.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenTransfer {
    /// Token contract (EVM) or mint (Solana), as raw bytes.
    pub address: Vec<u8>,
    /// Decimal or `0x`-prefixed amount.
    pub amount: String,
    pub sender: Vec<u8>,
    pub message_id: Vec<u8>,
    pub channel_id: Vec<u8>,
    pub is_buy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReviewAction {
    #[default]
    Unspecified,
    Add,
    Update,
    Delete,
}

/// A review posted to a space contract.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpaceReview {
    pub action: ReviewAction,
    pub event: ReviewEvent,
    pub space_address: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub user: Vec<u8>,
    pub comment: String,
    pub rating: u32,
}

// =============================================================================
// RECEIPTS
// =============================================================================

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvmReceipt {
    pub chain_id: u64,
    #[serde_as(as = "Bytes")]
    pub transaction_hash: Vec<u8>,
    pub block_number: u64,
    #[serde_as(as = "Bytes")]
    pub to: Vec<u8>,
    #[serde_as(as = "Bytes")]
    pub from: Vec<u8>,
    pub logs: Vec<ReceiptLog>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReceiptLog {
    #[serde_as(as = "Bytes")]
    pub address: Vec<u8>,
    pub topics: Vec<Vec<u8>>,
    #[serde_as(as = "Bytes")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SolanaReceipt {
    pub transaction: Option<SolanaTransaction>,
    pub meta: Option<SolanaTransactionMeta>,
    pub slot: u64,
}

impl SolanaReceipt {
    /// The first transaction signature, which identifies the transaction.
    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        self.transaction
            .as_ref()
            .and_then(|tx| tx.signatures.first())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SolanaTransaction {
    pub signatures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SolanaTransactionMeta {
    pub pre_token_balances: Vec<SolanaTokenBalance>,
    pub post_token_balances: Vec<SolanaTokenBalance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SolanaTokenBalance {
    pub mint: String,
    pub owner: String,
    pub amount: SolanaTokenAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SolanaTokenAmount {
    /// Raw integer amount as a decimal string.
    pub amount: String,
    pub decimals: u32,
}
