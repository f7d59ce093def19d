// Path: crates/veris-api/src/transaction/context.rs
//! Defines the stable context for transaction execution.

use veris_types::app::{AccountId, ChainId};

/// Provides stable, read-only context to services during execution.
#[derive(Clone, Debug)]
pub struct TxContext {
    /// The current block height being processed.
    pub block_height: u64,
    /// The deterministic timestamp of the current block, in unix seconds,
    /// taken from its header. This is the only clock the encryption core
    /// ever reads.
    pub block_timestamp: u64,
    /// The unique identifier of the chain for replay protection.
    pub chain_id: ChainId,
    /// The `AccountId` of the entity that signed the current transaction.
    /// This is the authoritative source for permission checks within services.
    pub signer_account_id: AccountId,
    /// If true, the call is initiated by the chain itself (e.g., end-block
    /// hook). For user-initiated transactions, this must always be `false`.
    pub is_internal: bool,
}
