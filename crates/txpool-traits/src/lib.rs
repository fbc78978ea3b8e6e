//! The pool core treats the chain repository, the state accessor, the
//! transaction decoder/signer, and the governance parameter source as
//! external collaborators (see the design's scope note). This crate is the
//! seam: narrow traits plus the small value types that cross it, so the
//! core never holds a reference back into the node that embeds it.

mod fork;
mod head;

use thiserror::Error;
use txpool_types::{Address, Hash, Transaction, TxFeatures, TxId, U256};

pub use fork::ForkConfig;
pub use head::HeadSummary;

/// A parent block's header fields needed by the fee-market recurrence.
/// Distinct from `HeadSummary` because the fee cache looks up
/// arbitrary ancestors, not just the current head.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParentHeader {
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub base_fee: Option<U256>,
}

/// Whether a dependency transaction is known to the chain, and if so,
/// whether the block that included it was later reverted (reorged out).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepMeta {
    pub reverted: bool,
}

/// The result of a successful `buy_gas` call: what the transaction would
/// actually cost to execute, and who the state accessor resolved as payer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuyGasOutcome {
    pub legacy_base_gas_price: U256,
    pub payer: Address,
    pub cost: U256,
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("block {0} not found")]
    NotFound(Hash),
    #[error("chain repository error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("insufficient energy for overall pending cost")]
    InsufficientEnergy,
    #[error("state accessor error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("bad signature")]
    BadSignature,
    #[error("bad delegator signature")]
    BadDelegatorSignature,
}

/// Read access to chain state: block lookup, transaction-meta lookup,
/// ancestor walking. Out of this crate's scope to implement — only the
/// shape the pool core needs is specified here.
pub trait ChainRepository: Send + Sync {
    fn head(&self) -> HeadSummary;

    /// Header fields of the block identified by `id`, used as the parent
    /// in the fee-market recurrence.
    fn parent_header(&self, id: Hash) -> Result<ParentHeader, ChainError>;

    /// True if the chain already contains a transaction with this id at or
    /// after `block_ref_number` (used by Executable's "known tx" check).
    fn contains_tx_at_or_after(&self, id: TxId, block_ref_number: u64) -> bool;

    /// Looks up a dependency transaction's chain status. `None` means the
    /// dependency has not landed on chain yet (not an error: it may still
    /// appear, so the dependent transaction queues rather than fails).
    fn dep_meta(&self, id: TxId) -> Option<DepMeta>;
}

/// Read access to account/contract state: balance, energy, governance
/// parameters. Out of this crate's scope to implement.
pub trait StateAccessor: Send + Sync {
    /// The governance "legacy base gas price" parameter as of the state at
    /// `parent_id`.
    fn legacy_base_gas_price(&self, parent_id: Hash) -> Result<U256, StateError>;

    /// Attempts to buy gas for `gas` units at `next_timestamp` against the
    /// state at `parent_id`, charging `payer_candidate`. Implementations
    /// sandbox this against a throwaway checkpoint internally (real state
    /// is never mutated by a probe) since checkpoint/rollback mechanics are
    /// owned entirely by the state accessor's storage layer.
    fn buy_gas(
        &self,
        parent_id: Hash,
        payer_candidate: Address,
        gas: u64,
        next_timestamp: u64,
        base_fee: Option<U256>,
    ) -> Result<BuyGasOutcome, StateError>;

    /// The feature bits a block at `next_block_number` (built on top of
    /// `parent_id`) will advertise.
    fn next_features(&self, parent_id: Hash, next_block_number: u64) -> TxFeatures;
}

/// Recovers origin and, when present, delegator addresses from a
/// transaction's signature(s). The actual cryptography (ECDSA recovery,
/// wire decoding) lives entirely with the embedder.
pub trait SignatureRecovery: Send + Sync {
    fn recover_origin(&self, tx: &Transaction) -> Result<Address, RecoveryError>;

    fn recover_delegator(&self, tx: &Transaction) -> Result<Option<Address>, RecoveryError>;
}

/// Checked by `TxIndex::add` whenever an entry's cost is set: can `payer`
/// afford `new_total` in pending cost across every entry it currently pays
/// for, plus this one.
pub trait PayerValidator: Send + Sync {
    fn validate_pending_cost(&self, payer: Address, new_total: U256) -> Result<(), StateError>;
}
