use ethereum_types::{Address, U256};

use crate::hash::{TxHash, TxId};
use crate::resolved::ResolvedTx;

/// A `ResolvedTx` together with the pool-local bookkeeping the rest of the
/// core (`TxIndex`, `Executable`, `Wash`) mutates over its lifetime.
///
/// `time_added` and `local_submitted` are fixed at construction; everything
/// else starts empty/false and is filled in by the first successful
/// `Executable` check, then kept fresh by `Wash`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxEntry {
    pub resolved: ResolvedTx,
    /// Monotonic nanosecond timestamp recorded on admission.
    pub time_added: u128,
    /// Locally submitted entries are exempt from lifetime eviction and from
    /// the overflow rejection band (see pool admission policy).
    pub local_submitted: bool,
    pub payer: Option<Address>,
    pub cost: Option<U256>,
    /// Unit validator tip per gas, refreshed by `Executable`.
    pub priority_gas_price: U256,
    /// Sticky: false -> true only. Used by Wash to decide whether to emit a
    /// second admission broadcast once the entry becomes executable.
    pub executable: bool,
}

impl TxEntry {
    pub fn new(resolved: ResolvedTx, time_added: u128, local_submitted: bool) -> Self {
        TxEntry {
            resolved,
            time_added,
            local_submitted,
            payer: None,
            cost: None,
            priority_gas_price: U256::zero(),
            executable: false,
        }
    }

    pub fn id(&self) -> TxId {
        self.resolved.tx.id()
    }

    pub fn hash(&self) -> TxHash {
        self.resolved.tx.hash()
    }

    pub fn origin(&self) -> Address {
        self.resolved.origin
    }

    pub fn delegator(&self) -> Option<Address> {
        self.resolved.delegator
    }

    pub fn gas(&self) -> u64 {
        self.resolved.tx.gas
    }

    pub fn block_ref_number(&self) -> u64 {
        self.resolved.tx.block_ref_number
    }

    pub fn is_expired(&self, next_block_number: u64) -> bool {
        let deadline = self.block_ref_number() as u128 + self.resolved.tx.expiration as u128;
        (next_block_number as u128) > deadline
    }

    pub fn replacement_nonce(&self) -> Option<u64> {
        self.resolved.tx.replacement_nonce
    }

    /// Sets `payer`/`cost`, leaving `priority_gas_price` for the caller
    /// (`Executable`) to fill in once it has computed it.
    pub fn set_payer_cost(&mut self, payer: Address, cost: U256) {
        self.payer = Some(payer);
        self.cost = Some(cost);
    }
}
