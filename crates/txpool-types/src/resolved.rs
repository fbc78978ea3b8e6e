use ethereum_types::Address;

use crate::transaction::Transaction;

/// A transaction plus the fields recovered from its signature(s). Pure value
/// type: constructing one never touches chain state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTx {
    pub tx: Transaction,
    pub origin: Address,
    /// Gas payer distinct from the origin, present only when the
    /// transaction carries a delegator signature.
    pub delegator: Option<Address>,
    pub intrinsic_gas: u64,
}

impl ResolvedTx {
    pub fn new(tx: Transaction, origin: Address, delegator: Option<Address>) -> Self {
        let intrinsic_gas = tx.intrinsic_gas();
        ResolvedTx {
            tx,
            origin,
            delegator,
            intrinsic_gas,
        }
    }

    /// The address that ultimately pays for gas: the delegator if present,
    /// else the origin.
    pub fn payer_candidate(&self) -> Address {
        self.delegator.unwrap_or(self.origin)
    }
}
