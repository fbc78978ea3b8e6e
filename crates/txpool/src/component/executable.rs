//! Checks a `TxEntry` against the hypothetical next block and, on success,
//! computes the priority gas price Wash sorts by.

use txpool_traits::{ChainRepository, ForkConfig, StateAccessor};
use txpool_types::{FeeSchedule, Transaction, TxEntry, U256};

use crate::component::fee_cache::FeeParamsCache;
use crate::error::{Executability, PoolError};

/// Five minutes, expressed in blocks, is how far into the future a
/// block-ref may defer without being considered out of schedule.
fn schedule_window_blocks(block_interval_secs: u64) -> u64 {
    let secs = 5 * 60;
    (secs + block_interval_secs - 1) / block_interval_secs
}

pub struct Executable<'a> {
    pub chain: &'a dyn ChainRepository,
    pub state: &'a dyn StateAccessor,
    pub fork: &'a ForkConfig,
    pub fee_cache: &'a FeeParamsCache,
}

impl<'a> Executable<'a> {
    pub fn check(
        &self,
        entry: &mut TxEntry,
        head: &txpool_traits::HeadSummary,
        next_base_fee: Option<U256>,
    ) -> Result<Executability, PoolError> {
        let next_block_number = head.next_block_number();
        let next_timestamp = head.next_block_timestamp(self.fork.block_interval_secs);

        if entry.gas() > head.gas_limit {
            return Err(PoolError::Rejected("gas too large".to_string()));
        }
        if entry.is_expired(next_block_number) {
            return Err(PoolError::Rejected("expired".to_string()));
        }
        let window = schedule_window_blocks(self.fork.block_interval_secs);
        if entry.block_ref_number() > next_block_number + window {
            return Err(PoolError::Rejected("block ref out of schedule".to_string()));
        }
        if next_block_number < self.fork.galactica && !entry.resolved.tx.fee.is_legacy() {
            return Err(PoolError::BadTx("tx type not supported".to_string()));
        }

        let next_features = self.state.next_features(head.id, next_block_number);
        if !next_features.contains(entry.resolved.tx.features) {
            return Err(PoolError::Rejected(
                "feature bits not supported by next block".to_string(),
            ));
        }

        if self
            .chain
            .contains_tx_at_or_after(entry.id(), entry.block_ref_number())
        {
            return Err(PoolError::Rejected("known tx".to_string()));
        }

        if let Some(dep_id) = entry.resolved.tx.depends_on {
            match self.chain.dep_meta(dep_id) {
                None => return Ok(Executability::Queued),
                Some(dep) if dep.reverted => {
                    return Err(PoolError::Rejected("dep reverted".to_string()))
                }
                Some(_) => {}
            }
        }

        if entry.block_ref_number() > next_block_number {
            return Ok(Executability::Queued);
        }

        let base_fee = next_base_fee;
        let legacy_base_gas_price = self.fee_cache.legacy_base_gas_price(self.state, head.id)?;
        let payer_candidate = entry.resolved.payer_candidate();
        let outcome = self.state.buy_gas(
            head.id,
            payer_candidate,
            entry.gas(),
            next_timestamp,
            base_fee,
        )?;

        entry.set_payer_cost(outcome.payer, outcome.cost);
        entry.priority_gas_price = priority_fee(&entry.resolved.tx, legacy_base_gas_price, base_fee);
        entry.executable = true;

        Ok(Executability::Executable)
    }
}

/// `min(max_priority_fee, max_fee - block_base_fee)`, with `block_base_fee`
/// treated as zero pre-upgrade.
pub fn priority_fee(tx: &Transaction, legacy_base_gas_price: U256, block_base_fee: Option<U256>) -> U256 {
    let (max_fee, max_priority_fee) = match tx.fee {
        FeeSchedule::Legacy { gas_price_coef } => {
            let price = overall_gas_price(gas_price_coef, legacy_base_gas_price, tx.proved_work);
            (price, price)
        }
        FeeSchedule::DynamicFee {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => (max_fee_per_gas, max_priority_fee_per_gas),
    };
    let base_fee = block_base_fee.unwrap_or(U256::zero());
    std::cmp::min(max_priority_fee, max_fee.saturating_sub(base_fee))
}

/// Converts a Legacy transaction's gas-price coefficient and proved-work
/// credit into an effective gas price: `base + base * coef / 255`, less a
/// proved-work discount capped at the premium itself so the price never
/// drops below the governance base price.
fn overall_gas_price(gas_price_coef: u8, legacy_base_gas_price: U256, proved_work: U256) -> U256 {
    let premium = legacy_base_gas_price * U256::from(gas_price_coef) / U256::from(255u64);
    let gross = legacy_base_gas_price + premium;
    if proved_work.is_zero() {
        return gross;
    }
    let discount = std::cmp::min(premium, proved_work);
    gross.saturating_sub(discount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_fee_caps_at_max_fee_minus_base() {
        let tx = Transaction {
            chain_tag: 1,
            expiration: 720,
            block_ref_number: 0,
            nonce: 0,
            depends_on: None,
            clauses: vec![],
            gas: 21_000,
            features: Default::default(),
            fee: FeeSchedule::DynamicFee {
                max_fee_per_gas: U256::from(1_000u64),
                max_priority_fee_per_gas: U256::from(300u64),
            },
            replacement_nonce: None,
            signature: vec![],
            delegator_signature: None,
            proved_work: U256::zero(),
        };
        assert_eq!(
            priority_fee(&tx, U256::zero(), Some(U256::from(800u64))),
            U256::from(200u64)
        );
        assert_eq!(
            priority_fee(&tx, U256::zero(), Some(U256::zero())),
            U256::from(300u64)
        );
        assert_eq!(priority_fee(&tx, U256::zero(), None), U256::from(300u64));
    }

    #[test]
    fn schedule_window_rounds_up() {
        assert_eq!(schedule_window_blocks(10), 30);
        assert_eq!(schedule_window_blocks(3), 100);
    }
}
