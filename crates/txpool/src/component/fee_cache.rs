//! Bounded cache, keyed by block identity, of the block's base fee and the
//! governance "legacy base gas price" parameter. The hit path is read-only
//! after insertion and the cache is tiny (32 entries), so one lock around
//! an `lru::LruCache` is sufficient.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use txpool_traits::{ChainRepository, ForkConfig, StateAccessor, StateError};
use txpool_types::{Hash, U256};

const CAPACITY: usize = 32;

/// Two independent bounded caches sharing one capacity budget: a block's
/// base fee and its governance gas-price parameter are fetched from two
/// different collaborators (chain repository vs. state accessor) and do
/// not become available at the same time, so they cannot share one slot
/// without one of them going stale while the other is still a miss.
pub struct FeeParamsCache {
    base_fee: Mutex<LruCache<Hash, Option<U256>>>,
    legacy_price: Mutex<LruCache<Hash, U256>>,
}

impl Default for FeeParamsCache {
    fn default() -> Self {
        let cap = NonZeroUsize::new(CAPACITY).unwrap();
        FeeParamsCache {
            base_fee: Mutex::new(LruCache::new(cap)),
            legacy_price: Mutex::new(LruCache::new(cap)),
        }
    }
}

impl FeeParamsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` when the next block height is before the fee-market
    /// upgrade; otherwise the first-block upgrade constant at the upgrade
    /// height, else the fee-market recurrence applied to `parent`.
    pub fn base_fee(
        &self,
        chain: &dyn ChainRepository,
        fork: &ForkConfig,
        parent_id: Hash,
    ) -> Result<Option<U256>, txpool_traits::ChainError> {
        if let Some(cached) = self.base_fee.lock().get(&parent_id) {
            return Ok(*cached);
        }
        let parent = chain.parent_header(parent_id)?;
        let base_fee = next_base_fee(&parent, fork);
        self.base_fee.lock().put(parent_id, base_fee);
        Ok(base_fee)
    }

    pub fn legacy_base_gas_price(
        &self,
        state: &dyn StateAccessor,
        parent_id: Hash,
    ) -> Result<U256, StateError> {
        if let Some(cached) = self.legacy_price.lock().get(&parent_id) {
            return Ok(*cached);
        }
        let legacy_base_gas_price = state.legacy_base_gas_price(parent_id)?;
        self.legacy_price.lock().put(parent_id, legacy_base_gas_price);
        Ok(legacy_base_gas_price)
    }
}

/// The fee-market recurrence, bit-exact. All arithmetic is unsigned,
/// division floors, and the lower bound is `initial_base_fee`.
fn next_base_fee(parent: &txpool_traits::ParentHeader, fork: &ForkConfig) -> Option<U256> {
    let next_number = parent.number + 1;
    if next_number < fork.galactica {
        return None;
    }
    if next_number == fork.galactica {
        return Some(fork.initial_base_fee);
    }

    let parent_base_fee = parent.base_fee.unwrap_or(fork.initial_base_fee);
    let gas_target = U256::from(parent.gas_limit) * U256::from(fork.elasticity_multiplier_num)
        / U256::from(fork.elasticity_multiplier_den);
    let gas_used = U256::from(parent.gas_used);
    let denom = U256::from(8u64);

    let base_fee = if gas_used == gas_target {
        parent_base_fee
    } else if gas_used > gas_target {
        let delta = std::cmp::max(
            U256::from(1u64),
            parent_base_fee * (gas_used - gas_target) / gas_target / denom,
        );
        parent_base_fee + delta
    } else {
        let delta = parent_base_fee * (gas_target - gas_used) / gas_target / denom;
        std::cmp::max(fork.initial_base_fee, parent_base_fee.saturating_sub(delta))
    };

    Some(base_fee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use txpool_traits::ParentHeader;

    fn fork() -> ForkConfig {
        ForkConfig {
            galactica: 100,
            ..Default::default()
        }
    }

    #[test]
    fn undefined_below_upgrade() {
        let fork = fork();
        let parent = ParentHeader {
            number: 97,
            gas_limit: 40_000_000,
            gas_used: 0,
            base_fee: None,
        };
        assert_eq!(next_base_fee(&parent, &fork), None);
    }

    #[test]
    fn initial_constant_at_upgrade() {
        let fork = fork();
        let parent = ParentHeader {
            number: 99,
            gas_limit: 40_000_000,
            gas_used: 0,
            base_fee: None,
        };
        assert_eq!(next_base_fee(&parent, &fork), Some(fork.initial_base_fee));
    }

    #[test]
    fn stays_put_at_target_usage() {
        let fork = fork();
        let parent = ParentHeader {
            number: 150,
            gas_limit: 40_000_000,
            gas_used: 30_000_000, // 75% = target
            base_fee: Some(fork.initial_base_fee * 2),
        };
        assert_eq!(next_base_fee(&parent, &fork), Some(fork.initial_base_fee * 2));
    }

    #[test]
    fn empty_blocks_decay_to_asymptote_and_stay_there() {
        let fork = fork();
        let mut base_fee = fork.initial_base_fee * 10;
        let mut number = 200u64;
        for _ in 0..500 {
            let parent = ParentHeader {
                number,
                gas_limit: 40_000_000,
                gas_used: 0,
                base_fee: Some(base_fee),
            };
            base_fee = next_base_fee(&parent, &fork).unwrap();
            number += 1;
        }
        assert_eq!(base_fee, fork.initial_base_fee);

        // further empty blocks never go below the floor.
        for _ in 0..10 {
            let parent = ParentHeader {
                number,
                gas_limit: 40_000_000,
                gas_used: 0,
                base_fee: Some(base_fee),
            };
            base_fee = next_base_fee(&parent, &fork).unwrap();
            number += 1;
        }
        assert_eq!(base_fee, fork.initial_base_fee);
    }

    #[test]
    fn rises_above_target_usage() {
        let fork = fork();
        let parent = ParentHeader {
            number: 200,
            gas_limit: 40_000_000,
            gas_used: 40_000_000, // full block, above 75% target
            base_fee: Some(fork.initial_base_fee),
        };
        let next = next_base_fee(&parent, &fork).unwrap();
        assert!(next > fork.initial_base_fee);
    }
}
