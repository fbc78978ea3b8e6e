//! Stateless transaction-shape checks. No side effects: the caller
//! decides what to count from the returned error variant.

use txpool_traits::ForkConfig;
use txpool_types::{FeeSchedule, Transaction, TxFeatures};

use crate::error::PoolError;

const MAX_SERIALIZED_SIZE: usize = 64 * 1024;

pub fn validate_basic(
    tx: &Transaction,
    chain_tag: u8,
    fork: &ForkConfig,
    next_block_number: u64,
    next_features: TxFeatures,
) -> Result<(), PoolError> {
    if tx.chain_tag != chain_tag {
        return Err(PoolError::BadTx("chain tag mismatch".to_string()));
    }

    if tx.serialized_size() > MAX_SERIALIZED_SIZE {
        return Err(PoolError::Rejected("size too large".to_string()));
    }

    let is_pre_upgrade = next_block_number < fork.galactica;
    match (is_pre_upgrade, &tx.fee) {
        (true, FeeSchedule::Legacy { .. }) => {}
        (true, FeeSchedule::DynamicFee { .. }) => {
            return Err(PoolError::BadTx("tx type not supported".to_string()));
        }
        (false, FeeSchedule::DynamicFee {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        }) => {
            if max_fee_per_gas.bits() > 256 || max_priority_fee_per_gas.bits() > 256 {
                return Err(PoolError::BadTx("fee field too large".to_string()));
            }
            if max_fee_per_gas < max_priority_fee_per_gas {
                return Err(PoolError::BadTx(
                    "max fee per gas below max priority fee per gas".to_string(),
                ));
            }
        }
        (false, FeeSchedule::Legacy { .. }) => {}
    }

    if !next_features.contains(tx.features) {
        return Err(PoolError::Rejected(
            "feature bits not supported by next block".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_types::U256;
    use txpool_types::Clause;

    fn base_tx() -> Transaction {
        Transaction {
            chain_tag: 0x4a,
            expiration: 720,
            block_ref_number: 100,
            nonce: 1,
            depends_on: None,
            clauses: vec![Clause {
                to: Some(Default::default()),
                value: U256::zero(),
                data: Vec::new(),
            }],
            gas: 21_000,
            features: TxFeatures::empty(),
            fee: FeeSchedule::Legacy { gas_price_coef: 0 },
            replacement_nonce: None,
            signature: vec![0u8; 65],
            delegator_signature: None,
            proved_work: U256::zero(),
        }
    }

    fn fork_at(galactica: u64) -> ForkConfig {
        ForkConfig {
            galactica,
            initial_base_fee: U256::from(10_u64).pow(U256::from(13)),
            ..Default::default()
        }
    }

    #[test]
    fn chain_tag_mismatch_is_bad_tx() {
        let tx = base_tx();
        let err = validate_basic(&tx, 0x27, &fork_at(200), 100, TxFeatures::empty()).unwrap_err();
        assert!(err.is_bad_tx());
    }

    #[test]
    fn legacy_succeeds_one_block_before_upgrade() {
        let tx = base_tx();
        validate_basic(&tx, 0x4a, &fork_at(101), 100, TxFeatures::empty()).unwrap();
    }

    #[test]
    fn dynamic_fee_rejected_before_upgrade() {
        let mut tx = base_tx();
        tx.fee = FeeSchedule::DynamicFee {
            max_fee_per_gas: U256::from(10_u64).pow(U256::from(13)),
            max_priority_fee_per_gas: U256::zero(),
        };
        let err = validate_basic(&tx, 0x4a, &fork_at(101), 100, TxFeatures::empty()).unwrap_err();
        assert!(err.is_bad_tx());
    }

    #[test]
    fn dynamic_fee_at_upgrade_with_initial_base_fee_succeeds() {
        let initial = U256::from(10_u64).pow(U256::from(13));
        let mut tx = base_tx();
        tx.fee = FeeSchedule::DynamicFee {
            max_fee_per_gas: initial,
            max_priority_fee_per_gas: U256::zero(),
        };
        validate_basic(&tx, 0x4a, &fork_at(100), 100, TxFeatures::empty()).unwrap();
    }

    #[test]
    fn max_fee_below_priority_fee_is_bad_tx() {
        let mut tx = base_tx();
        tx.fee = FeeSchedule::DynamicFee {
            max_fee_per_gas: U256::from(10u64),
            max_priority_fee_per_gas: U256::from(20u64),
        };
        let err = validate_basic(&tx, 0x4a, &fork_at(100), 100, TxFeatures::empty()).unwrap_err();
        assert!(err.is_bad_tx());
    }

    #[test]
    fn feature_bits_must_be_subset() {
        let mut tx = base_tx();
        tx.features = TxFeatures::DELEGATED;
        let err =
            validate_basic(&tx, 0x4a, &fork_at(200), 100, TxFeatures::empty()).unwrap_err();
        assert!(err.is_rejected());

        validate_basic(&tx, 0x4a, &fork_at(200), 100, TxFeatures::DELEGATED).unwrap();
    }

    #[test]
    fn size_too_large_is_rejected() {
        let mut tx = base_tx();
        tx.clauses[0].data = vec![0u8; MAX_SERIALIZED_SIZE];
        let err = validate_basic(&tx, 0x4a, &fork_at(200), 100, TxFeatures::empty()).unwrap_err();
        assert!(err.is_rejected());
    }
}
