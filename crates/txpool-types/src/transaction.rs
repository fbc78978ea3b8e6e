use ethereum_types::{Address, U256};
use tiny_keccak::{Hasher, Keccak};

use crate::hash::{TxHash, TxId};

bitflags::bitflags! {
    /// Feature bits a transaction may declare; a block header advertises the
    /// set of features it is willing to accept for the next block.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct TxFeatures: u32 {
        /// Transaction carries a delegator signature; gas is paid by a
        /// delegator distinct from the origin.
        const DELEGATED = 0b0000_0001;
    }
}

/// Destination, value, and payload of a single clause.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clause {
    pub to: Option<Address>,
    pub value: U256,
    pub data: Vec<u8>,
}

/// The fee fields, which differ in shape between the two transaction types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeeSchedule {
    Legacy {
        /// Coefficient used, together with the governance-set legacy base
        /// gas price, to derive an effective gas price.
        gas_price_coef: u8,
    },
    DynamicFee {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
}

impl FeeSchedule {
    pub fn is_legacy(&self) -> bool {
        matches!(self, FeeSchedule::Legacy { .. })
    }

    pub fn is_dynamic_fee(&self) -> bool {
        matches!(self, FeeSchedule::DynamicFee { .. })
    }
}

/// A candidate transaction as decoded off the wire. Signature recovery is an
/// external collaborator (see `txpool_traits::SignatureRecovery`); this type
/// only carries the structural fields the pool core reasons about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub chain_tag: u8,
    /// Number of blocks after `block_ref`'s implied height during which the
    /// transaction remains eligible for inclusion.
    pub expiration: u32,
    /// Hint naming the earliest block number the transaction may execute on.
    pub block_ref_number: u64,
    pub nonce: u64,
    pub depends_on: Option<TxId>,
    pub clauses: Vec<Clause>,
    pub gas: u64,
    pub features: TxFeatures,
    pub fee: FeeSchedule,
    /// Per-origin scalar; when two transactions from the same origin share
    /// one, the replacement protocol applies.
    pub replacement_nonce: Option<u64>,
    pub signature: Vec<u8>,
    pub delegator_signature: Option<Vec<u8>>,
    /// Proved-work credit carried by the transaction, consumed only by
    /// Legacy fee computation.
    pub proved_work: U256,
}

impl Transaction {
    pub fn is_delegated(&self) -> bool {
        self.features.contains(TxFeatures::DELEGATED)
    }

    pub fn serialized_size(&self) -> usize {
        // Structural estimate: fixed header plus clause payloads plus
        // signatures. Good enough for the 64 KiB size gate in Validation;
        // actual wire encoding is owned by the decoder collaborator.
        let clauses_len: usize = self
            .clauses
            .iter()
            .map(|c| 20 + 32 + c.data.len() + 8)
            .sum();
        64 + clauses_len + self.signature.len() + self.delegator_signature.as_ref().map_or(0, Vec::len)
    }

    fn digest(&self, include_signatures: bool) -> [u8; 32] {
        let mut k = Keccak::v256();
        k.update(&[self.chain_tag]);
        k.update(&self.expiration.to_be_bytes());
        k.update(&self.block_ref_number.to_be_bytes());
        k.update(&self.nonce.to_be_bytes());
        if let Some(dep) = self.depends_on {
            k.update(dep.as_bytes());
        }
        for clause in &self.clauses {
            if let Some(to) = clause.to {
                k.update(to.as_bytes());
            }
            let mut value_bytes = [0u8; 32];
            clause.value.to_big_endian(&mut value_bytes);
            k.update(&value_bytes);
            k.update(&clause.data);
        }
        k.update(&self.gas.to_be_bytes());
        k.update(&self.features.bits().to_be_bytes());
        match self.fee {
            FeeSchedule::Legacy { gas_price_coef } => {
                k.update(&[0u8, gas_price_coef]);
            }
            FeeSchedule::DynamicFee {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                k.update(&[1u8]);
                let mut buf = [0u8; 32];
                max_fee_per_gas.to_big_endian(&mut buf);
                k.update(&buf);
                max_priority_fee_per_gas.to_big_endian(&mut buf);
                k.update(&buf);
            }
        }
        if let Some(n) = self.replacement_nonce {
            k.update(&n.to_be_bytes());
        }
        if include_signatures {
            k.update(&self.signature);
            if let Some(ref sig) = self.delegator_signature {
                k.update(sig);
            }
        }
        let mut out = [0u8; 32];
        k.finalize(&mut out);
        out
    }

    /// The unsigning hash: identity used for ordering and replacement.
    pub fn id(&self) -> TxId {
        TxId::from_slice(&self.digest(false))
    }

    /// The signed hash: identity used for de-duplication and wire identity.
    pub fn hash(&self) -> TxHash {
        TxHash::from_slice(&self.digest(true))
    }

    /// Intrinsic gas: a fixed base cost plus a per-clause cost. The real gas
    /// schedule lives with the state accessor / EVM collaborator; this is
    /// the structural floor the pool itself must be able to compute without
    /// touching state, used before a transaction is ever resolved.
    pub fn intrinsic_gas(&self) -> u64 {
        const TX_GAS: u64 = 5_000;
        const CLAUSE_GAS: u64 = 16_000;
        const CLAUSE_GAS_CONTRACT_CREATION: u64 = 48_000;
        const ZERO_BYTE_GAS: u64 = 4;
        const NONZERO_BYTE_GAS: u64 = 68;

        let mut gas = TX_GAS;
        if self.clauses.is_empty() {
            gas += CLAUSE_GAS;
        }
        for clause in &self.clauses {
            gas += if clause.to.is_none() {
                CLAUSE_GAS_CONTRACT_CREATION
            } else {
                CLAUSE_GAS
            };
            for &b in &clause.data {
                gas += if b == 0 { ZERO_BYTE_GAS } else { NONZERO_BYTE_GAS };
            }
        }
        gas
    }
}
