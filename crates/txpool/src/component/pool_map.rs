//! `TxIndex`: the pool's one shared mutable structure. Keeps three views
//! (by hash, by id, by origin->replacement-nonce) plus per-address quota
//! and per-payer pending-cost accounting, and enforces the replacement
//! protocol. A single coarse lock guards all of it; every public method is
//! one critical section.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use txpool_traits::PayerValidator;
use txpool_types::{Address, FeeSchedule, Transaction, TxEntry, TxHash, TxId, U256};

use crate::error::PoolError;

#[derive(Default)]
struct Inner {
    by_hash: FxHashMap<TxHash, TxEntry>,
    /// Mirror: every id maps to the hash of the entry carrying it. Kept in
    /// lock-step with `by_hash` rather than duplicating the entry, so the
    /// two views cannot drift apart from independent mutation.
    by_id: FxHashMap<TxId, TxHash>,
    quota: FxHashMap<Address, u32>,
    pending_cost: FxHashMap<Address, U256>,
    replacements: FxHashMap<Address, FxHashMap<u64, TxId>>,
}

impl Inner {
    fn insert_quota(&mut self, address: Address) {
        *self.quota.entry(address).or_insert(0) += 1;
    }

    fn remove_quota(&mut self, address: Address) {
        if let Some(count) = self.quota.get_mut(&address) {
            *count -= 1;
            if *count == 0 {
                self.quota.remove(&address);
            }
        }
    }

    fn quota_of(&self, address: Address) -> u32 {
        self.quota.get(&address).copied().unwrap_or(0)
    }

    fn add_pending_cost(&mut self, payer: Address, cost: U256) {
        *self.pending_cost.entry(payer).or_insert(U256::zero()) += cost;
    }

    fn sub_pending_cost(&mut self, payer: Address, cost: U256) {
        if let Some(total) = self.pending_cost.get_mut(&payer) {
            *total -= cost;
            if total.is_zero() {
                self.pending_cost.remove(&payer);
            }
        }
    }

    fn pending_cost_of(&self, payer: Address) -> U256 {
        self.pending_cost.get(&payer).copied().unwrap_or(U256::zero())
    }

    /// Removes an entry in full: both map views, quotas, pending cost, and
    /// its replacement-nonce mapping if it has one. Mirrors `add`'s commit
    /// step in reverse, so invariants 1-4 hold after every call.
    fn remove_committed(&mut self, hash: TxHash) -> Option<TxEntry> {
        let entry = self.by_hash.remove(&hash)?;
        self.by_id.remove(&entry.id());

        self.remove_quota(entry.origin());
        if let Some(delegator) = entry.delegator() {
            self.remove_quota(delegator);
        }

        if let (Some(payer), Some(cost)) = (entry.payer, entry.cost) {
            self.sub_pending_cost(payer, cost);
        }

        if let Some(n) = entry.replacement_nonce() {
            if let Some(by_nonce) = self.replacements.get_mut(&entry.origin()) {
                by_nonce.remove(&n);
                if by_nonce.is_empty() {
                    self.replacements.remove(&entry.origin());
                }
            }
        }

        Some(entry)
    }

    fn commit(&mut self, entry: TxEntry) {
        let hash = entry.hash();
        let id = entry.id();
        let origin = entry.origin();
        let delegator = entry.delegator();
        let payer_cost = entry.payer.zip(entry.cost);
        let replacement = entry.replacement_nonce();

        self.insert_quota(origin);
        if let Some(d) = delegator {
            self.insert_quota(d);
        }
        if let (Some(payer), Some(cost)) = payer_cost {
            self.add_pending_cost(payer, cost);
        }
        if let Some(n) = replacement {
            self.replacements.entry(origin).or_default().insert(n, id);
        }

        self.by_id.insert(id, hash);
        self.by_hash.insert(hash, entry);
    }
}

/// Reason a replacement attempt failed, or that it was not attempted at all
/// (no prior entry shares the nonce).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplacementOutcome {
    Replaces(TxHash),
    TooLow(&'static str),
}

fn check_replacement(old: &Transaction, new: &Transaction) -> ReplacementOutcome {
    match (&old.fee, &new.fee) {
        (FeeSchedule::Legacy { gas_price_coef: old_coef }, FeeSchedule::Legacy { gas_price_coef: new_coef }) => {
            if new_coef >= old_coef {
                ReplacementOutcome::Replaces(old.hash())
            } else {
                ReplacementOutcome::TooLow("replacement tx gas price too low")
            }
        }
        (
            FeeSchedule::DynamicFee {
                max_fee_per_gas: old_fee,
                max_priority_fee_per_gas: old_prio,
            },
            FeeSchedule::DynamicFee {
                max_fee_per_gas: new_fee,
                max_priority_fee_per_gas: new_prio,
            },
        ) => {
            if new_fee < old_fee {
                ReplacementOutcome::TooLow("replacement tx max fee per gas too low")
            } else if new_prio < old_prio {
                ReplacementOutcome::TooLow("replacement tx max priority fee per gas too low")
            } else {
                ReplacementOutcome::Replaces(old.hash())
            }
        }
        _ => ReplacementOutcome::TooLow("replacement tx type mismatch"),
    }
}

pub struct TxIndex {
    inner: RwLock<Inner>,
}

impl Default for TxIndex {
    fn default() -> Self {
        TxIndex {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl TxIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_hash(&self, hash: TxHash) -> bool {
        self.inner.read().by_hash.contains_key(&hash)
    }

    pub fn quota_of(&self, address: Address) -> u32 {
        self.inner.read().quota_of(address)
    }

    pub fn pending_cost_of(&self, payer: Address) -> U256 {
        self.inner.read().pending_cost_of(payer)
    }

    /// Idempotent re-admission, then replacement, then quota, then
    /// pending-cost, then commit, in that order. Returns whether the
    /// commit replaced a prior entry under the same origin/replacement
    /// nonce, so the caller can count a replacement metric distinctly
    /// from a fresh admission.
    pub fn add(
        &self,
        entry: TxEntry,
        limit_per_account: u32,
        payer_validator: &dyn PayerValidator,
    ) -> Result<bool, PoolError> {
        let mut inner = self.inner.write();

        if inner.by_hash.contains_key(&entry.hash()) {
            return Ok(false);
        }

        let origin = entry.origin();
        let mut replaced: Option<TxHash> = None;

        if let Some(n) = entry.replacement_nonce() {
            if let Some(&prev_id) = inner.replacements.get(&origin).and_then(|m| m.get(&n)) {
                let prev_hash = *inner.by_id.get(&prev_id).expect("replacement index out of sync");
                let prev_tx = &inner.by_hash.get(&prev_hash).expect("dangling by_id entry").resolved.tx;
                match check_replacement(prev_tx, &entry.resolved.tx) {
                    ReplacementOutcome::Replaces(hash) => replaced = Some(hash),
                    ReplacementOutcome::TooLow(reason) => {
                        return Err(PoolError::Rejected(reason.to_string()));
                    }
                }
            }
        }

        if let Some(hash) = replaced {
            inner.remove_committed(hash);
        }

        if inner.quota_of(origin) >= limit_per_account {
            return Err(PoolError::Rejected("account quota exceeded".to_string()));
        }
        if let Some(delegator) = entry.delegator() {
            if inner.quota_of(delegator) >= limit_per_account {
                return Err(PoolError::Rejected("delegator quota exceeded".to_string()));
            }
        }

        if let (Some(payer), Some(cost)) = (entry.payer, entry.cost) {
            let new_total = inner.pending_cost_of(payer) + cost;
            payer_validator.validate_pending_cost(payer, new_total)?;
        }

        inner.commit(entry);
        Ok(replaced.is_some())
    }

    pub fn remove_by_hash(&self, hash: TxHash) -> bool {
        self.inner.write().remove_committed(hash).is_some()
    }

    /// Wash-only: swaps an entry for an updated version of itself (same
    /// hash/id, refreshed payer/cost/priority-gas-price), via remove then
    /// re-commit rather than an in-place mutation, so invariants 2 and 3
    /// (quota and pending-cost accounting) fall out of `commit`/
    /// `remove_committed` automatically instead of needing a bespoke delta.
    /// Bypasses the quota and pending-cost checks `add` performs, since the
    /// entry already holds a slot.
    pub fn replace_entry(&self, hash: TxHash, updated: TxEntry) -> bool {
        let mut inner = self.inner.write();
        if inner.remove_committed(hash).is_some() {
            inner.commit(updated);
            true
        } else {
            false
        }
    }

    /// Bulk insert ignoring the account-limit and pending-cost checks, used
    /// to restore trusted entries (e.g. local submissions temporarily
    /// evicted). Quotas are still incremented so later `add`s respect caps.
    pub fn fill(&self, entries: Vec<TxEntry>) {
        let mut inner = self.inner.write();
        for entry in entries {
            if inner.by_hash.contains_key(&entry.hash()) {
                continue;
            }
            inner.commit(entry);
        }
    }

    pub fn get_by_id(&self, id: TxId) -> Option<TxEntry> {
        let inner = self.inner.read();
        let hash = inner.by_id.get(&id)?;
        inner.by_hash.get(hash).cloned()
    }

    pub fn get_by_hash(&self, hash: TxHash) -> Option<TxEntry> {
        self.inner.read().by_hash.get(&hash).cloned()
    }

    pub fn to_entries(&self) -> Vec<TxEntry> {
        self.inner.read().by_hash.values().cloned().collect()
    }

    pub fn to_txs(&self) -> Vec<Transaction> {
        self.inner
            .read()
            .by_hash
            .values()
            .map(|e| e.resolved.tx.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn invariants_hold(&self) -> bool {
        let inner = self.inner.read();
        if inner.by_hash.len() != inner.by_id.len() {
            return false;
        }
        for (id, hash) in inner.by_id.iter() {
            match inner.by_hash.get(hash) {
                Some(entry) if &entry.id() == id => {}
                _ => return false,
            }
        }
        let mut expected_quota: FxHashMap<Address, u32> = FxHashMap::default();
        let mut expected_cost: FxHashMap<Address, U256> = FxHashMap::default();
        for entry in inner.by_hash.values() {
            *expected_quota.entry(entry.origin()).or_insert(0) += 1;
            if let Some(d) = entry.delegator() {
                *expected_quota.entry(d).or_insert(0) += 1;
            }
            if let (Some(payer), Some(cost)) = (entry.payer, entry.cost) {
                *expected_cost.entry(payer).or_insert(U256::zero()) += cost;
            }
        }
        if expected_quota != inner.quota {
            return false;
        }
        if expected_cost != inner.pending_cost {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txpool_types::{Clause, ResolvedTx, TxFeatures};

    struct AlwaysOk;
    impl PayerValidator for AlwaysOk {
        fn validate_pending_cost(
            &self,
            _payer: Address,
            _new_total: U256,
        ) -> Result<(), txpool_traits::StateError> {
            Ok(())
        }
    }

    struct CapEnergy(U256);
    impl PayerValidator for CapEnergy {
        fn validate_pending_cost(
            &self,
            _payer: Address,
            new_total: U256,
        ) -> Result<(), txpool_traits::StateError> {
            if new_total > self.0 {
                Err(txpool_traits::StateError::InsufficientEnergy)
            } else {
                Ok(())
            }
        }
    }

    fn tx(origin_seed: u8, nonce: u64, replacement_nonce: Option<u64>, fee: FeeSchedule) -> TxEntry {
        let transaction = Transaction {
            chain_tag: 1,
            expiration: 720,
            block_ref_number: 0,
            nonce,
            depends_on: None,
            clauses: vec![Clause {
                to: Some(Address::from_low_u64_be(1)),
                value: U256::zero(),
                data: vec![origin_seed],
            }],
            gas: 21_000,
            features: TxFeatures::empty(),
            fee,
            replacement_nonce,
            signature: vec![origin_seed; 65],
            delegator_signature: None,
            proved_work: U256::zero(),
        };
        let resolved = ResolvedTx::new(transaction, Address::from_low_u64_be(origin_seed as u64), None);
        TxEntry::new(resolved, nonce as u128, false)
    }

    fn legacy(coef: u8) -> FeeSchedule {
        FeeSchedule::Legacy { gas_price_coef: coef }
    }

    fn dynamic(max_fee: u64, max_priority: u64) -> FeeSchedule {
        FeeSchedule::DynamicFee {
            max_fee_per_gas: U256::from(max_fee),
            max_priority_fee_per_gas: U256::from(max_priority),
        }
    }

    #[test]
    fn add_then_add_again_is_idempotent() {
        let index = TxIndex::new();
        let entry = tx(1, 1, None, legacy(10));
        index.add(entry.clone(), 16, &AlwaysOk).unwrap();
        index.add(entry, 16, &AlwaysOk).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.invariants_hold());
    }

    #[test]
    fn add_remove_add_matches_single_add() {
        let index = TxIndex::new();
        let entry = tx(1, 1, None, legacy(10));
        index.add(entry.clone(), 16, &AlwaysOk).unwrap();
        index.remove_by_hash(entry.hash());
        index.add(entry, 16, &AlwaysOk).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.invariants_hold());
    }

    #[test]
    fn account_quota_exceeded_at_boundary() {
        let index = TxIndex::new();
        for n in 0..3 {
            index.add(tx(1, n, None, legacy(10)), 3, &AlwaysOk).unwrap();
        }
        let err = index.add(tx(1, 3, None, legacy(10)), 3, &AlwaysOk).unwrap_err();
        assert!(err.is_rejected());
        assert!(index.invariants_hold());
    }

    #[test]
    fn replacement_upgrade_evicts_prior_entry() {
        let index = TxIndex::new();
        let first = tx(1, 1, Some(7), dynamic(1000, 100));
        index.add(first.clone(), 16, &AlwaysOk).unwrap();

        let second = tx(1, 2, Some(7), dynamic(1200, 120));
        index.add(second.clone(), 16, &AlwaysOk).unwrap();

        assert!(index.get_by_id(first.id()).is_none());
        assert!(index.get_by_id(second.id()).is_some());
        assert_eq!(index.len(), 1);
        assert!(index.invariants_hold());
    }

    #[test]
    fn replacement_downgrade_is_rejected() {
        let index = TxIndex::new();
        let first = tx(1, 1, Some(7), dynamic(1000, 100));
        index.add(first.clone(), 16, &AlwaysOk).unwrap();

        let second = tx(1, 2, Some(7), dynamic(999, 100));
        let err = index.add(second, 16, &AlwaysOk).unwrap_err();
        assert!(err.is_rejected());
        assert_eq!(err.to_string(), "rejected: replacement tx max fee per gas too low");
        assert!(index.get_by_id(first.id()).is_some());
        assert!(index.invariants_hold());
    }

    #[test]
    fn pending_cost_ceiling_then_remove_frees_room() {
        let index = TxIndex::new();
        let cap = CapEnergy(U256::from(42_000u64));

        let mut first = tx(1, 1, None, legacy(10));
        first.resolved.delegator = None;
        first.set_payer_cost(Address::from_low_u64_be(1), U256::from(21_000u64));
        index.add(first.clone(), 16, &cap).unwrap();

        let mut second = tx(1, 2, None, legacy(10));
        second.set_payer_cost(Address::from_low_u64_be(1), U256::from(21_000u64));
        index.add(second, 16, &cap).unwrap();

        let mut third = tx(1, 3, None, legacy(10));
        third.set_payer_cost(Address::from_low_u64_be(1), U256::from(21_000u64));
        let err = index.add(third.clone(), 16, &cap).unwrap_err();
        assert!(err.is_rejected());

        index.remove_by_hash(first.hash());
        index.add(third, 16, &cap).unwrap();
        assert!(index.invariants_hold());
    }

    #[test]
    fn remove_every_stored_hash_empties_all_maps() {
        let index = TxIndex::new();
        let mut hashes = Vec::new();
        for n in 0..5 {
            let entry = tx(1, n, None, legacy(10));
            hashes.push(entry.hash());
            index.add(entry, 16, &AlwaysOk).unwrap();
        }
        for hash in hashes {
            assert!(index.remove_by_hash(hash));
        }
        assert_eq!(index.len(), 0);
        assert!(index.invariants_hold());
    }
}
