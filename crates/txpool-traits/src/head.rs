use txpool_types::Hash;

/// Snapshot of the best block, as seen by the pool. Passed explicitly into
/// `Executable`/`Wash` rather than held by `TxIndex`, so the pool core never
/// owns a handle back into the chain (see the design's note on breaking the
/// pool/head/state reference cycle).
///
/// Deliberately does not carry a base fee: the head block's own base fee
/// (already settled on chain) is a different number from the *next*
/// block's base fee the fee-market recurrence produces, which is what the
/// pool needs and fetches separately through `FeeParamsCache`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeadSummary {
    pub id: Hash,
    pub number: u64,
    pub timestamp: u64,
    pub gas_limit: u64,
}

impl HeadSummary {
    pub fn next_block_number(&self) -> u64 {
        self.number + 1
    }

    pub fn next_block_timestamp(&self, block_interval_secs: u64) -> u64 {
        self.timestamp + block_interval_secs
    }
}
