use txpool_types::U256;

/// Protocol-upgrade heights and fee-market constants. The name `galactica`
/// names the fee-market upgrade height, matching the fork-name vocabulary
/// the rest of the design (and its worked examples) uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForkConfig {
    /// Height at which the dynamic-fee market and `DynamicFee` transactions
    /// become legal. Base fee is undefined below this height.
    pub galactica: u64,
    pub block_interval_secs: u64,
    pub elasticity_multiplier_num: u64,
    pub elasticity_multiplier_den: u64,
    pub initial_base_fee: U256,
}

impl Default for ForkConfig {
    fn default() -> Self {
        ForkConfig {
            galactica: u64::MAX,
            block_interval_secs: 10,
            elasticity_multiplier_num: 75,
            elasticity_multiplier_den: 100,
            initial_base_fee: U256::from(10_u64).pow(U256::from(13)),
        }
    }
}
