use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunable pool knobs: capacity and per-account limits, plus the ambient
/// settings the pool always needs — how often Wash ticks, and the
/// blocklist refresh jitter window.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum total entries in the pool under synced operation.
    pub limit: usize,
    /// Maximum entries per origin AND per delegator.
    pub limit_per_account: u32,
    /// Remote entries older than this are evicted by Wash.
    pub max_lifetime: Duration,
    /// Local cache file for the blocklist.
    pub blocklist_path: Option<PathBuf>,
    /// Upstream to fetch the blocklist from; `None` disables fetching.
    pub blocklist_url: Option<String>,

    pub block_interval_secs: u64,
    pub wash_tick: Duration,
    pub blocklist_refresh_min: Duration,
    pub blocklist_refresh_max: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            limit: 10_000,
            limit_per_account: 16,
            max_lifetime: Duration::from_secs(20 * 60),
            blocklist_path: None,
            blocklist_url: None,
            block_interval_secs: 10,
            wash_tick: Duration::from_secs(1),
            blocklist_refresh_min: Duration::from_secs(60),
            blocklist_refresh_max: Duration::from_secs(120),
        }
    }
}

impl PoolConfig {
    pub fn overflow_limit(&self) -> usize {
        // 120% of `limit`, the admission overflow band for non-local
        // submissions while synced.
        self.limit + self.limit / 5
    }
}
