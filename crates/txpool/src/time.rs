//! A small injectable clock, mirroring `ckb-systemtime`'s faketime guard
//! without a process-global mutable flag: tests hand the pool a `FakeClock`
//! instead of reaching for a `cfg(feature = "enable_faketime")` build.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    /// Monotonic nanoseconds, used for `TxEntry::time_added` and lifetime
    /// comparisons. Need not be wall-clock accurate, only monotonic.
    fn now_ns(&self) -> u128;

    /// Wall-clock unix seconds, used for the "chain synced" check and the
    /// blocklist refresh scheduler.
    fn unix_secs(&self) -> u64;
}

#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ns(&self) -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_nanos()
    }

    fn unix_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs()
    }
}

/// Deterministic clock for tests: starts at a fixed instant and only moves
/// when told to.
pub struct FakeClock {
    ns: AtomicU64,
}

impl FakeClock {
    pub fn new(start_unix_secs: u64) -> Self {
        FakeClock {
            ns: AtomicU64::new(start_unix_secs.saturating_mul(1_000_000_000)),
        }
    }

    pub fn advance_secs(&self, secs: u64) {
        self.ns.fetch_add(secs * 1_000_000_000, Ordering::SeqCst);
    }

    pub fn advance_ns(&self, ns: u64) {
        self.ns.fetch_add(ns, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_ns(&self) -> u128 {
        self.ns.load(Ordering::SeqCst) as u128
    }

    fn unix_secs(&self) -> u64 {
        (self.ns.load(Ordering::SeqCst)) / 1_000_000_000
    }
}
