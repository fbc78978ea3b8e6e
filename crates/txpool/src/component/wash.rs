//! The periodic re-classification pass. Snapshots the index, decides
//! an outcome per entry, re-sorts the executable subset, enforces the
//! executable cap, and publishes the result as the new slate.

use txpool_traits::{ChainRepository, ForkConfig, HeadSummary, StateAccessor};
use txpool_types::{TxEntry, TxHash, U256};

use crate::callback::AdmissionFeed;
use crate::component::blocklist::Blocklist;
use crate::component::executable::Executable;
use crate::component::fee_cache::FeeParamsCache;
use crate::component::pool_map::TxIndex;
use crate::error::Executability;
use crate::metrics::PoolMetrics;
use crate::time::Clock;

pub struct WashContext<'a> {
    pub index: &'a TxIndex,
    pub chain: &'a dyn ChainRepository,
    pub state: &'a dyn StateAccessor,
    pub fork: &'a ForkConfig,
    pub fee_cache: &'a FeeParamsCache,
    pub blocklist: &'a Blocklist,
    pub clock: &'a dyn Clock,
    pub callback: &'a AdmissionFeed,
    pub metrics: &'a dyn PoolMetrics,
    pub limit: usize,
    pub max_lifetime_ns: u128,
    pub not_synced_threshold_secs: u64,
}

/// Outcome of one `Wash::run`: the entries it kept, in the exact order the
/// next slate should publish them.
pub struct WashOutcome {
    pub kept: Vec<TxEntry>,
}

pub struct Wash;

impl Wash {
    /// `next_base_fee` is computed once by the caller (via `FeeParamsCache`)
    /// and threaded through every entry this pass, rather than recomputed
    /// per entry.
    pub fn run(ctx: &WashContext<'_>, head: &HeadSummary, next_base_fee: Option<U256>) -> WashOutcome {
        let entries = ctx.index.to_entries();
        let now_secs = ctx.clock.unix_secs();
        let synced = now_secs.saturating_sub(head.timestamp)
            < ctx.not_synced_threshold_secs
            && head.timestamp.saturating_sub(now_secs) < ctx.not_synced_threshold_secs;

        if !synced {
            Self::cap_only(ctx, entries);
            return WashOutcome { kept: ctx.index.to_entries() };
        }

        let now_ns = ctx.clock.now_ns();
        let mut remote_executable = Vec::new();
        let mut local_executable = Vec::new();
        let mut non_executable = Vec::new();

        for mut entry in entries {
            if ctx.blocklist.contains(&entry.origin()) {
                ctx.index.remove_by_hash(entry.hash());
                ctx.metrics.evicted("blocked");
                continue;
            }
            if !entry.local_submitted && now_ns.saturating_sub(entry.time_added) > ctx.max_lifetime_ns {
                ctx.index.remove_by_hash(entry.hash());
                ctx.metrics.evicted("out of lifetime");
                continue;
            }

            let executable = Executable {
                chain: ctx.chain,
                state: ctx.state,
                fork: ctx.fork,
                fee_cache: ctx.fee_cache,
            };
            let was_executable = entry.executable;
            match executable.check(&mut entry, head, next_base_fee) {
                Err(reason) => {
                    ctx.index.remove_by_hash(entry.hash());
                    ctx.metrics.evicted("not executable");
                    log::debug!("wash dropped tx {}: {}", entry.hash(), reason);
                    continue;
                }
                Ok(Executability::Queued) => {
                    non_executable.push(entry);
                    continue;
                }
                Ok(Executability::Executable) => {
                    let hash = entry.hash();
                    ctx.index.replace_entry(hash, entry.clone());
                    let newly_executable = !was_executable;
                    if newly_executable || entry.local_submitted {
                        ctx.callback.publish(entry.resolved.tx.clone(), Some(true));
                    }
                    if entry.local_submitted {
                        local_executable.push(entry);
                    } else {
                        remote_executable.push(entry);
                    }
                }
            }
        }

        remote_executable.sort_by(|a, b| {
            b.priority_gas_price
                .cmp(&a.priority_gas_price)
                .then(a.time_added.cmp(&b.time_added))
        });

        if remote_executable.len() > ctx.limit {
            for entry in non_executable.drain(..) {
                ctx.index.remove_by_hash(entry.hash());
                ctx.metrics.evicted("pool full");
            }
            for entry in remote_executable.split_off(ctx.limit) {
                ctx.index.remove_by_hash(entry.hash());
                ctx.metrics.evicted("pool full");
            }
        } else if remote_executable.len() + non_executable.len() > ctx.limit {
            non_executable.sort_by(|a, b| b.priority_gas_price.cmp(&a.priority_gas_price));
            let keep = ctx.limit - remote_executable.len();
            for entry in non_executable.split_off(keep.min(non_executable.len())) {
                ctx.index.remove_by_hash(entry.hash());
                ctx.metrics.evicted("pool full");
            }
        }

        let mut combined = remote_executable;
        combined.extend(local_executable);
        combined.sort_by(|a, b| {
            b.priority_gas_price
                .cmp(&a.priority_gas_price)
                .then(a.time_added.cmp(&b.time_added))
        });

        WashOutcome { kept: combined }
    }

    /// Chain not synced: skip validation/executability work entirely and
    /// just keep the pool within `limit`, dropping the oldest admissions
    /// first (the only ordering available without a trustworthy head).
    fn cap_only(ctx: &WashContext<'_>, mut entries: Vec<TxEntry>) {
        if entries.len() <= ctx.limit {
            return;
        }
        entries.sort_by(|a, b| a.time_added.cmp(&b.time_added));
        let overflow = entries.len() - ctx.limit;
        let victims: Vec<TxHash> = entries.iter().take(overflow).map(|e| e.hash()).collect();
        for hash in victims {
            ctx.index.remove_by_hash(hash);
            ctx.metrics.evicted("pool full");
        }
    }
}
