//! The public facade. Wires `TxIndex`, `Blocklist`, `FeeParamsCache` and
//! `RecentReject` together behind the admission and housekeeping
//! operations, and runs the two background tasks (Wash ticks, blocklist
//! refresh) behind a `tokio_util` cancellation token, mirroring
//! `ckb-stop-handler`'s shutdown signal without its process-global
//! registry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use txpool_traits::{
    ChainRepository, ForkConfig, HeadSummary, PayerValidator, SignatureRecovery, StateAccessor,
};
use txpool_types::{Hash, ResolvedTx, Transaction, TxEntry, TxHash, TxId};

use crate::callback::{AdmissionEvent, AdmissionFeed};
use crate::component::blocklist::{Blocklist, RefreshOutcome};
use crate::component::executable::Executable;
use crate::component::fee_cache::FeeParamsCache;
use crate::component::pool_map::TxIndex;
use crate::component::recent_reject::RecentReject;
use crate::component::validation::validate_basic;
use crate::component::wash::{Wash, WashContext};
use crate::config::PoolConfig;
use crate::error::{Executability, PoolError};
use crate::metrics::{NoopMetrics, PoolMetrics};
use crate::time::{Clock, SystemClock};

/// The node-side collaborators the pool core never implements itself.
pub struct Collaborators {
    pub chain: Arc<dyn ChainRepository>,
    pub state: Arc<dyn StateAccessor>,
    pub signer: Arc<dyn SignatureRecovery>,
    pub payer_validator: Arc<dyn PayerValidator>,
}

struct Shared {
    config: PoolConfig,
    fork: ForkConfig,
    chain_tag: u8,
    chain: Arc<dyn ChainRepository>,
    state: Arc<dyn StateAccessor>,
    signer: Arc<dyn SignatureRecovery>,
    payer_validator: Arc<dyn PayerValidator>,
    index: TxIndex,
    fee_cache: FeeParamsCache,
    blocklist: Blocklist,
    recent_reject: RecentReject,
    callback: AdmissionFeed,
    metrics: Arc<dyn PoolMetrics>,
    clock: Arc<dyn Clock>,
    slate: ArcSwap<Vec<Transaction>>,
    admissions_since_wash: AtomicUsize,
}

/// The pending-transaction pool. Cheap to share: construct once behind an
/// `Arc`, clone the `Arc` to every task that needs to admit transactions or
/// read the current slate.
pub struct Pool {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Pool {
    pub fn new(
        config: PoolConfig,
        fork: ForkConfig,
        chain_tag: u8,
        collaborators: Collaborators,
    ) -> Arc<Pool> {
        Self::with_metrics_and_clock(
            config,
            fork,
            chain_tag,
            collaborators,
            Arc::new(NoopMetrics),
            Arc::new(SystemClock),
        )
    }

    pub fn with_metrics_and_clock(
        config: PoolConfig,
        fork: ForkConfig,
        chain_tag: u8,
        collaborators: Collaborators,
        metrics: Arc<dyn PoolMetrics>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Pool> {
        let blocklist = match config.blocklist_path.as_ref() {
            Some(path) if path.exists() => {
                Blocklist::load_file(path).unwrap_or_else(|e| {
                    log::warn!("failed to load cached blocklist at {}: {e}", path.display());
                    Blocklist::default()
                })
            }
            _ => Blocklist::default(),
        };

        let shared = Arc::new(Shared {
            config,
            fork,
            chain_tag,
            chain: collaborators.chain,
            state: collaborators.state,
            signer: collaborators.signer,
            payer_validator: collaborators.payer_validator,
            index: TxIndex::new(),
            fee_cache: FeeParamsCache::new(),
            blocklist,
            recent_reject: RecentReject::default(),
            callback: AdmissionFeed::new(),
            metrics,
            clock,
            slate: ArcSwap::from_pointee(Vec::new()),
            admissions_since_wash: AtomicUsize::new(0),
        });

        let cancel = CancellationToken::new();
        let housekeeping = tokio::spawn(Self::housekeeping_task(shared.clone(), cancel.clone()));
        let blocklist_fetch = tokio::spawn(Self::blocklist_task(shared.clone(), cancel.clone()));

        Arc::new(Pool {
            shared,
            cancel,
            tasks: Mutex::new(vec![housekeeping, blocklist_fetch]),
        })
    }

    /// Non-strict remote admission: queues an entry that is valid but not
    /// yet executable instead of rejecting it.
    pub fn add(&self, tx: Transaction) -> Result<(), PoolError> {
        self.admit(tx, false, false)
    }

    /// Local submission: exempt from lifetime eviction and the tighter
    /// remote overflow band.
    pub fn add_local(&self, tx: Transaction) -> Result<(), PoolError> {
        self.admit(tx, true, false)
    }

    /// Remote admission that rejects anything not executable right now.
    pub fn strictly_add(&self, tx: Transaction) -> Result<(), PoolError> {
        self.admit(tx, false, true)
    }

    pub fn get(&self, id: TxId) -> Option<Transaction> {
        self.shared.index.get_by_id(id).map(|e| e.resolved.tx)
    }

    pub fn remove(&self, hash: TxHash) -> bool {
        self.shared.index.remove_by_hash(hash)
    }

    pub fn dump(&self) -> Vec<Transaction> {
        self.shared.index.to_txs()
    }

    /// The current slate: the bounded, priority-ordered set of executable
    /// transactions Wash last produced.
    pub fn executables(&self) -> Vec<Transaction> {
        (*self.shared.slate.load_full()).clone()
    }

    /// Bulk-restores trusted transactions (e.g. re-queuing local
    /// submissions the node is resubmitting after a restart), bypassing
    /// the quota and pending-cost checks `add` performs.
    pub fn fill(&self, txs: Vec<Transaction>, local: bool) {
        let now = self.shared.clock.now_ns();
        let entries: Vec<TxEntry> = txs
            .into_iter()
            .filter_map(|tx| {
                let origin = self.shared.signer.recover_origin(&tx).ok()?;
                let delegator = self.shared.signer.recover_delegator(&tx).ok().flatten();
                let resolved = ResolvedTx::new(tx, origin, delegator);
                Some(TxEntry::new(resolved, now, local))
            })
            .collect();
        self.shared.index.fill(entries);
    }

    /// Runs one Wash pass synchronously instead of waiting for the
    /// housekeeping task's next tick. Exists for tests and for operator
    /// tooling that wants to force re-classification immediately (e.g.
    /// right after a manual blocklist edit).
    pub fn tick_wash(&self) {
        let head = self.shared.chain.head();
        Self::run_wash_pass(&self.shared, head);
    }

    /// Blocks an origin address immediately, without waiting for the next
    /// scheduled blocklist refresh. The next Wash pass evicts any entries
    /// it already holds.
    pub fn block_address(&self, address: txpool_types::Address) {
        self.shared.blocklist.insert(address);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AdmissionEvent> {
        self.shared.callback.subscribe()
    }

    pub fn len(&self) -> usize {
        self.shared.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.index.is_empty()
    }

    /// Cancels both background tasks and waits for them to exit.
    pub async fn close(&self) {
        self.cancel.cancel();
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        for handle in handles {
            let _ = handle.await;
        }
    }

    fn admit(&self, tx: Transaction, local: bool, strict: bool) -> Result<(), PoolError> {
        let shared = &*self.shared;
        let hash = tx.hash();

        if shared.index.contains_hash(hash) {
            return Ok(());
        }
        if let Some(reason) = shared.recent_reject.get(&hash) {
            return Err(PoolError::Rejected(reason));
        }

        let head = shared.chain.head();
        let now_secs = shared.clock.unix_secs();
        let synced = is_synced(now_secs, head.timestamp, shared.config.block_interval_secs);

        let len = shared.index.len();
        let overflowing = if synced {
            if local {
                len >= shared.config.limit
            } else {
                len >= shared.config.overflow_limit()
            }
        } else {
            len >= shared.config.limit
        };
        if overflowing {
            let err = PoolError::Rejected("pool full".to_string());
            record_rejection(shared, hash, &err);
            return Err(err);
        }

        let next_block_number = head.next_block_number();
        let next_features = shared.state.next_features(head.id, next_block_number);
        if let Err(e) = validate_basic(&tx, shared.chain_tag, &shared.fork, next_block_number, next_features) {
            record_rejection(shared, hash, &e);
            return Err(e);
        }

        let origin = match shared.signer.recover_origin(&tx) {
            Ok(o) => o,
            Err(e) => {
                let e = PoolError::from(e);
                record_rejection(shared, hash, &e);
                return Err(e);
            }
        };
        let delegator = match shared.signer.recover_delegator(&tx) {
            Ok(d) => d,
            Err(e) => {
                let e = PoolError::from(e);
                record_rejection(shared, hash, &e);
                return Err(e);
            }
        };

        let resolved = ResolvedTx::new(tx.clone(), origin, delegator);
        let mut entry = TxEntry::new(resolved, shared.clock.now_ns(), local);

        if synced {
            let outcome = match shared.fee_cache.base_fee(shared.chain.as_ref(), &shared.fork, head.id) {
                Ok(next_base_fee) => {
                    let executable = Executable {
                        chain: shared.chain.as_ref(),
                        state: shared.state.as_ref(),
                        fork: &shared.fork,
                        fee_cache: &shared.fee_cache,
                    };
                    executable.check(&mut entry, &head, next_base_fee)
                }
                Err(e) => Err(PoolError::from(e)),
            };
            match outcome {
                Ok(Executability::Executable) => {}
                Ok(Executability::Queued) => {
                    if strict {
                        let e = PoolError::Rejected("not executable in strict mode".to_string());
                        record_rejection(shared, hash, &e);
                        return Err(e);
                    }
                }
                Err(e) if e.is_transient() => {
                    log::debug!("admission: transient executability failure for {hash}: {e}");
                    if strict {
                        let e = PoolError::Rejected("not executable in strict mode".to_string());
                        record_rejection(shared, hash, &e);
                        return Err(e);
                    }
                }
                Err(e) => {
                    record_rejection(shared, hash, &e);
                    return Err(e);
                }
            }
        } else if strict {
            let e = PoolError::Rejected("chain not synced".to_string());
            record_rejection(shared, hash, &e);
            return Err(e);
        }

        let executable_flag = if synced { Some(entry.executable) } else { None };
        match shared
            .index
            .add(entry, shared.config.limit_per_account, shared.payer_validator.as_ref())
        {
            Ok(replaced) => {
                if replaced {
                    shared.metrics.replaced();
                }
                shared.metrics.admitted(local);
                shared.admissions_since_wash.fetch_add(1, Ordering::Relaxed);
                shared.callback.publish(tx, executable_flag);
                Ok(())
            }
            Err(e) => {
                record_rejection(shared, hash, &e);
                Err(e)
            }
        }
    }

    async fn housekeeping_task(shared: Arc<Shared>, cancel: CancellationToken) {
        let mut last_head: Option<Hash> = None;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(shared.config.wash_tick) => {}
            }

            let head = shared.chain.head();
            let len = shared.index.len();
            let admissions = shared.admissions_since_wash.load(Ordering::Relaxed);
            let head_changed = last_head != Some(head.id);
            let small_pool_recent_admission = len < 200 && admissions > 0;

            if !(head_changed || len > shared.config.limit || small_pool_recent_admission) {
                continue;
            }
            last_head = Some(head.id);
            shared.admissions_since_wash.store(0, Ordering::Relaxed);
            Self::run_wash_pass(&shared, head);
        }
    }

    fn run_wash_pass(shared: &Arc<Shared>, head: HeadSummary) {
        let next_base_fee = match shared.fee_cache.base_fee(shared.chain.as_ref(), &shared.fork, head.id) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("wash: could not resolve base fee for parent {}: {e}", head.id);
                return;
            }
        };

        let not_synced_threshold_secs = 6 * shared.config.block_interval_secs.max(1);
        let ctx = WashContext {
            index: &shared.index,
            chain: shared.chain.as_ref(),
            state: shared.state.as_ref(),
            fork: &shared.fork,
            fee_cache: &shared.fee_cache,
            blocklist: &shared.blocklist,
            clock: shared.clock.as_ref(),
            callback: &shared.callback,
            metrics: shared.metrics.as_ref(),
            limit: shared.config.limit,
            max_lifetime_ns: shared.config.max_lifetime.as_nanos(),
            not_synced_threshold_secs,
        };
        let outcome = Wash::run(&ctx, &head, next_base_fee);
        let txs: Vec<Transaction> = outcome.kept.iter().map(|e| e.resolved.tx.clone()).collect();
        shared.slate.store(Arc::new(txs));
    }

    async fn blocklist_task(shared: Arc<Shared>, cancel: CancellationToken) {
        let Some(url) = shared.config.blocklist_url.clone() else {
            return;
        };
        loop {
            let min_ms = shared.config.blocklist_refresh_min.as_millis() as u64;
            let max_ms = shared.config.blocklist_refresh_max.as_millis().max(min_ms as u128) as u64;
            let jitter_ms = rand::thread_rng().gen_range(min_ms..=max_ms);
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(Duration::from_millis(jitter_ms)) => {}
            }

            match shared
                .blocklist
                .refresh_from_url(&url, shared.config.blocklist_path.as_ref())
                .await
            {
                Ok(RefreshOutcome::Updated { count }) => {
                    log::info!("blocklist refreshed: {count} addresses")
                }
                Ok(RefreshOutcome::NotModified) => {}
                Err(e) => log::warn!("blocklist refresh failed: {e}"),
            }
        }
    }
}

impl Drop for Pool {
    /// Best-effort, non-blocking: cancels the background tasks but does not
    /// wait for them. Call `close().await` to wait.
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn is_synced(now_secs: u64, head_timestamp: u64, block_interval_secs: u64) -> bool {
    let threshold = 6 * block_interval_secs.max(1);
    now_secs.saturating_sub(head_timestamp) < threshold
        && head_timestamp.saturating_sub(now_secs) < threshold
}

fn record_rejection(shared: &Shared, hash: TxHash, e: &PoolError) {
    if e.is_bad_tx() {
        shared.metrics.bad_tx();
    } else {
        shared.metrics.rejected();
    }
    shared.recent_reject.put(hash, e.to_string());
}
