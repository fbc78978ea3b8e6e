//! Counter increments only — registration and export are the embedder's
//! concern (`ckb-metrics`'s OpenTelemetry wiring is out of this crate's
//! scope). Default methods are no-ops so embedders that don't care pay
//! nothing.

pub trait PoolMetrics: Send + Sync {
    fn bad_tx(&self) {}
    fn rejected(&self) {}
    fn admitted(&self, _local: bool) {}
    fn evicted(&self, _reason: &'static str) {}
    fn replaced(&self) {}
}

#[derive(Default)]
pub struct NoopMetrics;

impl PoolMetrics for NoopMetrics {}
