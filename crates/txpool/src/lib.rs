//! Pending-transaction pool core: admission, the executable/queued split,
//! periodic re-classification, and a bounded feed of admission events.
//! Chain access, state access, signature recovery, and governance
//! parameters are all external collaborators, specified in `txpool-traits`
//! and supplied by the embedder at construction time.

pub mod callback;
pub mod component;
pub mod config;
pub mod error;
pub mod metrics;
mod pool;
pub mod time;

pub use callback::AdmissionEvent;
pub use config::PoolConfig;
pub use error::PoolError;
pub use metrics::{NoopMetrics, PoolMetrics};
pub use pool::{Collaborators, Pool};
pub use time::{Clock, FakeClock, SystemClock};
