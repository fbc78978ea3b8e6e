//! The three error kinds from the design's error-handling section, plus the
//! narrower per-component errors that feed into them. `BadTx` and `Rejected`
//! are distinguished because callers count them against different metrics
//! and never retry either; `Transient` is distinguished because the entry
//! stays in the pool and Wash will retry it.

use thiserror::Error;
use txpool_traits::{ChainError, RecoveryError, StateError};

#[derive(Debug, Error)]
pub enum PoolError {
    /// Malformed or cryptographically invalid. Never retried, never counted
    /// toward quotas, not relayed.
    #[error("bad transaction: {0}")]
    BadTx(String),

    /// Well-formed but not admissible right now. Not relayed; caller may
    /// retry later.
    #[error("rejected: {0}")]
    Rejected(String),

    /// A state-access error encountered during `Executable`. The entry is
    /// left in the pool; Wash will retry it on the next pass.
    #[error("transient: {0}")]
    Transient(String),
}

impl PoolError {
    pub fn is_bad_tx(&self) -> bool {
        matches!(self, PoolError::BadTx(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, PoolError::Rejected(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, PoolError::Transient(_))
    }
}

impl From<RecoveryError> for PoolError {
    fn from(e: RecoveryError) -> Self {
        PoolError::BadTx(e.to_string())
    }
}

impl From<ChainError> for PoolError {
    fn from(e: ChainError) -> Self {
        PoolError::Transient(e.to_string())
    }
}

impl From<StateError> for PoolError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::InsufficientEnergy => {
                PoolError::Rejected("insufficient energy for overall pending cost".to_string())
            }
            other => PoolError::Transient(other.to_string()),
        }
    }
}

/// Outcome of `Executable::check`: either a go/no-go classification, or one
/// of the error kinds above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Executability {
    Executable,
    /// Valid but not executable yet (future block-ref, or dependency not
    /// yet landed on chain).
    Queued,
}
