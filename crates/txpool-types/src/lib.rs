//! Value types shared by the pool core: addresses, content identifiers,
//! the transaction shape, and the pool's own resolved/pooled wrappers
//! around it. No logic beyond pure derivations (ids, intrinsic gas); no
//! I/O, no locking, no chain/state access.

pub mod entry;
pub mod hash;
pub mod resolved;
pub mod transaction;

pub use ethereum_types::{Address, U256};
pub use entry::TxEntry;
pub use hash::{Hash, TxHash, TxId};
pub use resolved::ResolvedTx;
pub use transaction::{Clause, FeeSchedule, Transaction, TxFeatures};
