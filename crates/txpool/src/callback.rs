//! Admission event fan-out. A bounded `tokio::sync::broadcast` channel gives
//! drop-oldest-on-lag semantics natively, so event publication never blocks
//! pool mutation and never grows unbounded.

use tokio::sync::broadcast;
use txpool_types::Transaction;

/// `None` for `executable` means the chain was not synced at the time of
/// admission, so executability is unknown.
#[derive(Clone, Debug)]
pub struct AdmissionEvent {
    pub tx: Transaction,
    pub executable: Option<bool>,
}

const CHANNEL_CAPACITY: usize = 4096;

pub struct AdmissionFeed {
    sender: broadcast::Sender<AdmissionEvent>,
}

impl Default for AdmissionFeed {
    fn default() -> Self {
        let (sender, _receiver) = broadcast::channel(CHANNEL_CAPACITY);
        AdmissionFeed { sender }
    }
}

impl AdmissionFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AdmissionEvent> {
        self.sender.subscribe()
    }

    /// Never blocks; a slow subscriber just misses events (lagged reads
    /// surface as `RecvError::Lagged` on their receiver).
    pub fn publish(&self, tx: Transaction, executable: Option<bool>) {
        let _ = self.sender.send(AdmissionEvent { tx, executable });
    }
}
