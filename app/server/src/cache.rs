//! Request-scoped cache of assembled transactions.

use std::collections::HashMap;

use crate::protocol::Transaction;

/// Maps a transaction id to its previously assembled [`Transaction`] so
/// one resolution pass pays at most one detail round-trip per txid.
///
/// One instance per resolution request: created when the request starts,
/// dropped when it completes. Sharing an instance across concurrent
/// requests is not allowed — an eviction on one request's failure path
/// would corrupt the other's in-flight resolution. The engine enforces
/// this by constructing the cache inside the resolution call and threading
/// it through by mutable reference.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<String, Transaction>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, txid: &str) -> Option<&Transaction> {
        self.entries.get(txid)
    }

    /// Stores `tx` under its own id, replacing any previous entry.
    pub fn put(&mut self, tx: Transaction) {
        self.entries.insert(tx.id.clone(), tx);
    }

    pub fn evict(&mut self, txid: &str) {
        self.entries.remove(txid);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
