//! Subscriber registry
//!
//! Owned and mutated exclusively by the hub actor. The set of requested
//! symbols is mirrored into a read-mostly snapshot so the scheduler can read
//! it without going through the actor's command queue.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info};

use ticker_core::Quote;

/// Opaque handle identifying one connected subscriber.
pub type SubscriberId = u64;

/// A connected consumer. `symbol: None` means connected but not yet
/// subscribed; it receives nothing, which is a valid state.
struct Subscriber {
    symbol: Option<String>,
    tx: mpsc::Sender<Quote>,
}

pub(crate) struct Registry {
    subscribers: HashMap<SubscriberId, Subscriber>,
    snapshot: Arc<RwLock<HashSet<String>>>,
    count: Arc<AtomicUsize>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
            snapshot: Arc::new(RwLock::new(HashSet::new())),
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared view of the distinct requested symbols.
    pub(crate) fn snapshot_handle(&self) -> Arc<RwLock<HashSet<String>>> {
        Arc::clone(&self.snapshot)
    }

    pub(crate) fn count_handle(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.count)
    }

    pub(crate) fn connect(&mut self, id: SubscriberId, tx: mpsc::Sender<Quote>) {
        self.subscribers.insert(id, Subscriber { symbol: None, tx });
        self.sync_derived();
        info!(id, total = self.subscribers.len(), "client connected");
    }

    /// Set or replace the subscriber's requested symbol. Unknown ids are
    /// ignored; the connection may already be gone.
    pub(crate) fn subscribe(&mut self, id: SubscriberId, symbol: String) {
        match self.subscribers.get_mut(&id) {
            Some(subscriber) => {
                info!(id, %symbol, "client subscribed");
                subscriber.symbol = Some(symbol);
                self.sync_derived();
            }
            None => debug!(id, %symbol, "subscribe for unknown client ignored"),
        }
    }

    /// Remove a subscriber. Idempotent: removing twice is a no-op.
    pub(crate) fn disconnect(&mut self, id: SubscriberId) {
        if self.subscribers.remove(&id).is_some() {
            self.sync_derived();
            info!(id, total = self.subscribers.len(), "client disconnected");
        }
    }

    /// Fan one quote out to every subscriber requesting its symbol.
    ///
    /// Delivery is attempted independently per subscriber: a closed channel
    /// removes that subscriber on the spot, a full channel drops this quote
    /// for that subscriber only (the next tick supersedes it). Neither case
    /// affects anyone else in the pass.
    pub(crate) fn deliver(&mut self, quote: &Quote) {
        let mut dead = Vec::new();

        for (id, subscriber) in &self.subscribers {
            if subscriber.symbol.as_deref() != Some(quote.symbol.as_str()) {
                continue;
            }

            match subscriber.tx.try_send(quote.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    debug!(id, symbol = %quote.symbol, "subscriber channel full, dropping quote");
                }
                Err(TrySendError::Closed(_)) => dead.push(*id),
            }
        }

        for id in dead {
            info!(id, "removing subscriber with closed channel");
            self.subscribers.remove(&id);
        }
        self.sync_derived();
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Refresh the derived symbol snapshot and subscriber count after a
    /// mutation. Invariant: the snapshot equals the distinct requested
    /// symbols of live subscribers.
    fn sync_derived(&self) {
        let symbols: HashSet<String> = self
            .subscribers
            .values()
            .filter_map(|s| s.symbol.clone())
            .collect();

        *self.snapshot.write() = symbols;
        self.count.store(self.subscribers.len(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_snapshot() -> (Registry, Arc<RwLock<HashSet<String>>>) {
        let registry = Registry::new();
        let snapshot = registry.snapshot_handle();
        (registry, snapshot)
    }

    fn symbols(snapshot: &Arc<RwLock<HashSet<String>>>) -> HashSet<String> {
        snapshot.read().clone()
    }

    #[test]
    fn test_snapshot_tracks_every_mutation() {
        let (mut registry, snapshot) = registry_with_snapshot();
        let (tx_a, _rx_a) = mpsc::channel(4);
        let (tx_b, _rx_b) = mpsc::channel(4);

        registry.connect(1, tx_a);
        assert!(symbols(&snapshot).is_empty(), "connected-only client has no symbol");

        registry.subscribe(1, "AAPL".to_string());
        assert_eq!(symbols(&snapshot), HashSet::from(["AAPL".to_string()]));

        registry.connect(2, tx_b);
        registry.subscribe(2, "MSFT".to_string());
        assert_eq!(
            symbols(&snapshot),
            HashSet::from(["AAPL".to_string(), "MSFT".to_string()])
        );

        // Re-subscription replaces the symbol, it does not add one.
        registry.subscribe(1, "MSFT".to_string());
        assert_eq!(symbols(&snapshot), HashSet::from(["MSFT".to_string()]));

        registry.disconnect(1);
        registry.disconnect(2);
        assert!(symbols(&snapshot).is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_duplicate_symbol_counted_once() {
        let (mut registry, snapshot) = registry_with_snapshot();
        let (tx_a, _rx_a) = mpsc::channel(4);
        let (tx_b, _rx_b) = mpsc::channel(4);

        registry.connect(1, tx_a);
        registry.connect(2, tx_b);
        registry.subscribe(1, "AAPL".to_string());
        registry.subscribe(2, "AAPL".to_string());

        assert_eq!(symbols(&snapshot).len(), 1);

        // One of two unsubscribing keeps the symbol active.
        registry.disconnect(1);
        assert_eq!(symbols(&snapshot), HashSet::from(["AAPL".to_string()]));
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let (mut registry, _snapshot) = registry_with_snapshot();
        let (tx, _rx) = mpsc::channel(4);

        registry.connect(1, tx);
        registry.disconnect(1);
        registry.disconnect(1);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_deliver_routes_by_symbol() {
        let (mut registry, _snapshot) = registry_with_snapshot();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        let (tx_c, mut rx_c) = mpsc::channel(4);

        registry.connect(1, tx_a);
        registry.subscribe(1, "AAPL".to_string());
        registry.connect(2, tx_b);
        registry.subscribe(2, "MSFT".to_string());
        registry.connect(3, tx_c); // never subscribes

        registry.deliver(&Quote::new("AAPL", "189.95"));

        assert_eq!(rx_a.try_recv().unwrap().symbol, "AAPL");
        assert!(rx_b.try_recv().is_err());
        assert!(rx_c.try_recv().is_err());
    }

    #[test]
    fn test_deliver_removes_closed_subscriber() {
        let (mut registry, snapshot) = registry_with_snapshot();
        let (tx_a, rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);

        registry.connect(1, tx_a);
        registry.subscribe(1, "AAPL".to_string());
        registry.connect(2, tx_b);
        registry.subscribe(2, "AAPL".to_string());

        drop(rx_a);
        registry.deliver(&Quote::new("AAPL", "189.95"));

        assert_eq!(registry.len(), 1, "dead subscriber removed during the pass");
        assert_eq!(rx_b.try_recv().unwrap().price, "189.95");
        assert_eq!(symbols(&snapshot), HashSet::from(["AAPL".to_string()]));
    }

    #[test]
    fn test_full_channel_drops_quote_not_subscriber() {
        let (mut registry, _snapshot) = registry_with_snapshot();
        let (tx, mut rx) = mpsc::channel(1);

        registry.connect(1, tx);
        registry.subscribe(1, "AAPL".to_string());

        registry.deliver(&Quote::new("AAPL", "1"));
        registry.deliver(&Quote::new("AAPL", "2")); // dropped, channel full

        assert_eq!(registry.len(), 1);
        assert_eq!(rx.try_recv().unwrap().price, "1");
        assert!(rx.try_recv().is_err());
    }
}
