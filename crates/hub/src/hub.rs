//! Distribution hub actor
//!
//! One task owns the subscriber registry and drains a bounded command queue;
//! registration, removal and fan-out are serialized through it, so the
//! registry itself needs no locking. Producers hand commands over with
//! `try_send`: when the queue is saturated the command is dropped and logged
//! rather than blocking anyone (a dropped quote is superseded by the next
//! poll tick anyway).

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};

use ticker_core::{HubConfig, HubError, HubResult, Quote};

use crate::registry::{Registry, SubscriberId};

enum HubCommand {
    Connect {
        id: SubscriberId,
        tx: mpsc::Sender<Quote>,
    },
    Subscribe {
        id: SubscriberId,
        symbol: String,
    },
    Disconnect {
        id: SubscriberId,
    },
    Publish {
        quote: Quote,
    },
}

/// The sequential actor. Construct with [`Hub::new`], then spawn [`Hub::run`].
pub struct Hub {
    rx: mpsc::Receiver<HubCommand>,
    registry: Registry,
}

/// Cheaply cloneable handle used by the transport, pollers and scheduler.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
    snapshot: Arc<RwLock<HashSet<String>>>,
    count: Arc<AtomicUsize>,
    next_id: Arc<AtomicU64>,
    subscriber_buffer: usize,
}

impl Hub {
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(config.command_buffer);
        let registry = Registry::new();

        let handle = HubHandle {
            tx,
            snapshot: registry.snapshot_handle(),
            count: registry.count_handle(),
            next_id: Arc::new(AtomicU64::new(1)),
            subscriber_buffer: config.subscriber_buffer,
        };

        (Self { rx, registry }, handle)
    }

    /// Drain commands until every handle is dropped.
    pub async fn run(mut self) {
        info!("hub started");

        while let Some(command) = self.rx.recv().await {
            match command {
                HubCommand::Connect { id, tx } => self.registry.connect(id, tx),
                HubCommand::Subscribe { id, symbol } => self.registry.subscribe(id, symbol),
                HubCommand::Disconnect { id } => self.registry.disconnect(id),
                HubCommand::Publish { quote } => self.registry.deliver(&quote),
            }
        }

        info!("hub stopped");
    }
}

impl HubHandle {
    /// Register a new connection. Returns its id and the outbound quote
    /// channel; nothing arrives on it until the client subscribes.
    pub fn connect(&self) -> HubResult<(SubscriberId, mpsc::Receiver<Quote>)> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.subscriber_buffer);

        self.send(HubCommand::Connect { id, tx })?;
        Ok((id, rx))
    }

    /// Set or replace the connection's requested symbol.
    pub fn subscribe(&self, id: SubscriberId, symbol: impl Into<String>) -> HubResult<()> {
        self.send(HubCommand::Subscribe {
            id,
            symbol: symbol.into(),
        })
    }

    /// Remove the connection. Idempotent; a saturated queue only means the
    /// removal happens later, when delivery to the closed channel fails.
    pub fn disconnect(&self, id: SubscriberId) {
        if let Err(e) = self.send(HubCommand::Disconnect { id }) {
            warn!(id, error = %e, "disconnect command dropped");
        }
    }

    /// Publish a quote to all subscribers of its symbol. Dropped without
    /// blocking when the hub queue is saturated.
    pub fn publish(&self, quote: Quote) {
        let symbol = quote.symbol.clone();
        if let Err(e) = self.send(HubCommand::Publish { quote }) {
            warn!(%symbol, error = %e, "publish dropped");
        }
    }

    /// Snapshot of the distinct requested symbols across live subscribers.
    /// Reads shared state directly, no round trip through the actor.
    pub fn active_symbols(&self) -> HashSet<String> {
        self.snapshot.read().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    fn send(&self, command: HubCommand) -> HubResult<()> {
        self.tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => HubError::QueueFull,
            TrySendError::Closed(_) => HubError::Closed,
        })
    }
}
