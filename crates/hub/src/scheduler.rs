//! Poller reconciliation loop
//!
//! Sole owner of the poller handles. On a fixed interval it compares the
//! symbols subscribers currently request against the pollers actually
//! running, spawning and retiring tasks to close the gap. Retirement is a
//! flag clear, never an abort; the poller does its own shutdown at the next
//! tick boundary and the exited handle is collected a cycle later.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

use ticker_core::{PollerConfig, SchedulerConfig};
use ticker_source::QuoteSource;

use crate::hub::HubHandle;
use crate::poller::Poller;

struct PollerHandle {
    live: Arc<AtomicBool>,
    last_tick_ms: Arc<AtomicU64>,
    join: JoinHandle<()>,
}

impl PollerHandle {
    fn mark(&self, live: bool) {
        self.live.store(live, Ordering::Relaxed);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::Relaxed)
    }

    fn last_tick_ms(&self) -> u64 {
        self.last_tick_ms.load(Ordering::Relaxed)
    }
}

pub struct Scheduler {
    hub: HubHandle,
    source: Arc<dyn QuoteSource>,
    config: SchedulerConfig,
    poller_config: PollerConfig,
    pollers: HashMap<String, PollerHandle>,
}

/// Point-in-time view of the poller fleet.
#[derive(Debug, Clone)]
pub struct SchedulerStats {
    pub running_pollers: usize,
    pub live_pollers: usize,
}

impl Scheduler {
    pub fn new(
        hub: HubHandle,
        source: Arc<dyn QuoteSource>,
        config: SchedulerConfig,
        poller_config: PollerConfig,
    ) -> Self {
        Self {
            hub,
            source,
            config,
            poller_config,
            pollers: HashMap::new(),
        }
    }

    /// Reconcile until the shutdown signal fires, then retire every poller.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        info!(
            interval = ?self.config.reconcile_interval,
            "scheduler started"
        );

        let mut ticker = interval(self.config.reconcile_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.reconcile(),
                _ = &mut shutdown => {
                    info!("scheduler shutdown requested");
                    break;
                }
            }
        }

        for (symbol, handle) in self.pollers.drain() {
            debug!(%symbol, "retiring poller on shutdown");
            handle.mark(false);
        }
        info!("scheduler stopped");
    }

    /// One reconciliation pass. Re-marking an already-running or
    /// already-retired symbol is a no-op, so repeated passes are idempotent.
    fn reconcile(&mut self) {
        // Collect pollers that confirmed their exit since the last pass.
        self.pollers.retain(|symbol, handle| {
            if handle.join.is_finished() {
                debug!(%symbol, "collected exited poller");
                false
            } else {
                true
            }
        });

        let desired = self.hub.active_symbols();

        for symbol in &desired {
            match self.pollers.get(symbol) {
                // A still-draining poller whose symbol came back is revived
                // in place; spawning a second one would break the
                // one-poller-per-symbol invariant.
                Some(handle) => handle.mark(true),
                None => self.start_poller(symbol),
            }
        }

        for (symbol, handle) in &self.pollers {
            if !desired.contains(symbol) && handle.is_live() {
                info!(%symbol, "no subscribers left, marking poller inactive");
                handle.mark(false);
            }
        }
    }

    fn start_poller(&mut self, symbol: &str) {
        let live = Arc::new(AtomicBool::new(true));
        let last_tick_ms = Arc::new(AtomicU64::new(0));

        let poller = Poller::new(
            symbol.to_string(),
            self.hub.clone(),
            Arc::clone(&self.source),
            self.poller_config.poll_interval,
            Arc::clone(&live),
            Arc::clone(&last_tick_ms),
        );

        let join = tokio::spawn(poller.run());
        self.pollers.insert(
            symbol.to_string(),
            PollerHandle {
                live,
                last_tick_ms,
                join,
            },
        );
        info!(%symbol, "started poller");
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            running_pollers: self.pollers.len(),
            live_pollers: self.pollers.values().filter(|h| h.is_live()).count(),
        }
    }
}
