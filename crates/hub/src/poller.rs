//! Per-symbol polling task
//!
//! Exactly one runs per requested symbol. Each tick it fetches a quote and
//! hands it to the hub. Cancellation is cooperative: the scheduler clears the
//! live flag and the poller notices at its next tick boundary, so an
//! in-flight fetch is never interrupted and no fetch starts after the flag is
//! observed clear.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{debug, info, warn};

use ticker_source::QuoteSource;

use crate::hub::HubHandle;

pub(crate) struct Poller {
    symbol: String,
    hub: HubHandle,
    source: Arc<dyn QuoteSource>,
    poll_interval: Duration,
    live: Arc<AtomicBool>,
    last_tick_ms: Arc<AtomicU64>,
}

impl Poller {
    pub(crate) fn new(
        symbol: String,
        hub: HubHandle,
        source: Arc<dyn QuoteSource>,
        poll_interval: Duration,
        live: Arc<AtomicBool>,
        last_tick_ms: Arc<AtomicU64>,
    ) -> Self {
        Self {
            symbol,
            hub,
            source,
            poll_interval,
            live,
            last_tick_ms,
        }
    }

    pub(crate) async fn run(self) {
        info!(symbol = %self.symbol, "started polling");

        let mut ticker = interval(self.poll_interval);

        loop {
            ticker.tick().await;
            self.last_tick_ms
                .store(Utc::now().timestamp_millis() as u64, Ordering::Relaxed);

            if !self.live.load(Ordering::Relaxed) {
                break;
            }

            match self.source.fetch(&self.symbol).await {
                Ok(quote) => {
                    debug!(
                        symbol = %self.symbol,
                        price = %quote.price,
                        change = %quote.change_absolute,
                        "fetched quote"
                    );
                    self.hub.publish(quote);
                }
                // Transient failure: skip this tick, the next one is the retry.
                Err(e) => warn!(symbol = %self.symbol, error = %e, "fetch failed, skipping tick"),
            }
        }

        info!(symbol = %self.symbol, "stopped polling");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::Hub;
    use ticker_core::{HubConfig, Quote, SourceError};
    use ticker_source::ScriptedSource;

    fn spawn_hub() -> HubHandle {
        let (hub, handle) = Hub::new(HubConfig::default());
        tokio::spawn(hub.run());
        handle
    }

    fn spawn_poller(
        symbol: &str,
        hub: HubHandle,
        source: Arc<dyn QuoteSource>,
    ) -> (Arc<AtomicBool>, tokio::task::JoinHandle<()>) {
        let live = Arc::new(AtomicBool::new(true));
        let poller = Poller::new(
            symbol.to_string(),
            hub,
            source,
            Duration::from_millis(20),
            Arc::clone(&live),
            Arc::new(AtomicU64::new(0)),
        );
        (live, tokio::spawn(poller.run()))
    }

    #[tokio::test]
    async fn test_fetch_errors_never_kill_the_poller() {
        let hub = spawn_hub();
        let (id, mut rx) = hub.connect().unwrap();
        hub.subscribe(id, "AAPL").unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let source = Arc::new(ScriptedSource::new());
        for _ in 0..3 {
            source.push(
                "AAPL",
                Err(SourceError::PriceNotFound {
                    symbol: "AAPL".to_string(),
                }),
            );
        }
        source.push("AAPL", Ok(Quote::new("AAPL", "189.95")));

        let (live, join) = spawn_poller("AAPL", hub, source.clone());

        // Three failed ticks, then the fourth tick's quote gets through.
        let quote = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("quote within five ticks")
            .expect("hub still delivering");
        assert_eq!(quote.price, "189.95");
        assert!(source.fetch_count("AAPL") >= 4);
        assert!(!join.is_finished(), "poller survives transient failures");

        live.store(false, Ordering::Relaxed);
    }

    #[tokio::test]
    async fn test_stops_at_tick_boundary_when_marked_inactive() {
        let hub = spawn_hub();
        let source = Arc::new(ScriptedSource::new());
        let (live, join) = spawn_poller("AAPL", hub, source.clone());

        tokio::time::sleep(Duration::from_millis(50)).await;
        let fetched_while_live = source.fetch_count("AAPL");
        assert!(fetched_while_live >= 1);

        live.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(join.is_finished(), "poller exits within one tick of going inactive");
        let fetched_after = source.fetch_count("AAPL");
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(
            source.fetch_count("AAPL"),
            fetched_after,
            "no fetch is issued after the inactive flag is observed"
        );
    }
}
