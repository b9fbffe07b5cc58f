//! Scripted quote source for tests and local runs
//!
//! Pops pre-loaded results per symbol; once a symbol's script is exhausted it
//! keeps producing synthetic quotes so pollers have something to publish.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use ticker_core::{Quote, SourceResult};

use crate::QuoteSource;

#[derive(Default)]
struct ScriptState {
    scripts: HashMap<String, VecDeque<SourceResult<Quote>>>,
    fetch_counts: HashMap<String, usize>,
}

/// In-memory `QuoteSource` driven by a per-symbol script.
#[derive(Default)]
pub struct ScriptedSource {
    state: Mutex<ScriptState>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next result for `symbol`.
    pub fn push(&self, symbol: &str, result: SourceResult<Quote>) {
        self.state
            .lock()
            .scripts
            .entry(symbol.to_string())
            .or_default()
            .push_back(result);
    }

    /// How many times `symbol` has been fetched.
    pub fn fetch_count(&self, symbol: &str) -> usize {
        self.state
            .lock()
            .fetch_counts
            .get(symbol)
            .copied()
            .unwrap_or(0)
    }

    /// Total fetches across all symbols.
    pub fn total_fetches(&self) -> usize {
        self.state.lock().fetch_counts.values().sum()
    }
}

#[async_trait]
impl QuoteSource for ScriptedSource {
    async fn fetch(&self, symbol: &str) -> SourceResult<Quote> {
        let mut state = self.state.lock();

        let count = state.fetch_counts.entry(symbol.to_string()).or_insert(0);
        *count += 1;
        let count = *count;

        if let Some(script) = state.scripts.get_mut(symbol) {
            if let Some(result) = script.pop_front() {
                return result;
            }
        }

        Ok(Quote::new(symbol, count.to_string()))
    }
}
