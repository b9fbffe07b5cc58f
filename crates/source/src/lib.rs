//! Quote source collaborators
//!
//! A [`QuoteSource`] turns a symbol into one [`Quote`] observation. Fetches
//! may take seconds and may fail transiently; callers treat failures as
//! skippable, not fatal.

pub mod http;
pub mod scripted;

use async_trait::async_trait;
use ticker_core::{Quote, SourceResult};

pub use http::HttpQuoteSource;
pub use scripted::ScriptedSource;

/// One-shot price lookup for a symbol.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch(&self, symbol: &str) -> SourceResult<Quote>;
}
