//! HTTP scraping quote source
//!
//! Fetches a public search results page for `<symbol> stock price` and pulls
//! the price and change strings out of the finance answer box. The upstream
//! session only supports a limited number of in-flight requests, so fetches
//! are serialized through a semaphore.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use ticker_core::{Quote, SourceConfig, SourceError, SourceResult};

use crate::QuoteSource;

/// Class marker of the price element in the answer box.
const PRICE_MARKER: &str = "b_focusTextMedium";
/// Class marker of the change element, e.g. `▼ -47.35 (-14.26%) today`.
const CHANGE_MARKER: &str = "fin_change";

pub struct HttpQuoteSource {
    client: reqwest::Client,
    config: SourceConfig,
    permits: Arc<Semaphore>,
}

impl HttpQuoteSource {
    /// Build the shared client. Failure here is fatal to the process:
    /// nothing can be polled without a working session.
    pub fn new(config: SourceConfig) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| SourceError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            config,
        })
    }

    fn url_for(&self, symbol: &str) -> String {
        self.config.url_template.replace("{symbol}", symbol)
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn fetch(&self, symbol: &str) -> SourceResult<Quote> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SourceError::SessionClosed)?;

        let url = self.url_for(symbol);
        debug!(symbol, %url, "fetching quote page");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout
            } else {
                SourceError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::BadStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Request(e.to_string()))?;

        let price = extract_marked_text(&body, PRICE_MARKER)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| SourceError::PriceNotFound {
                symbol: symbol.to_string(),
            })?;

        let mut quote = Quote {
            symbol: symbol.to_string(),
            price,
            change_absolute: String::new(),
            change_percent: String::new(),
            timestamp: Utc::now(),
        };

        // Change information is best-effort; a quote without it is still valid.
        match extract_marked_text(&body, CHANGE_MARKER) {
            Some(change) => {
                if let Some((absolute, percent)) = parse_change_string(&change) {
                    quote.change_absolute = absolute;
                    quote.change_percent = percent;
                }
            }
            None => warn!(symbol, "could not get change information"),
        }

        Ok(quote)
    }
}

/// Extract the text content of the first element whose tag contains `marker`.
///
/// Avoids a full DOM parse: finds the marker, skips to the end of the opening
/// tag, and takes everything up to the next tag boundary.
fn extract_marked_text(html: &str, marker: &str) -> Option<String> {
    let at = html.find(marker)?;
    let rest = &html[at..];
    let open_end = rest.find('>')?;
    let content = &rest[open_end + 1..];
    let close = content.find('<')?;
    let text = content[..close].trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Parse a change string like `▼ -47.35 (-14.26%) today` into
/// `(absolute, percent)`.
fn parse_change_string(change: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = change.split_whitespace().collect();
    if parts.len() < 3 {
        return None;
    }

    let absolute = parts[1].to_string();
    let percent = parts[2]
        .strip_prefix('(')
        .and_then(|p| p.strip_suffix("%)"))?
        .to_string();

    Some((absolute, percent))
}
