//! Quote value type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation of an instrument's price and change.
///
/// Price and change fields are kept as the localized numeric strings the
/// upstream source returns; no numeric parsing happens inside the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: String,
    pub change_absolute: String,
    pub change_percent: String,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    /// Create a quote observed now, with empty change fields.
    pub fn new(symbol: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            price: price.into(),
            change_absolute: String::new(),
            change_percent: String::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_change(
        mut self,
        absolute: impl Into<String>,
        percent: impl Into<String>,
    ) -> Self {
        self.change_absolute = absolute.into();
        self.change_percent = percent.into();
        self
    }

    /// Age of the observation relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_field_names() {
        let quote = Quote::new("AAPL", "189.95").with_change("-1.25", "-0.65");
        let json = serde_json::to_value(&quote).unwrap();

        assert_eq!(json["symbol"], "AAPL");
        assert_eq!(json["price"], "189.95");
        assert_eq!(json["changeAbsolute"], "-1.25");
        assert_eq!(json["changePercent"], "-0.65");
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn test_new_has_empty_change() {
        let quote = Quote::new("MSFT", "411.22");
        assert!(quote.change_absolute.is_empty());
        assert!(quote.change_percent.is_empty());
    }
}
