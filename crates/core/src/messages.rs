//! Inbound wire message shapes

use serde::{Deserialize, Serialize};

/// Message a connected client may send over the push channel.
///
/// `subscribe` sets or replaces the sender's requested symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Subscribe { symbol: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subscribe() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe","symbol":"AAPL"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Subscribe {
                symbol: "AAPL".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        let res = serde_json::from_str::<ClientMessage>(r#"{"type":"order","symbol":"AAPL"}"#);
        assert!(res.is_err());
    }
}
