//! Configuration types

use std::time::Duration;

/// Distribution hub configuration
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of the hub's command queue. A full queue drops commands
    /// instead of blocking the caller.
    pub command_buffer: usize,
    /// Capacity of each subscriber's outbound quote channel.
    pub subscriber_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            command_buffer: 256,
            subscriber_buffer: 32,
        }
    }
}

/// Per-symbol poller configuration
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub poll_interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Scheduler loop configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often running pollers are reconciled against requested symbols.
    /// Independent of, and usually coarser than, the poll interval.
    pub reconcile_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reconcile_interval: Duration::from_secs(5),
        }
    }
}

/// Quote source configuration
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// URL template with a `{symbol}` placeholder.
    pub url_template: String,
    /// Hard bound on one fetch, enforced at the client.
    pub fetch_timeout: Duration,
    /// Maximum concurrent fetches through the shared upstream session.
    pub max_in_flight: usize,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url_template: "https://www.bing.com/search?q={symbol}+stock+price".to_string(),
            fetch_timeout: Duration::from_secs(15),
            max_in_flight: 1, // the upstream session supports one in-flight request
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// WebSocket server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let hub = HubConfig::default();
        assert!(hub.command_buffer > 0);
        assert!(hub.subscriber_buffer > 0);

        let source = SourceConfig::default();
        assert_eq!(source.max_in_flight, 1);
        assert!(source.url_template.contains("{symbol}"));
    }

    #[test]
    fn test_server_address() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 9000,
        };
        assert_eq!(config.address(), "0.0.0.0:9000");
    }
}
