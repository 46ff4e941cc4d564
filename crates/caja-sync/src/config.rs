//! # Channel Configuration
//!
//! Connection parameters for the inventory push channel.

use std::time::Duration;

use url::Url;

use crate::error::{SyncError, SyncResult};

/// Configuration for the inventory channel.
///
/// The connection is keyed by branch id and auth token; both end up in the
/// WebSocket URL (`{endpoint}/ws/inventory/{branch_id}?token=...`).
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Base WebSocket endpoint (e.g. `wss://pos.example.com`).
    pub endpoint: String,

    /// Branch this terminal belongs to.
    pub branch_id: String,

    /// Auth token for the channel.
    pub token: String,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Fixed interval between reconnection attempts.
    pub reconnect_interval: Duration,

    /// Maximum reconnection attempts before the channel parks.
    pub max_reconnect_attempts: u32,

    /// Keepalive ping interval while connected.
    pub ping_interval: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            endpoint: String::new(),
            branch_id: String::new(),
            token: String::new(),
            connect_timeout: Duration::from_secs(10),
            reconnect_interval: Duration::from_secs(3),
            max_reconnect_attempts: 5,
            ping_interval: Duration::from_secs(30),
        }
    }
}

impl ChannelConfig {
    /// Builds the full connection URL from endpoint, branch id and token.
    pub fn url(&self) -> SyncResult<Url> {
        let base = Url::parse(&self.endpoint)?;

        if !matches!(base.scheme(), "ws" | "wss") {
            return Err(SyncError::InvalidUrl(format!(
                "expected ws:// or wss:// endpoint, got '{}'",
                base.scheme()
            )));
        }

        let mut url = base.join(&format!("ws/inventory/{}", self.branch_id))?;
        url.query_pairs_mut().append_pair("token", &self.token);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_construction() {
        let config = ChannelConfig {
            endpoint: "wss://pos.example.com".to_string(),
            branch_id: "branch-7".to_string(),
            token: "secret".to_string(),
            ..Default::default()
        };

        let url = config.url().unwrap();
        assert_eq!(
            url.as_str(),
            "wss://pos.example.com/ws/inventory/branch-7?token=secret"
        );
    }

    #[test]
    fn test_token_is_query_encoded() {
        let config = ChannelConfig {
            endpoint: "ws://127.0.0.1:9000".to_string(),
            branch_id: "b1".to_string(),
            token: "a&b=c".to_string(),
            ..Default::default()
        };

        let url = config.url().unwrap();
        assert!(url.as_str().contains("token=a%26b%3Dc"));
    }

    #[test]
    fn test_non_websocket_scheme_is_rejected() {
        let config = ChannelConfig {
            endpoint: "https://pos.example.com".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.url(), Err(SyncError::InvalidUrl(_))));
    }

    #[test]
    fn test_defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.reconnect_interval, Duration::from_secs(3));
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.ping_interval, Duration::from_secs(30));
    }
}
