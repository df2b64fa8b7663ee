//! Client configuration.

use archlink_transport::TransportConfig;
use serde::{Deserialize, Serialize};

use crate::ArchlinkError;

/// Everything needed to connect a client.
///
/// Every field has a default, so a JSON file only needs the keys it wants
/// to change:
///
/// ```json
/// { "url": "wss://archipelago.gg:38281", "transport": { "chunk_size": 4096 } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server address, `ws://` or `wss://`.
    pub url: String,

    pub transport: TransportConfig,

    /// Audit scope for DeathLink traffic. Defaults to
    /// `team-{team}/slot-{slot}` of the active identity.
    pub death_link_scope: Option<String>,

    /// Messages that may wait for the writer before sends are refused
    /// with a queue-full error.
    pub send_queue_capacity: usize,

    /// `tracing` filter used by [`init_tracing`](crate::init_tracing) when
    /// `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:38281".to_string(),
            transport: TransportConfig::default(),
            death_link_scope: None,
            send_queue_capacity: 256,
            log_filter: "archlink=info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Loads a config from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ArchlinkError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.transport.chunk_size = chunk_size;
        self
    }

    pub fn with_send_queue_capacity(mut self, capacity: usize) -> Self {
        self.send_queue_capacity = capacity;
        self
    }

    pub fn with_death_link_scope(mut self, scope: impl Into<String>) -> Self {
        self.death_link_scope = Some(scope.into());
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.url, "ws://localhost:38281");
        assert_eq!(config.transport.chunk_size, 1024);
        assert!(config.death_link_scope.is_none());
        assert_eq!(config.send_queue_capacity, 256);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ClientConfig::from_json(
            r#"{"url":"wss://example.net:1234","transport":{"chunk_size":4096}}"#,
        )
        .unwrap();
        assert_eq!(config.url, "wss://example.net:1234");
        assert_eq!(config.transport.chunk_size, 4096);
        assert_eq!(
            config.transport.max_message_size,
            TransportConfig::default().max_message_size
        );
        assert_eq!(config.log_filter, "archlink=info");
    }

    #[test]
    fn test_invalid_json_is_a_config_error() {
        assert!(matches!(
            ClientConfig::from_json("{"),
            Err(ArchlinkError::Config(_))
        ));
    }

    #[test]
    fn test_builder_methods() {
        let config = ClientConfig::default()
            .with_url("ws://127.0.0.1:1")
            .with_chunk_size(16)
            .with_death_link_scope("seed-1")
            .with_send_queue_capacity(8)
            .with_log_filter("debug");
        assert_eq!(config.url, "ws://127.0.0.1:1");
        assert_eq!(config.transport.chunk_size, 16);
        assert_eq!(config.death_link_scope.as_deref(), Some("seed-1"));
        assert_eq!(config.send_queue_capacity, 8);
        assert_eq!(config.log_filter, "debug");
    }
}
