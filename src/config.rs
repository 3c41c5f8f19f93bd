use std::fs;
use std::path::Path;
use std::time::Duration;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use crate::consumer::IdMatch;

const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_MAX_ASYNC_REQUESTS: usize = 10;
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
const DEFAULT_DELIVERY_BUFFER: usize = 1024;

// zero means "not configured"
fn or_default<T: PartialEq + Default>(value: T, default: T) -> T {
    if value == T::default() {
        default
    } else {
        value
    }
}

/// Construction-time settings of a [`KafkaNode`](crate::KafkaNode). Every field is optional in TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Display label, only used in logs and events.
    pub name: String,

    /// Broker address, `host:port`.
    pub host: String,

    /// Upper bound for resolving the connection handle, in milliseconds.
    #[serde(rename = "connectionTimeout")]
    pub connection_timeout_ms: u64,

    /// Upper bound for any single broker request (metadata sync included), in milliseconds.
    #[serde(rename = "requestTimeout")]
    pub request_timeout_ms: u64,

    /// In-flight request cap of the wire backend.
    pub max_async_requests: usize,

    pub consumer: ConsumerSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: "KafkaNode".to_string(),
            host: "localhost:9092".to_string(),
            connection_timeout_ms: DEFAULT_CONNECTION_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_async_requests: DEFAULT_MAX_ASYNC_REQUESTS,
            consumer: ConsumerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsumerSettings {
    /// How long an idle subscription waits before fetching again.
    #[serde(rename = "pollInterval")]
    pub poll_interval_ms: u64,

    /// Rule used to detect id collisions and to resolve pause/resume/close lookups.
    pub id_match: IdMatch,

    /// Capacity of channels created by `delivery_channel`.
    pub delivery_buffer: usize,

    /// Group used when a consume request names none.
    pub default_group_id: String,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            id_match: IdMatch::default(),
            delivery_buffer: DEFAULT_DELIVERY_BUFFER,
            default_group_id: "default".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Durations and limits below fall back to their defaults when configured as 0.
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(or_default(self.connection_timeout_ms, DEFAULT_CONNECTION_TIMEOUT_MS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(or_default(self.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS))
    }

    pub fn max_async_requests(&self) -> usize {
        or_default(self.max_async_requests, DEFAULT_MAX_ASYNC_REQUESTS)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => Self::read_from_file(p),
            None => Ok(Self::default()),
        }
    }

    fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading {:?}", path.as_ref()))?;
        let cfg: ClientConfig =
            toml::from_str(&raw).with_context(|| "parsing client config TOML")?;
        Ok(cfg)
    }
}

impl ConsumerSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(or_default(self.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS))
    }

    pub fn delivery_buffer(&self) -> usize {
        or_default(self.delivery_buffer, DEFAULT_DELIVERY_BUFFER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_values() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.name, "KafkaNode");
        assert_eq!(cfg.host, "localhost:9092");
        assert_eq!(cfg.connection_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.max_async_requests, 10);
        assert_eq!(cfg.consumer.default_group_id, "default");
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "name = \"test\"\nhost = \"broker:29092\"\nconnectionTimeout = 500\n\n[consumer]\nidMatch = \"exact\""
        )
        .unwrap();

        let cfg = ClientConfig::load_or_default(Some(file.path())).unwrap();
        assert_eq!(cfg.name, "test");
        assert_eq!(cfg.host, "broker:29092");
        assert_eq!(cfg.connection_timeout_ms, 500);
        assert_eq!(cfg.request_timeout_ms, 30_000);
        assert_eq!(cfg.consumer.id_match, IdMatch::Exact);
        assert_eq!(cfg.consumer.poll_interval_ms, 100);
    }

    #[test]
    fn test_zero_values_fall_back_to_defaults() {
        let mut cfg = ClientConfig::default();
        cfg.connection_timeout_ms = 0;
        cfg.request_timeout_ms = 0;
        cfg.max_async_requests = 0;
        cfg.consumer.poll_interval_ms = 0;
        cfg.consumer.delivery_buffer = 0;

        assert_eq!(cfg.connection_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.max_async_requests(), 10);
        assert_eq!(cfg.consumer.poll_interval(), Duration::from_millis(100));
        assert_eq!(cfg.consumer.delivery_buffer(), 1024);

        cfg.request_timeout_ms = 250;
        assert_eq!(cfg.request_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ClientConfig::load_or_default(Some(dir.path().join("absent.toml"))).is_err());
    }
}
