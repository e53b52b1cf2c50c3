use crate::gateway::RequestGateway;
use crate::ledger::{EvictionPolicy, Ledger, MAX_REQUESTS};
use crate::storage::{FileBlobStore, KvRestStore, NoopStore, STORE_KEY, SnapshotStore};
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Where the ledger snapshot is kept between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process memory only.
    Memory,
    /// Local JSON file.
    File(PathBuf),
    /// REST key-value service.
    KvRest { url: String, token: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
    pub store_key: String,
    pub store_timeout: Duration,
    pub max_requests: usize,
    pub eviction: EvictionPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            store: StoreBackend::Memory,
            store_key: STORE_KEY.to_string(),
            store_timeout: Duration::from_millis(5_000),
            max_requests: MAX_REQUESTS,
            eviction: EvictionPolicy::Fifo,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any variable source; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let host = var("APP_HOST").unwrap_or(defaults.host);

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse::<u16>().context("PORT must be a valid u16")?,
            None => defaults.port,
        };

        let store = match (var("KV_REST_API_URL"), var("KV_REST_API_TOKEN")) {
            (Some(url), Some(token)) => StoreBackend::KvRest { url, token },
            _ => match var("CONCIERGE_STORE_FILE") {
                Some(path) => StoreBackend::File(PathBuf::from(path)),
                None => StoreBackend::Memory,
            },
        };

        let store_key = var("CONCIERGE_STORE_KEY").unwrap_or(defaults.store_key);

        let store_timeout = match var("CONCIERGE_STORE_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(
                raw.trim()
                    .parse::<u64>()
                    .context("CONCIERGE_STORE_TIMEOUT_MS must be a valid u64")?,
            ),
            None => defaults.store_timeout,
        };

        let max_requests = match var("CONCIERGE_MAX_REQUESTS") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|max| *max > 0)
                .context("CONCIERGE_MAX_REQUESTS must be a positive integer")?,
            None => defaults.max_requests,
        };

        let eviction = match var("CONCIERGE_EVICTION") {
            Some(raw) => raw
                .parse::<EvictionPolicy>()
                .map_err(anyhow::Error::msg)
                .context("CONCIERGE_EVICTION is invalid")?,
            None => defaults.eviction,
        };

        Ok(Self {
            host,
            port,
            store,
            store_key,
            store_timeout,
            max_requests,
            eviction,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn build_store(&self) -> Result<Arc<dyn SnapshotStore>> {
        let store: Arc<dyn SnapshotStore> = match &self.store {
            StoreBackend::Memory => Arc::new(NoopStore),
            StoreBackend::File(path) => Arc::new(FileBlobStore::new(path)),
            StoreBackend::KvRest { url, token } => Arc::new(
                KvRestStore::with_timeout(url, token.clone(), self.store_timeout)
                    .context("failed to configure KV REST store")?
                    .with_key(self.store_key.clone()),
            ),
        };
        Ok(store)
    }

    pub fn build_gateway(&self) -> Result<RequestGateway> {
        let store = self.build_store()?;
        info!(
            store = store.name(),
            max_requests = self.max_requests,
            eviction = %self.eviction,
            "request store configured"
        );

        let ledger = Ledger::with_capacity(self.max_requests).with_policy(self.eviction);
        Ok(RequestGateway::new(ledger, store).with_store_timeout(self.store_timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.address(), "0.0.0.0:3001");
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.store_key, "concierge_store");
        assert_eq!(config.max_requests, 500);
        assert_eq!(config.eviction, EvictionPolicy::Fifo);
    }

    #[test]
    fn kv_needs_both_url_and_token() {
        let config = config_from(&[("KV_REST_API_URL", "https://kv.example.com")]).unwrap();
        assert_eq!(config.store, StoreBackend::Memory);

        let config = config_from(&[
            ("KV_REST_API_URL", "https://kv.example.com"),
            ("KV_REST_API_TOKEN", "secret"),
            ("CONCIERGE_STORE_FILE", "/tmp/ignored.json"),
        ])
        .unwrap();
        assert_eq!(
            config.store,
            StoreBackend::KvRest {
                url: "https://kv.example.com".to_string(),
                token: "secret".to_string(),
            }
        );
    }

    #[test]
    fn file_store_when_kv_is_absent() {
        let config = config_from(&[("CONCIERGE_STORE_FILE", "data/store.json")]).unwrap();
        assert_eq!(config.store, StoreBackend::File(PathBuf::from("data/store.json")));
    }

    #[test]
    fn builds_gateway_for_each_backend() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.build_gateway().unwrap().store_name(), "noop");

        let config = config_from(&[("CONCIERGE_STORE_FILE", "store.json")]).unwrap();
        assert_eq!(config.build_gateway().unwrap().store_name(), "file");

        let config = config_from(&[
            ("KV_REST_API_URL", "https://kv.example.com"),
            ("KV_REST_API_TOKEN", "secret"),
        ])
        .unwrap();
        assert_eq!(config.build_gateway().unwrap().store_name(), "kv-rest");

        let config = config_from(&[
            ("KV_REST_API_URL", "not a url"),
            ("KV_REST_API_TOKEN", "secret"),
        ])
        .unwrap();
        assert!(config.build_gateway().is_err());
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("CONCIERGE_MAX_REQUESTS", "0")]).is_err());
        assert!(config_from(&[("CONCIERGE_STORE_TIMEOUT_MS", "-1")]).is_err());
        assert!(config_from(&[("CONCIERGE_EVICTION", "random")]).is_err());
    }

    #[test]
    fn parses_overrides() {
        let config = config_from(&[
            ("APP_HOST", "127.0.0.1"),
            ("PORT", "8088"),
            ("CONCIERGE_STORE_TIMEOUT_MS", "250"),
            ("CONCIERGE_MAX_REQUESTS", "20"),
            ("CONCIERGE_EVICTION", "prefer_completed"),
        ])
        .unwrap();
        assert_eq!(config.address(), "127.0.0.1:8088");
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert_eq!(config.max_requests, 20);
        assert_eq!(config.eviction, EvictionPolicy::PreferCompleted);
    }
}
