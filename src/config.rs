//! Service configuration
//!
//! TOML file first, environment variables on top. Every field has a
//! default, so a missing file or a partial file is fine.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::middleware::Quota;

pub const CONFIG_PATH_ENV: &str = "TRADEX_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "tradex.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limits: RateLimitConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

fn default_sqlite_path() -> String {
    "tradex_kv.db".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// User cache TTL. 0 disables the cache.
    #[serde(default = "default_cache_ttl_ms")]
    pub ttl_ms: u64,
}

fn default_cache_ttl_ms() -> u64 {
    5_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_cache_ttl_ms(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Global per-IP limit on API routes.
    #[serde(default = "default_ip_quota")]
    pub ip: Quota,
    /// Per-user trade executions.
    #[serde(default = "default_trade_quota")]
    pub trade: Quota,
    /// Per-user deposit and withdraw submissions.
    #[serde(default = "default_wallet_quota")]
    pub wallet: Quota,
    #[serde(default = "default_expiry_buffer_secs")]
    pub expiry_buffer_secs: u64,
}

fn default_ip_quota() -> Quota {
    Quota::new(60, 60)
}

fn default_trade_quota() -> Quota {
    Quota::new(30, 60)
}

fn default_wallet_quota() -> Quota {
    Quota::new(10, 60)
}

fn default_expiry_buffer_secs() -> u64 {
    5
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            ip: default_ip_quota(),
            trade: default_trade_quota(),
            wallet: default_wallet_quota(),
            expiry_buffer_secs: default_expiry_buffer_secs(),
        }
    }
}

impl RateLimitConfig {
    pub fn expiry_buffer(&self) -> Duration {
        Duration::from_secs(self.expiry_buffer_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// ADJUSTMENT credited at registration.
    #[serde(default = "default_welcome_bonus")]
    pub welcome_bonus: f64,
    #[serde(default = "default_min_withdraw")]
    pub min_withdraw: f64,
    #[serde(default = "default_trade_history_cap")]
    pub trade_history_cap: usize,
    /// Fixed seed for the tick simulator. Unset means OS entropy.
    #[serde(default)]
    pub simulation_seed: Option<u64>,
}

fn default_welcome_bonus() -> f64 {
    10.0
}

fn default_min_withdraw() -> f64 {
    50.0
}

fn default_trade_history_cap() -> usize {
    100
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            welcome_bonus: default_welcome_bonus(),
            min_withdraw: default_min_withdraw(),
            trade_history_cap: default_trade_history_cap(),
            simulation_seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Bearer token for admin routes. Empty locks them.
    #[serde(default)]
    pub token: String,
}

impl AppConfig {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self =
            toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Resolve the file (explicit path, `TRADEX_CONFIG_PATH`, then
    /// `tradex.toml`), then apply environment overrides. A missing file
    /// means defaults; a file that exists but does not parse is an error.
    pub fn from_env(explicit_path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit_path {
            Some(p) => p.to_path_buf(),
            None => std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
                .into(),
        };

        let mut config = if path.exists() {
            Self::load(&path)?
        } else {
            tracing::debug!("Using default config ({} not found)", path.display());
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("TRADEX_BIND_ADDR").filter(|v| !v.trim().is_empty()) {
            self.server.bind_addr = addr.trim().to_string();
        }
        if let Some(path) = lookup("TRADEX_SQLITE_PATH").filter(|v| !v.trim().is_empty()) {
            self.store.sqlite_path = path.trim().to_string();
        }
        if let Some(token) = lookup("TRADEX_ADMIN_TOKEN") {
            self.admin.token = token.trim().to_string();
        }
    }

    /// Save to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.cache.ttl(), Duration::from_secs(5));
        assert_eq!(config.rate_limits.trade, Quota::new(30, 60));
        assert_eq!(config.ledger.welcome_bonus, 10.0);
        assert_eq!(config.ledger.min_withdraw, 50.0);
        assert!(config.admin.token.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [store]
            backend = "memory"

            [rate_limits.wallet]
            max = 3
            window_secs = 30

            [ledger]
            simulation_seed = 42
            "#,
        )
        .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.sqlite_path, "tradex_kv.db");
        assert_eq!(config.rate_limits.wallet, Quota::new(3, 30));
        assert_eq!(config.rate_limits.ip, Quota::new(60, 60));
        assert_eq!(config.ledger.simulation_seed, Some(42));
        assert_eq!(config.ledger.trade_history_cap, 100);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TRADEX_BIND_ADDR", "127.0.0.1:8080"),
            ("TRADEX_ADMIN_TOKEN", " s3cret "),
            ("TRADEX_SQLITE_PATH", ""),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.admin.token, "s3cret");
        assert_eq!(config.store.sqlite_path, "tradex_kv.db");
    }

    #[test]
    fn test_toml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tradex.toml");
        let mut config = AppConfig::default();
        config.ledger.simulation_seed = Some(7);
        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_env(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.ledger.trade_history_cap, 100);
    }
}
