//! Service port registry configuration.
//!
//! Stores configuration in JSON format at `~/.portguard/config.json`.
//! A missing file means the built-in registry is used.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::{ReservedPorts, ServicePortSpec};
use crate::error::{Error, Result};

/// Ports never handed out: system services and adjacent dev tooling.
pub const DEFAULT_RESERVED_PORTS: [u16; 12] = [
    22,    // ssh
    25,    // smtp
    53,    // dns
    80,    // http
    443,   // https
    3000,  // frontend dev server
    3306,  // mysql
    5173,  // vite
    5432,  // postgres
    6379,  // redis
    8080,  // http-alt
    27017, // mongodb
];

fn default_reserved_ports() -> ReservedPorts {
    ReservedPorts::new(DEFAULT_RESERVED_PORTS)
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_operation_timeout_ms() -> u64 {
    3000
}

/// Registry of service port preferences plus resolver tuning.
///
/// Built once and shared read-only (`Arc<PortConfig>`) by every component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortConfig {
    #[serde(default)]
    pub services: Vec<ServicePortSpec>,

    /// Falls back to [`DEFAULT_RESERVED_PORTS`] when omitted; an explicit
    /// empty list disables reservation.
    #[serde(default = "default_reserved_ports")]
    pub reserved_ports: ReservedPorts,

    /// Wait after terminating a port's occupants before re-probing.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Upper bound for any single external call (tool run, bind, signal).
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            services: vec![
                ServicePortSpec::new("main", 3002, [3001, 3003, 3004, 3005], "Main API server"),
                ServicePortSpec::new("database", 5433, [5434, 5435, 5436], "Database server"),
                ServicePortSpec::new("test", 3010, [3011, 3012, 3013], "Test server"),
                ServicePortSpec::new("demo", 3020, [3021, 3022, 3023], "Demo server"),
                ServicePortSpec::new("minimal", 3030, [3031, 3032, 3033], "Minimal server"),
            ],
            reserved_ports: default_reserved_ports(),
            settle_delay_ms: default_settle_delay_ms(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

impl PortConfig {
    /// Create a config with the given registry and default timings.
    pub fn new(
        services: impl IntoIterator<Item = ServicePortSpec>,
        reserved_ports: impl IntoIterator<Item = u16>,
    ) -> Self {
        Self {
            services: services.into_iter().collect(),
            reserved_ports: ReservedPorts::new(reserved_ports),
            settle_delay_ms: default_settle_delay_ms(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Look up a service by name.
    pub fn service(&self, name: &str) -> Option<&ServicePortSpec> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Look up a service by name, failing with [`Error::UnknownService`].
    pub fn require_service(&self, name: &str) -> Result<&ServicePortSpec> {
        self.service(name).ok_or_else(|| Error::unknown_service(name))
    }

    pub fn is_reserved(&self, port: u16) -> bool {
        self.reserved_ports.contains(port)
    }

    /// Reject registries that cannot be resolved deterministically.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for spec in &self.services {
            if spec.name.trim().is_empty() {
                return Err(Error::Config("Service name must not be empty".to_string()));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(Error::Config(format!(
                    "Service '{}' is registered more than once",
                    spec.name
                )));
            }
            if spec.preferred_port == 0 || spec.fallback_ports.contains(&0) {
                return Err(Error::Config(format!(
                    "Service '{}' uses port 0; use the dynamic fallback instead",
                    spec.name
                )));
            }
        }
        if self.operation_timeout_ms == 0 {
            return Err(Error::Config(
                "operationTimeoutMs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration store for the service port registry.
///
/// Handles reading and writing configuration to `~/.portguard/config.json`.
pub struct ConfigStore {
    /// Path to the configuration file.
    config_path: PathBuf,
}

impl ConfigStore {
    /// Create a new config store with the default path.
    ///
    /// Default path: `~/.portguard/config.json`
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;
        let config_path = home.join(".portguard").join("config.json");

        Ok(Self { config_path })
    }

    /// Create a config store with a custom path.
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load and validate configuration from disk.
    ///
    /// Returns the built-in registry if the file doesn't exist.
    pub async fn load(&self) -> Result<PortConfig> {
        if !self.config_path.exists() {
            return Ok(PortConfig::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        let config: PortConfig = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub async fn save(&self, config: &PortConfig) -> Result<()> {
        config.validate()?;

        if let Some(config_dir) = self.config_path.parent() {
            if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
                fs::create_dir_all(config_dir).await.map_err(|e| {
                    Error::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        // Write atomically by writing to temp file then renaming
        let temp_path = self.config_path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to create temp config file: {}", e)))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        file.sync_all()
            .await
            .map_err(|e| Error::Config(format!("Failed to sync config: {}", e)))?;

        fs::rename(&temp_path, &self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to rename config file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_store() -> (ConfigStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        (ConfigStore::with_path(path), dir)
    }

    #[test]
    fn test_default_registry() {
        let config = PortConfig::default();
        assert!(config.validate().is_ok());
        for name in ["main", "database", "test", "demo", "minimal"] {
            assert!(config.service(name).is_some(), "missing {}", name);
        }
        assert_eq!(config.service("main").unwrap().preferred_port, 3002);
        assert_eq!(config.settle_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_default_registry_avoids_reserved() {
        let config = PortConfig::default();
        for spec in &config.services {
            for port in spec.candidates() {
                assert!(!config.is_reserved(port), "{} uses reserved {}", spec.name, port);
            }
        }
    }

    #[test]
    fn test_require_unknown_service() {
        let config = PortConfig::default();
        let err = config.require_service("ghost").unwrap_err();
        assert!(matches!(err, Error::UnknownService { ref service } if service == "ghost"));
    }

    #[test]
    fn test_validate_duplicate_names() {
        let config = PortConfig::new(
            [
                ServicePortSpec::new("main", 3002, [], ""),
                ServicePortSpec::new("main", 3003, [], ""),
            ],
            [],
        );
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_port_zero() {
        let config = PortConfig::new([ServicePortSpec::new("main", 3002, [0], "")], []);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let (store, _dir) = test_store();
        let config = store.load().await.unwrap();
        assert_eq!(config, PortConfig::default());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, _dir) = test_store();

        let config = PortConfig::new(
            [ServicePortSpec::new("api", 4100, [4101, 4102], "API")],
            [22, 80],
        )
        .with_settle_delay(Duration::from_millis(250));

        store.save(&config).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.settle_delay_ms, 250);
    }

    #[tokio::test]
    async fn test_load_partial_file_uses_defaults() {
        let (store, _dir) = test_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"{"services":[{"name":"main","preferredPort":3002}]}"#,
        )
        .unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.services.len(), 1);
        assert_eq!(loaded.reserved_ports, ReservedPorts::new(DEFAULT_RESERVED_PORTS));
        assert_eq!(loaded.operation_timeout_ms, 3000);
    }

    #[tokio::test]
    async fn test_load_without_reserved_keeps_system_ports_out() {
        let (store, _dir) = test_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"{"services":[{"name":"web","preferredPort":3002,"fallbackPorts":[22,80]}]}"#,
        )
        .unwrap();

        let loaded = store.load().await.unwrap();
        assert!(loaded.is_reserved(22));
        assert!(loaded.is_reserved(80));
        assert!(loaded.is_reserved(443));
    }

    #[tokio::test]
    async fn test_load_explicit_empty_reserved() {
        let (store, _dir) = test_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"{"services":[{"name":"web","preferredPort":3002}],"reservedPorts":[]}"#,
        )
        .unwrap();

        let loaded = store.load().await.unwrap();
        assert!(loaded.reserved_ports.is_empty());
    }

    #[tokio::test]
    async fn test_load_malformed() {
        let (store, _dir) = test_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(store.load().await, Err(Error::Config(_))));
    }
}
