//! Subcommand implementations.

pub mod check;
pub mod config;
pub mod report;
pub mod resolve;

use std::path::Path;

use anyhow::{bail, Result};
use portguard_core::{ConfigStore, PortConfig};

/// Load the registry from `path`, or from the default location.
pub async fn load_config(path: Option<&Path>) -> Result<PortConfig> {
    let store = match path {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            ConfigStore::with_path(path.to_path_buf())
        }
        None => ConfigStore::new()?,
    };

    tracing::debug!(path = %store.path().display(), "Loading configuration");
    Ok(store.load().await?)
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max - 1).collect();
        format!("{}…", head)
    }
}

pub(crate) fn port_list(ports: &[u16]) -> String {
    if ports.is_empty() {
        return "-".to_string();
    }
    ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
