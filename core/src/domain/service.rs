//! Service port registry models.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Port preferences for one named service.
///
/// Loaded once with the configuration and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePortSpec {
    /// Unique key (e.g., "main", "database").
    pub name: String,
    /// First-choice port.
    pub preferred_port: u16,
    /// Alternates, tried in order when the preferred port is occupied.
    #[serde(default)]
    pub fallback_ports: Vec<u16>,
    /// Human readable label.
    #[serde(default)]
    pub description: String,
}

impl ServicePortSpec {
    pub fn new(
        name: impl Into<String>,
        preferred_port: u16,
        fallback_ports: impl Into<Vec<u16>>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            preferred_port,
            fallback_ports: fallback_ports.into(),
            description: description.into(),
        }
    }

    /// Ordered candidate list: preferred first, then fallbacks.
    ///
    /// Duplicates are dropped so a port is never probed twice per walk.
    pub fn candidates(&self) -> Vec<u16> {
        let mut seen = BTreeSet::new();
        std::iter::once(self.preferred_port)
            .chain(self.fallback_ports.iter().copied())
            .filter(|port| seen.insert(*port))
            .collect()
    }

    /// Whether `port` is the preferred port or one of the fallbacks.
    pub fn is_candidate(&self, port: u16) -> bool {
        self.preferred_port == port || self.fallback_ports.contains(&port)
    }
}

/// Ports that must never be proposed as an allocation target, even if free.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservedPorts(BTreeSet<u16>);

impl ReservedPorts {
    pub fn new(ports: impl IntoIterator<Item = u16>) -> Self {
        Self(ports.into_iter().collect())
    }

    pub fn contains(&self, port: u16) -> bool {
        self.0.contains(&port)
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<u16> for ReservedPorts {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_order() {
        let spec = ServicePortSpec::new("main", 3002, [3001, 3003], "Main API server");
        assert_eq!(spec.candidates(), vec![3002, 3001, 3003]);
    }

    #[test]
    fn test_candidates_dedup() {
        let spec = ServicePortSpec::new("main", 3002, [3002, 3001, 3001], "");
        assert_eq!(spec.candidates(), vec![3002, 3001]);
    }

    #[test]
    fn test_reserved_ports() {
        let reserved = ReservedPorts::new([443, 22, 80]);
        assert!(reserved.contains(22));
        assert!(!reserved.contains(3002));
        assert_eq!(reserved.iter().collect::<Vec<_>>(), vec![22, 80, 443]);
    }

    #[test]
    fn test_spec_json_uses_camel_case() {
        let json = r#"{"name":"demo","preferredPort":3020,"fallbackPorts":[3021]}"#;
        let spec: ServicePortSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.preferred_port, 3020);
        assert_eq!(spec.fallback_ports, vec![3021]);
        assert!(spec.description.is_empty());
    }
}
