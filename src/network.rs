//! Peer registry for Montycoin
//!
//! Peers are identified by `host:port` only. Whatever a client registers
//! (`http://10.0.0.2:5001/`, `10.0.0.2:5001/get_chain`, ...) is normalised
//! to that form, so the same node cannot be registered twice.

use crate::error::{ChainError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use url::Url;

const MAX_ADDRESS_LENGTH: usize = 256;

/// Normalised network location of a peer node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerAddress {
    pub host: String,
    pub port: u16,
}

impl PeerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        PeerAddress {
            host: host.into().to_ascii_lowercase(),
            port,
        }
    }

    /// Parse a peer location, with or without scheme and path.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ChainError::InvalidPeerAddress(
                "address cannot be empty".to_string(),
            ));
        }
        if trimmed.len() > MAX_ADDRESS_LENGTH {
            return Err(ChainError::InvalidPeerAddress(format!(
                "address exceeds {} characters",
                MAX_ADDRESS_LENGTH
            )));
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };

        let url = Url::parse(&with_scheme)
            .map_err(|e| ChainError::InvalidPeerAddress(format!("{}: {}", trimmed, e)))?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ChainError::InvalidPeerAddress(format!("{}: missing host", trimmed)))?;
        let port = url.port_or_known_default().ok_or_else(|| {
            ChainError::InvalidPeerAddress(format!("{}: missing port", trimmed))
        })?;

        Ok(PeerAddress::new(host, port))
    }

    /// `host:port`, the registry key.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL used to reach the peer's HTTP interface.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr())
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr())
    }
}

/// Thread-safe set of known peers.
#[derive(Debug, Clone, Default)]
pub struct PeerRegistry {
    inner: Arc<RwLock<BTreeSet<PeerAddress>>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalise and add a peer. Returns the stored address and whether it was new.
    pub fn register(&self, input: &str) -> Result<(PeerAddress, bool)> {
        let peer = PeerAddress::parse(input)?;
        let inserted = self.inner.write().insert(peer.clone());
        Ok((peer, inserted))
    }

    /// Add every address or none of them.
    ///
    /// All inputs are parsed before the registry is touched, so one bad
    /// entry leaves the registry as it was. Returns the number of new peers.
    pub fn register_all<S: AsRef<str>>(&self, inputs: &[S]) -> Result<usize> {
        let parsed = inputs
            .iter()
            .map(|input| PeerAddress::parse(input.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut peers = self.inner.write();
        Ok(parsed.into_iter().filter(|peer| peers.insert(peer.clone())).count())
    }

    pub fn remove(&self, peer: &PeerAddress) -> bool {
        self.inner.write().remove(peer)
    }

    pub fn contains(&self, peer: &PeerAddress) -> bool {
        self.inner.read().contains(peer)
    }

    /// Stable copy of the registry. Later registrations do not affect it.
    pub fn snapshot(&self) -> Vec<PeerAddress> {
        self.inner.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_scheme_and_path() {
        let peer = PeerAddress::parse("http://127.0.0.1:5001/get_chain?x=1").unwrap();
        assert_eq!(peer, PeerAddress::new("127.0.0.1", 5001));
        assert_eq!(peer.addr(), "127.0.0.1:5001");
        assert_eq!(peer.base_url(), "http://127.0.0.1:5001");
    }

    #[test]
    fn test_parse_without_scheme() {
        let peer = PeerAddress::parse("Node-A.local:5002").unwrap();
        assert_eq!(peer.addr(), "node-a.local:5002");
    }

    #[test]
    fn test_parse_default_port() {
        assert_eq!(PeerAddress::parse("http://peer.example").unwrap().port, 80);
        assert_eq!(PeerAddress::parse("https://peer.example/").unwrap().port, 443);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(PeerAddress::parse("").is_err());
        assert!(PeerAddress::parse("http://").is_err());
        assert!(PeerAddress::parse("127.0.0.1:notaport").is_err());
        assert!(PeerAddress::parse(&"a".repeat(300)).is_err());
    }

    #[test]
    fn test_register_deduplicates() {
        let registry = PeerRegistry::new();
        let (first, new_first) = registry.register("http://127.0.0.1:5001/").unwrap();
        let (second, new_second) = registry.register("127.0.0.1:5001/get_chain").unwrap();

        assert!(new_first);
        assert!(!new_second);
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_snapshot_is_stable() {
        let registry = PeerRegistry::new();
        registry.register("127.0.0.1:5001").unwrap();
        let snapshot = registry.snapshot();
        registry.register("127.0.0.1:5002").unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 2);
        assert!(registry.remove(&snapshot[0]));
        assert!(!registry.contains(&snapshot[0]));
    }

    #[test]
    fn test_register_all_is_all_or_nothing() {
        let registry = PeerRegistry::new();
        assert!(registry.register_all(&["127.0.0.1:5001", "http://"]).is_err());
        assert!(registry.is_empty());

        let added = registry
            .register_all(&["127.0.0.1:5001", "http://127.0.0.1:5001/get_chain", "127.0.0.1:5002"])
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(registry.len(), 2);
    }
}
