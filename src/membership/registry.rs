use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use parking_lot::RwLock;
use tracing::warn;

/// A peer endpoint as reported by discovery: `(host, port)`.
pub type PeerEndpoint = (String, u16);

const REGISTRY_TIMEOUT: Duration = Duration::from_secs(2);

/// The discovery capability: something that can report the current set of
/// live peer endpoints. Any backend works as long as the view is eventually
/// consistent.
pub enum PeerRegistry {
    /// A fixed seed list, for development clusters and tests. Shared so the
    /// owner of the handle can still adjust the set after the watcher starts.
    Static(std::sync::Arc<StaticRegistry>),
    /// A discovery service polled over HTTP.
    Http(HttpRegistry),
}

impl PeerRegistry {
    pub fn fixed(peers: impl IntoIterator<Item = PeerEndpoint>) -> Self {
        Self::Static(std::sync::Arc::new(StaticRegistry::new(peers)))
    }

    pub fn shared(registry: std::sync::Arc<StaticRegistry>) -> Self {
        Self::Static(registry)
    }

    pub fn http(url: impl Into<String>) -> Self {
        Self::Http(HttpRegistry::new(url))
    }

    pub async fn list_peers(&self) -> Result<HashSet<PeerEndpoint>> {
        match self {
            Self::Static(registry) => Ok(registry.peers()),
            Self::Http(registry) => registry.list_peers().await,
        }
    }
}

/// A registry backed by an in-process peer set. The set is mutable so tests
/// and tooling can simulate joins and departures.
pub struct StaticRegistry {
    peers: RwLock<HashSet<PeerEndpoint>>,
}

impl StaticRegistry {
    pub fn new(peers: impl IntoIterator<Item = PeerEndpoint>) -> Self {
        Self {
            peers: RwLock::new(peers.into_iter().collect()),
        }
    }

    pub fn peers(&self) -> HashSet<PeerEndpoint> {
        self.peers.read().clone()
    }

    pub fn set_peers(&self, peers: impl IntoIterator<Item = PeerEndpoint>) {
        *self.peers.write() = peers.into_iter().collect();
    }
}

/// A registry polling a discovery endpoint that returns a JSON array of
/// `"host:port"` strings.
pub struct HttpRegistry {
    http: reqwest::Client,
    url: String,
}

impl HttpRegistry {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub async fn list_peers(&self) -> Result<HashSet<PeerEndpoint>> {
        let entries: Vec<String> = self
            .http
            .get(&self.url)
            .timeout(REGISTRY_TIMEOUT)
            .send()
            .await?
            .json()
            .await?;

        let mut peers = HashSet::new();
        for entry in entries {
            match parse_endpoint(&entry) {
                Some(endpoint) => {
                    peers.insert(endpoint);
                }
                None => warn!("Ignoring malformed registry entry: {}", entry),
            }
        }

        Ok(peers)
    }
}

fn parse_endpoint(entry: &str) -> Option<PeerEndpoint> {
    let (host, port) = entry.rsplit_once(':')?;
    let port: u16 = port.parse().ok()?;
    if host.is_empty() {
        return None;
    }
    Some((host.to_string(), port))
}

#[cfg(test)]
mod parse_tests {
    use super::parse_endpoint;

    #[test]
    fn test_parse_endpoint() {
        assert_eq!(
            parse_endpoint("10.0.0.1:8080"),
            Some(("10.0.0.1".to_string(), 8080))
        );
        assert_eq!(parse_endpoint("db-2.internal:9000").unwrap().1, 9000);
        assert!(parse_endpoint("no-port").is_none());
        assert!(parse_endpoint(":8080").is_none());
        assert!(parse_endpoint("host:badport").is_none());
    }
}
