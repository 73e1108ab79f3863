use serde::{Deserialize, Serialize};

use super::hashring::hash_key;

/// A node's position and address on the ring.
///
/// The canonical identifier is `host:port`; it is also the hashing input for
/// ring placement, so every member of the cluster derives the same position
/// for a given node independently. Two descriptors are equal iff their
/// `node_id` matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Canonical identifier, always `host:port`.
    pub node_id: String,
    pub host: String,
    pub port: u16,
    /// Ring position, cached at construction (`hash(node_id)`).
    pub hash_value: u32,
    /// Reserved liveness toggle. Membership drives ring add/remove directly,
    /// so nothing flips this today.
    pub active: bool,
}

impl NodeInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let node_id = format!("{}:{}", host, port);
        let hash_value = hash_key(&node_id);
        Self {
            node_id,
            host,
            port,
            hash_value,
            active: true,
        }
    }

    /// The HTTP address of the node, `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl PartialEq for NodeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.node_id == other.node_id
    }
}

impl Eq for NodeInfo {}

impl std::hash::Hash for NodeInfo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.node_id.hash(state);
    }
}
