use std::collections::BTreeMap;
use std::io::Cursor;
use std::ops::Bound;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::types::NodeInfo;

/// Seed shared by every node for both key and node-id hashing.
const HASH_SEED: u32 = 0;

/// Hashes a key (or node id) to its position on the ring.
///
/// MurmurHash3 32-bit over the UTF-8 bytes, reinterpreted as unsigned. Keys
/// and node identifiers share this function, which is what puts them in one
/// coordinate space.
pub fn hash_key(key: &str) -> u32 {
    murmur3::murmur3_32(&mut Cursor::new(key.as_bytes()), HASH_SEED)
        .expect("hashing an in-memory buffer cannot fail")
}

/// The consistent-hash ring: an ordered map from ring position to node.
///
/// Lookups are safe under concurrent readers. Structural writes (`add`,
/// `remove`) are expected to be serialised by the caller; the interior lock
/// only protects map integrity, not protocol-level ordering.
pub struct HashRing {
    circle: RwLock<BTreeMap<u32, NodeInfo>>,
}

impl HashRing {
    pub fn new() -> Self {
        Self {
            circle: RwLock::new(BTreeMap::new()),
        }
    }

    /// Inserts a node at `hash(node_id)`.
    ///
    /// If another node already occupies that position the call is a no-op:
    /// first insertion wins, so all members resolve collisions identically.
    pub fn add(&self, mut node: NodeInfo) {
        let h = hash_key(&node.node_id);
        let mut circle = self.circle.write();

        if let Some(existing) = circle.get(&h) {
            warn!(
                "Node {} already occupies ring position {} (requested by {})",
                existing.node_id, h, node.node_id
            );
            return;
        }

        node.hash_value = h;
        info!("Added node {} to ring at position {}", node.node_id, h);
        circle.insert(h, node);
    }

    /// Removes a node by its ring position. No-op if absent.
    pub fn remove(&self, node: &NodeInfo) {
        let h = hash_key(&node.node_id);
        let mut circle = self.circle.write();

        match circle.remove(&h) {
            Some(removed) => {
                info!("Removed node {} from ring position {}", removed.node_id, h);
            }
            None => {
                warn!("Node {} (position {}) not on ring, nothing to remove", node.node_id, h);
            }
        }
    }

    /// Returns the node owning `key`: the entry at the smallest hash >= the
    /// key's hash, wrapping to the ring's first entry. `None` iff empty.
    pub fn owner_of(&self, key: &str) -> Option<NodeInfo> {
        let circle = self.circle.read();
        if circle.is_empty() {
            return None;
        }

        let h = hash_key(key);
        let owner = circle
            .range(h..)
            .next()
            .or_else(|| circle.iter().next())
            .map(|(_, node)| node.clone());

        if let Some(node) = &owner {
            debug!("Key hash {} resolved to node {} (position {})", h, node.node_id, node.hash_value);
        }
        owner
    }

    /// Returns the node at the smallest hash strictly greater than the given
    /// node's own position, wrapping around. A single-entry ring returns that
    /// entry; walkers must detect self-equality to terminate.
    pub fn successor(&self, node_id: &str) -> Option<NodeInfo> {
        let circle = self.circle.read();
        if circle.is_empty() {
            return None;
        }

        let h = hash_key(node_id);
        circle
            .range((Bound::Excluded(h), Bound::Unbounded))
            .next()
            .or_else(|| circle.iter().next())
            .map(|(_, node)| node.clone())
    }

    /// Symmetric to [`successor`](Self::successor): the entry at the largest
    /// hash strictly less than the node's own, wrapping to the ring's last.
    pub fn predecessor(&self, node_id: &str) -> Option<NodeInfo> {
        let circle = self.circle.read();
        if circle.is_empty() {
            return None;
        }

        let h = hash_key(node_id);
        circle
            .range(..h)
            .next_back()
            .or_else(|| circle.iter().next_back())
            .map(|(_, node)| node.clone())
    }

    /// Collects up to `rf` distinct nodes for `key`, starting at the owner
    /// and walking clockwise with wrap-around. Fewer than `rf` members on the
    /// ring yields all of them.
    pub fn replicas(&self, key: &str, rf: usize) -> Vec<NodeInfo> {
        let circle = self.circle.read();
        let mut replicas = Vec::new();
        if circle.is_empty() || rf == 0 {
            return replicas;
        }

        let h = hash_key(key);
        let mut seen = std::collections::HashSet::new();
        for (_, node) in circle.range(h..).chain(circle.range(..h)) {
            if replicas.len() >= rf {
                break;
            }
            if seen.insert(node.node_id.clone()) {
                replicas.push(node.clone());
            }
        }

        replicas
    }

    /// All nodes in hash order, deduplicated by node id.
    pub fn all_nodes(&self) -> Vec<NodeInfo> {
        let circle = self.circle.read();
        let mut seen = std::collections::HashSet::new();
        circle
            .values()
            .filter(|node| seen.insert(node.node_id.clone()))
            .cloned()
            .collect()
    }

    /// `(node_id, position)` pairs in ascending hash order.
    pub fn positions(&self) -> Vec<(String, u32)> {
        let circle = self.circle.read();
        circle
            .iter()
            .map(|(h, node)| (node.node_id.clone(), *h))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.circle.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.circle.read().len()
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new()
    }
}
