use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, warn};

use super::client::PeerClient;
use super::protocol::{DataResponse, RebalanceRequest, RebalanceResponse};
use crate::ring::{HashRing, NodeInfo};
use crate::storage::DataStore;

const MSG_REBALANCING: &str = "System is rebalancing, please try again later";
const MSG_NO_NODES: &str = "No nodes available";
const MSG_NOT_FOUND: &str = "Key not found";

/// Clears the rebalancing flag when dropped, so every exit path out of a
/// membership handler releases it.
struct RebalanceGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RebalanceGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
            .then_some(Self { flag })
    }
}

impl Drop for RebalanceGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// The cluster orchestrator.
///
/// Consumes client requests, consults the ring to decide local-vs-remote,
/// drives the synchronous primary+replica fan-out, and runs the rebalance
/// protocol on membership events. The `rebalancing` flag is an advisory gate:
/// client writes and deletes arriving while it is set are rejected with a
/// transient error instead of blocking.
pub struct Coordinator {
    local: NodeInfo,
    ring: Arc<HashRing>,
    store: Arc<DataStore>,
    peers: PeerClient,
    rebalancing: AtomicBool,
}

impl Coordinator {
    pub fn new(
        local: NodeInfo,
        ring: Arc<HashRing>,
        store: Arc<DataStore>,
        peers: PeerClient,
    ) -> Arc<Self> {
        Arc::new(Self {
            local,
            ring,
            store,
            peers,
            rebalancing: AtomicBool::new(false),
        })
    }

    pub fn local(&self) -> &NodeInfo {
        &self.local
    }

    pub fn ring(&self) -> &HashRing {
        &self.ring
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn is_rebalancing(&self) -> bool {
        self.rebalancing.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn set_rebalancing(&self, value: bool) {
        self.rebalancing.store(value, Ordering::SeqCst);
    }

    // --- Client paths ---

    /// Stores `key`, serving locally when this node owns it and forwarding
    /// one hop to the owner otherwise.
    pub async fn put(&self, key: &str, value: &str) -> DataResponse {
        info!("PUT initiated for key {}", key);

        if self.is_rebalancing() {
            warn!("Rejecting PUT for key {} while rebalancing", key);
            return DataResponse::failure(MSG_REBALANCING);
        }

        let Some(owner) = self.ring.owner_of(key) else {
            error!("No nodes on ring, cannot route key {}", key);
            return DataResponse::failure(MSG_NO_NODES);
        };

        if owner.node_id != self.local.node_id {
            debug!("Key {} belongs to {}, forwarding PUT", key, owner.node_id);
            return self.peers.put(&owner, key, value).await;
        }

        self.store.put_primary(key, value);
        self.replicate_to_downstream(key, value).await;
        DataResponse::found(value)
    }

    /// Resolves `key` against the owner; a remote miss is followed by a
    /// bounded probe of the owner's successors, which may still hold replica
    /// copies after a membership change.
    pub async fn get(&self, key: &str) -> DataResponse {
        info!("GET initiated for key {}", key);

        let Some(owner) = self.ring.owner_of(key) else {
            error!("No nodes on ring, cannot route key {}", key);
            return DataResponse::failure(MSG_NO_NODES);
        };

        if owner.node_id == self.local.node_id {
            return self.get_local_tiers(key);
        }

        debug!("Key {} belongs to {}, forwarding GET", key, owner.node_id);
        let response = self.peers.get(&owner, key).await;
        if response.found {
            return response;
        }

        let rf = self.store.replication_factor();
        let mut cursor = owner.clone();
        for _ in 1..rf {
            let Some(next) = self.ring.successor(&cursor.node_id) else {
                break;
            };
            if next.node_id == owner.node_id {
                break;
            }

            debug!("Probing {} for replica of key {}", next.node_id, key);
            let probe = if next.node_id == self.local.node_id {
                self.get_local_tiers(key)
            } else {
                self.peers.get_local(&next, key).await
            };
            if probe.found {
                return probe;
            }
            cursor = next;
        }

        response
    }

    /// Reads this node's own tiers: primary first, then each replica level
    /// in order. Never routes.
    pub fn get_local_tiers(&self, key: &str) -> DataResponse {
        if let Some(value) = self.store.get_primary(key) {
            return DataResponse::found(value);
        }

        for level in 1..self.store.replication_factor() {
            if let Some(value) = self.store.get_replica(level, key) {
                debug!("Key {} found at replica level {}", key, level);
                return DataResponse::found(value);
            }
        }

        DataResponse::failure(MSG_NOT_FOUND)
    }

    /// Removes `key`, mirroring the write path: reject while rebalancing,
    /// forward to a remote owner, otherwise delete locally and sweep the
    /// downstream replica tiers.
    pub async fn delete(&self, key: &str) -> DataResponse {
        info!("DELETE initiated for key {}", key);

        if self.is_rebalancing() {
            warn!("Rejecting DELETE for key {} while rebalancing", key);
            return DataResponse::failure(MSG_REBALANCING);
        }

        let Some(owner) = self.ring.owner_of(key) else {
            error!("No nodes on ring, cannot route key {}", key);
            return DataResponse::failure(MSG_NO_NODES);
        };

        if owner.node_id != self.local.node_id {
            debug!("Key {} belongs to {}, forwarding DELETE", key, owner.node_id);
            return self.peers.delete(&owner, key).await;
        }

        if !self.store.delete_primary(key) {
            debug!("Key {} not present in primary, nothing to delete", key);
            return DataResponse::failure(MSG_NOT_FOUND);
        }

        self.delete_from_downstream(key).await;
        DataResponse {
            value: None,
            found: true,
            message: Some("Key deleted successfully".to_string()),
        }
    }

    // --- Replica fan-out ---

    /// Walks successors clockwise, pushing one replica per level. The walk
    /// advances from the last visited node and stops on wrap-around, so each
    /// level lands on a distinct peer.
    async fn replicate_to_downstream(&self, key: &str, value: &str) {
        let rf = self.store.replication_factor();
        let mut level = 1;
        let mut cursor = self.ring.successor(&self.local.node_id);

        while let Some(node) = cursor {
            if node.node_id == self.local.node_id || level >= rf {
                break;
            }

            debug!("Replicating key {} to {} at level {}", key, node.node_id, level);
            self.peers.replicate(&node, key, value, level).await;

            level += 1;
            cursor = self.ring.successor(&node.node_id);
        }
    }

    /// The delete-side mirror of [`replicate_to_downstream`](Self::replicate_to_downstream).
    async fn delete_from_downstream(&self, key: &str) {
        let rf = self.store.replication_factor();
        let mut level = 1;
        let mut cursor = self.ring.successor(&self.local.node_id);

        while let Some(node) = cursor {
            if node.node_id == self.local.node_id || level >= rf {
                break;
            }

            debug!("Deleting key {} from {} at level {}", key, node.node_id, level);
            self.peers.delete_replica(&node, key, level).await;

            level += 1;
            cursor = self.ring.successor(&node.node_id);
        }
    }

    /// Bulk variant used after a promotion: the whole promoted map goes to
    /// each downstream peer at its level.
    async fn replicate_bulk_downstream(&self, data: &HashMap<String, String>) {
        let rf = self.store.replication_factor();
        let mut level = 1;
        let mut cursor = self.ring.successor(&self.local.node_id);

        while let Some(node) = cursor {
            if node.node_id == self.local.node_id || level >= rf {
                break;
            }

            info!(
                "Replicating {} promoted entries to {} at level {}",
                data.len(),
                node.node_id,
                level
            );
            self.peers.replicate_bulk(&node, data, level).await;

            level += 1;
            cursor = self.ring.successor(&node.node_id);
        }
    }

    // --- Replica-tier writes driven by peers ---

    pub fn put_replica(&self, level: usize, key: &str, value: &str) {
        self.store.put_replica(level, key, value);
    }

    pub fn put_bulk_replica(&self, level: usize, data: HashMap<String, String>) {
        info!("Storing {} bulk replica entries at level {}", data.len(), level);
        self.store.put_bulk_replica(level, data);
    }

    // --- Membership events ---

    /// A peer joined: record its ring position. No data moves here; the
    /// newcomer pulls its range from its successor itself.
    pub async fn handle_node_added(&self, node: NodeInfo) {
        info!("Handling addition of node {}", node.node_id);

        let Some(_guard) = RebalanceGuard::acquire(&self.rebalancing) else {
            warn!("Could not acquire rebalancing lock for addition of {}", node.node_id);
            return;
        };

        self.ring.add(node);
    }

    /// A peer left. The predecessor relationship is evaluated against the
    /// ring as it was before removal; only the departed node's successor
    /// inherits its data.
    pub async fn handle_node_removed(&self, node_id: &str) {
        info!("Handling removal of node {}", node_id);

        let Some(_guard) = RebalanceGuard::acquire(&self.rebalancing) else {
            warn!("Could not acquire rebalancing lock for removal of {}", node_id);
            return;
        };

        let Some(removed) = self
            .ring
            .all_nodes()
            .into_iter()
            .find(|node| node.node_id == node_id)
        else {
            warn!("Node {} not found on ring during removal", node_id);
            return;
        };

        let was_predecessor = self
            .ring
            .predecessor(&self.local.node_id)
            .map(|prev| prev.node_id == node_id)
            .unwrap_or(false);

        self.ring.remove(&removed);

        if was_predecessor {
            info!("Node {} was our predecessor, inheriting its data", node_id);
            self.inherit_from_predecessor().await;
        } else {
            debug!("Removal of {} does not affect this node's ranges", node_id);
        }
    }

    /// This node has just appeared in its own discovery sweep: take a ring
    /// position and pull the owned range from the successor. The rebalancing
    /// flag stays held for the whole pull, so no client write lands on this
    /// node before its data does.
    pub async fn handle_self_joined(&self) {
        info!("Local node {} newly joined, starting pull rebalance", self.local.node_id);

        let Some(_guard) = RebalanceGuard::acquire(&self.rebalancing) else {
            warn!("Could not acquire rebalancing lock for self-join");
            return;
        };

        self.ring.add(self.local.clone());
        self.pull_from_successor().await;
    }

    /// Promotes replica level 1 into primary (those keys were the departed
    /// predecessor's), re-replicates the promoted entries downstream, then
    /// refills replica level 1 from the new predecessor's primary.
    async fn inherit_from_predecessor(&self) {
        if self.store.replica_len(1) > 0 {
            let promoted = self.store.promote_replica_to_primary(1);
            info!("Promoted {} entries from replica level 1 to primary", promoted.len());

            if !promoted.is_empty() {
                self.replicate_bulk_downstream(&promoted).await;
            }
        } else {
            info!("No secondary data at replica level 1 to promote");
        }

        self.refill_replica_from_predecessor().await;
    }

    /// Restores the invariant that replica level 1 mirrors the predecessor's
    /// primary tier. Best-effort: a fetch failure leaves the tier to be
    /// repaired by later writes.
    async fn refill_replica_from_predecessor(&self) {
        let Some(prev) = self.ring.predecessor(&self.local.node_id) else {
            warn!("No predecessor found to refill replica data from");
            return;
        };

        if prev.node_id == self.local.node_id {
            info!("Only node on ring, no predecessor data to fetch");
            return;
        }

        let data = self.peers.fetch_all_primary(&prev).await;
        if data.is_empty() {
            info!("No primary data on predecessor {}", prev.node_id);
            return;
        }

        info!("Storing {} entries from predecessor {} at replica level 1", data.len(), prev.node_id);
        self.store.put_bulk_replica(1, data);
    }

    /// Requests the local node's hash range from its successor, along with
    /// the successor's furthest replica tier, and installs both locally.
    async fn pull_from_successor(&self) {
        let Some(successor) = self.ring.successor(&self.local.node_id) else {
            return;
        };
        if successor.node_id == self.local.node_id {
            info!("No successor to pull data from, ring has only this node");
            return;
        }

        let start_range = self
            .ring
            .predecessor(&self.local.node_id)
            .map(|prev| prev.hash_value.wrapping_add(1))
            .unwrap_or(0);
        let end_range = self.local.hash_value;
        let replica_index = self.store.replication_factor() - 1;

        debug!(
            "Pulling range {}-{} from successor {} (replica index {})",
            start_range, end_range, successor.node_id, replica_index
        );

        let request = RebalanceRequest {
            operation: "ADD".to_string(),
            node_id: self.local.node_id.clone(),
            start_range,
            end_range,
            replica_index,
        };

        let response = self.peers.rebalance(&successor, &request).await;
        if !response.success {
            error!(
                "Rebalance pull from {} failed: {}",
                successor.node_id, response.message
            );
            return;
        }

        if let Some(primary) = response.new_node_primary_data {
            info!("Installing {} primary entries pulled from {}", primary.len(), successor.node_id);
            self.store.put_all_primary(primary);
        }
        if let Some(secondary) = response.new_node_secondary_data {
            info!("Installing {} secondary entries at replica level 1", secondary.len());
            self.store.put_bulk_replica(1, secondary);
        }
    }

    // --- Rebalance endpoint ---

    /// Serves a rebalance request from a peer. Only `ADD` is a recognised
    /// operation.
    pub fn handle_rebalance(&self, request: &RebalanceRequest) -> RebalanceResponse {
        info!(
            "Handling rebalance request, operation {} from node {}",
            request.operation, request.node_id
        );

        match request.operation.as_str() {
            "ADD" => self.handle_add_rebalance(request),
            other => RebalanceResponse::failure(format!("Unknown operation: {}", other)),
        }
    }

    /// Sheds the requested hash range from primary and the requested replica
    /// tier, then keeps the shed range as this node's own replica at that
    /// tier (the newcomer is now the predecessor holding it as primary).
    fn handle_add_rebalance(&self, request: &RebalanceRequest) -> RebalanceResponse {
        let primary_out = self
            .store
            .extract_range(request.start_range, request.end_range);
        debug!("Extracted {} keys for the joining node's primary", primary_out.len());

        let secondary_out = self.store.extract_replica(request.replica_index);
        debug!(
            "Extracted {} keys from replica level {} for the joining node",
            secondary_out.len(),
            request.replica_index
        );

        self.store
            .put_bulk_replica(request.replica_index, primary_out.clone());

        RebalanceResponse::success(primary_out, secondary_out)
    }
}
