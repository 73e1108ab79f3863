use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::registry::PeerRegistry;
use crate::cluster::Coordinator;
use crate::ring::NodeInfo;

/// Delay between the end of one sweep and the start of the next.
const WATCH_INTERVAL: Duration = Duration::from_secs(10);

/// Periodically compares the registry's membership with the cached view and
/// feeds join/leave events to the coordinator.
///
/// `known_nodes` is owned by the watcher and only touched from its own task,
/// so sweeps never race each other. A sweep is skipped outright while a
/// rebalance is in flight; the diff simply surfaces on the next sweep.
pub struct MembershipWatcher {
    registry: PeerRegistry,
    coordinator: Arc<Coordinator>,
    known_nodes: HashSet<String>,
}

impl MembershipWatcher {
    pub fn new(registry: PeerRegistry, coordinator: Arc<Coordinator>) -> Self {
        Self {
            registry,
            coordinator,
            known_nodes: HashSet::new(),
        }
    }

    /// Runs the sweep loop forever. The delay is measured from sweep
    /// completion, not sweep start, so slow registry queries cannot pile up.
    pub async fn run(mut self) {
        info!("Membership watcher started, sweeping every {:?}", WATCH_INTERVAL);
        loop {
            self.tick().await;
            tokio::time::sleep(WATCH_INTERVAL).await;
        }
    }

    /// One discovery sweep: query, diff, dispatch.
    pub async fn tick(&mut self) {
        if self.coordinator.is_rebalancing() {
            debug!("Skipping membership sweep during rebalancing");
            return;
        }

        let live = match self.registry.list_peers().await {
            Ok(peers) => peers,
            Err(e) => {
                warn!("Peer registry query failed: {}", e);
                return;
            }
        };

        let live_ids: HashSet<String> = live
            .iter()
            .map(|(host, port)| format!("{}:{}", host, port))
            .collect();
        debug!("Current live nodes: {:?}", live_ids);

        let local_id = self.coordinator.local().node_id.clone();
        let mut self_joined = false;

        for (host, port) in &live {
            let node_id = format!("{}:{}", host, port);
            if self.known_nodes.insert(node_id.clone()) {
                info!("Detected new node: {}", node_id);
                if node_id == local_id {
                    self_joined = true;
                } else {
                    self.coordinator
                        .handle_node_added(NodeInfo::new(host.clone(), *port))
                        .await;
                }
            }
        }

        // One departure per sweep; simultaneous losses surface on later
        // sweeps.
        let departed = self
            .known_nodes
            .iter()
            .find(|node_id| !live_ids.contains(*node_id))
            .cloned();
        if let Some(node_id) = departed {
            warn!("Detected node removal: {}", node_id);
            self.known_nodes.remove(&node_id);
            self.coordinator.handle_node_removed(&node_id).await;
        }

        if self_joined {
            self.coordinator.handle_self_joined().await;
        }

        debug!("Membership sweep completed, known nodes: {:?}", self.known_nodes);
    }

    pub fn known_nodes(&self) -> &HashSet<String> {
        &self.known_nodes
    }
}
