//! Cluster API Handlers
//!
//! HTTP endpoints exposing the coordinator to clients and to peer nodes.
//! These handlers translate HTTP requests into coordinator and store calls;
//! they are the bridge between the axum framework and the protocol logic in
//! `service.rs`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use sysinfo::System;

use super::protocol::{
    AllDataResponse, BulkDataRequest, BulkDataResponse, DataRequest, DataResponse,
    RebalanceRequest, RebalanceResponse,
};
use super::service::Coordinator;

/// Public PUT handler: routes the write to the key's owner.
pub async fn handle_put(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(request): Json<DataRequest>,
) -> Json<DataResponse> {
    Json(coordinator.put(&request.key, &request.value).await)
}

/// Public GET handler: serves locally or fetches from the cluster.
pub async fn handle_get(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Path(key): Path<String>,
) -> Json<DataResponse> {
    Json(coordinator.get(&key).await)
}

/// Public DELETE handler.
pub async fn handle_delete(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Path(key): Path<String>,
) -> Json<DataResponse> {
    Json(coordinator.delete(&key).await)
}

/// Internal GET handler: serves this node's tiers only. Peers use it to
/// probe for replica copies without re-entering the routed read path.
pub async fn handle_get_internal(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Path(key): Path<String>,
) -> Json<DataResponse> {
    Json(coordinator.get_local_tiers(&key))
}

/// Internal endpoint: stores one replicated key at the given level.
/// Invoked by the owner during write fan-out.
pub async fn handle_put_replica(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Path(level): Path<usize>,
    Json(request): Json<DataRequest>,
) -> Json<DataResponse> {
    coordinator.put_replica(level, &request.key, &request.value);
    Json(DataResponse::found(request.value))
}

/// Internal endpoint: merges a bulk replica payload at the given level.
/// Invoked during promotion fan-out and rebalance refills.
pub async fn handle_put_bulk_replica(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Path(level): Path<usize>,
    Json(request): Json<BulkDataRequest>,
) -> Json<BulkDataResponse> {
    tracing::info!(
        "Received {} bulk replica entries at level {}",
        request.data.len(),
        level
    );
    coordinator.put_bulk_replica(level, request.data);

    Json(BulkDataResponse {
        message: "Bulk replica data stored successfully".to_string(),
        found: true,
    })
}

#[derive(Debug, Deserialize)]
pub struct DeleteReplicaParams {
    #[serde(rename = "replicaIndex")]
    pub replica_index: usize,
}

/// Internal endpoint: removes a replicated key from the given level.
/// 200 when the key existed, 404 otherwise.
pub async fn handle_delete_replica(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Path(key): Path<String>,
    Query(params): Query<DeleteReplicaParams>,
) -> StatusCode {
    if coordinator.store().delete_replica(params.replica_index, &key) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Dump of every tier on this node, for inspection and tests.
pub async fn handle_get_all(
    Extension(coordinator): Extension<Arc<Coordinator>>,
) -> Json<AllDataResponse> {
    let store = coordinator.store();
    Json(AllDataResponse {
        primary: store.primary_snapshot(),
        replicas: store.all_replica_snapshots(),
    })
}

/// Dump of the primary tier only. Peers call this to refill replica state
/// from their predecessor.
pub async fn handle_get_primary(
    Extension(coordinator): Extension<Arc<Coordinator>>,
) -> Json<HashMap<String, String>> {
    Json(coordinator.store().primary_snapshot())
}

/// Ring dump: node ids mapped to positions, ascending by position.
pub async fn handle_nodes(
    Extension(coordinator): Extension<Arc<Coordinator>>,
) -> Json<serde_json::Value> {
    let mut nodes = serde_json::Map::new();
    for (node_id, position) in coordinator.ring().positions() {
        nodes.insert(node_id, serde_json::json!(position));
    }
    Json(serde_json::Value::Object(nodes))
}

/// Rebalance negotiation endpoint, called by a joining node's coordinator.
pub async fn handle_rebalance(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(request): Json<RebalanceRequest>,
) -> Json<RebalanceResponse> {
    let response = coordinator.handle_rebalance(&request);
    tracing::info!(
        "Completed rebalance request {} with success {}",
        request.operation,
        response.success
    );
    Json(response)
}

pub async fn handle_health() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
pub struct NodeStatsResponse {
    pub node_id: String,
    pub ring_nodes: usize,
    pub nodes: Vec<String>,
    pub primary_entries: usize,
    pub replica_entries: usize,
    pub rebalancing: bool,
    pub cpu_usage: f32,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
}

/// Node and host runtime statistics.
pub async fn handle_stats(
    Extension(coordinator): Extension<Arc<Coordinator>>,
) -> Json<NodeStatsResponse> {
    let store = coordinator.store();
    let replica_entries = (1..store.replication_factor())
        .map(|level| store.replica_len(level))
        .sum();

    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();

    Json(NodeStatsResponse {
        node_id: coordinator.local().node_id.clone(),
        ring_nodes: coordinator.ring().len(),
        nodes: coordinator
            .ring()
            .all_nodes()
            .into_iter()
            .map(|node| node.node_id)
            .collect(),
        primary_entries: store.primary_len(),
        replica_entries,
        rebalancing: coordinator.is_rebalancing(),
        cpu_usage: sys.global_cpu_info().cpu_usage(),
        // sysinfo reports memory in bytes.
        mem_used_mb: sys.used_memory() / (1024 * 1024),
        mem_total_mb: sys.total_memory() / (1024 * 1024),
    })
}
