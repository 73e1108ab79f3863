//! Cluster Network Protocol
//!
//! Defines the API endpoints and Data Transfer Objects (DTOs) used for both
//! the client surface and internode communication (forwarded operations,
//! replica propagation, rebalancing).
//!
//! Field names are part of the wire contract: nodes of different builds
//! interoperate as long as these serialized shapes stay stable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Client surface for put (POST), and `/{key}` get (GET) / delete (DELETE).
pub const ENDPOINT_DATA: &str = "/api/data";
/// Full dump of the local primary and replica tiers.
pub const ENDPOINT_DATA_ALL: &str = "/api/data/all";
/// Dump of the local primary tier only, used when a node refills replica
/// state from its predecessor.
pub const ENDPOINT_DATA_PRIMARY: &str = "/api/data/primary";
/// Internal read serving local tiers only (no routing, no forwarding).
pub const ENDPOINT_DATA_INTERNAL: &str = "/api/internal/data";
/// Replica propagation: POST `/{level}` to store, DELETE `/{key}` to remove.
pub const ENDPOINT_REPLICA: &str = "/api/replica";
/// Bulk replica merge at `/{level}`.
pub const ENDPOINT_REPLICA_BULK: &str = "/api/replica/bulk";
/// Rebalance negotiation between a newcomer and its successor.
pub const ENDPOINT_REBALANCE: &str = "/api/rebalance";
/// Ring dump: node ids mapped to positions, ascending.
pub const ENDPOINT_NODES: &str = "/api/nodes";
pub const ENDPOINT_HEALTH: &str = "/api/health";
pub const ENDPOINT_STATS: &str = "/api/stats";

// --- Data Transfer Objects ---

/// Client write payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataRequest {
    pub key: String,
    pub value: String,
}

/// Uniform response for data operations, client-facing and forwarded alike.
///
/// Transport and routing failures surface here as `found = false` plus a
/// `message`; the HTTP layer never maps them to error statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DataResponse {
    /// A successful response carrying a value.
    pub fn found(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            found: true,
            message: None,
        }
    }

    /// A terminal failure or miss described by `message`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            value: None,
            found: false,
            message: Some(message.into()),
        }
    }
}

/// Bulk replica payload for promotion fan-out and rebalance refills.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkDataRequest {
    pub data: HashMap<String, String>,
}

/// Acknowledgment for bulk replica storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkDataResponse {
    pub message: String,
    pub found: bool,
}

/// Asks a node to shed part of its data set during a membership change.
///
/// For `operation = "ADD"` the receiver extracts `[startRange, endRange]`
/// (inclusive, wrapping) from its primary tier and drains replica tier
/// `replicaIndex` for the requesting newcomer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceRequest {
    pub operation: String,
    pub node_id: String,
    pub start_range: u32,
    pub end_range: u32,
    pub replica_index: usize,
}

/// The shed data returned to the newcomer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalanceResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_node_primary_data: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_node_secondary_data: Option<HashMap<String, String>>,
    pub success: bool,
    pub message: String,
}

impl RebalanceResponse {
    pub fn success(
        primary: HashMap<String, String>,
        secondary: HashMap<String, String>,
    ) -> Self {
        Self {
            new_node_primary_data: Some(primary),
            new_node_secondary_data: Some(secondary),
            success: true,
            message: "Rebalance successful".to_string(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            new_node_primary_data: None,
            new_node_secondary_data: None,
            success: false,
            message: message.into(),
        }
    }
}

/// Combined dump of every tier on one node (`GET /api/data/all`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllDataResponse {
    pub primary: HashMap<String, String>,
    pub replicas: HashMap<usize, HashMap<String, String>>,
}
