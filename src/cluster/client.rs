use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, error, warn};

use super::protocol::{
    BulkDataRequest, DataRequest, DataResponse, ENDPOINT_DATA, ENDPOINT_DATA_INTERNAL,
    ENDPOINT_DATA_PRIMARY, ENDPOINT_REBALANCE, ENDPOINT_REPLICA, ENDPOINT_REPLICA_BULK,
    RebalanceRequest, RebalanceResponse,
};
use crate::ring::NodeInfo;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);
const RETRY_ATTEMPTS: usize = 3;

/// Stateless outbound transport: one logical message to one named peer,
/// returning the peer's reply synchronously.
///
/// Client-facing operations (`put`, `get`, `delete`) surface transport
/// failures as a `found = false` response carrying the error message.
/// Replica-propagation operations are best-effort: failures are logged and
/// swallowed, never propagated to the initiating operation.
#[derive(Clone)]
pub struct PeerClient {
    http: reqwest::Client,
}

impl PeerClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    async fn post_with_retry<T: Serialize>(
        &self,
        url: String,
        payload: &T,
    ) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..RETRY_ATTEMPTS {
            let response = self
                .http
                .post(url.clone())
                .json(payload)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == RETRY_ATTEMPTS {
                        return Err(anyhow::anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }

    async fn get_with_retry(&self, url: String) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..RETRY_ATTEMPTS {
            let response = self
                .http
                .get(url.clone())
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == RETRY_ATTEMPTS {
                        return Err(anyhow::anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }

    async fn delete_with_retry(&self, url: String) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..RETRY_ATTEMPTS {
            let response = self
                .http
                .delete(url.clone())
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == RETRY_ATTEMPTS {
                        return Err(anyhow::anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }

    async fn parse_data_response(response: reqwest::Response) -> Result<DataResponse> {
        Ok(response.json::<DataResponse>().await?)
    }

    /// Forwards a client write to `node`, returning its response verbatim.
    pub async fn put(&self, node: &NodeInfo, key: &str, value: &str) -> DataResponse {
        let url = format!("http://{}{}", node.address(), ENDPOINT_DATA);
        let request = DataRequest {
            key: key.to_string(),
            value: value.to_string(),
        };

        match self.post_with_retry(url, &request).await {
            Ok(response) => match Self::parse_data_response(response).await {
                Ok(parsed) => parsed,
                Err(e) => DataResponse::failure(format!("Error communicating with node: {}", e)),
            },
            Err(e) => DataResponse::failure(format!("Error communicating with node: {}", e)),
        }
    }

    /// Forwards a client read to `node` (full routing on the remote side).
    pub async fn get(&self, node: &NodeInfo, key: &str) -> DataResponse {
        let url = format!("http://{}{}/{}", node.address(), ENDPOINT_DATA, key);

        match self.get_with_retry(url).await {
            Ok(response) => match Self::parse_data_response(response).await {
                Ok(parsed) => parsed,
                Err(e) => DataResponse::failure(format!("Error communicating with node: {}", e)),
            },
            Err(e) => DataResponse::failure(format!("Error communicating with node: {}", e)),
        }
    }

    /// Reads `node`'s local tiers only, bypassing routing. Used to probe the
    /// owner's successors for replica copies without re-entering the cluster
    /// read path on the probed node.
    pub async fn get_local(&self, node: &NodeInfo, key: &str) -> DataResponse {
        let url = format!("http://{}{}/{}", node.address(), ENDPOINT_DATA_INTERNAL, key);

        match self.get_with_retry(url).await {
            Ok(response) => match Self::parse_data_response(response).await {
                Ok(parsed) => parsed,
                Err(e) => DataResponse::failure(format!("Error communicating with node: {}", e)),
            },
            Err(e) => DataResponse::failure(format!("Error communicating with node: {}", e)),
        }
    }

    /// Forwards a client delete to `node`, returning its response verbatim.
    pub async fn delete(&self, node: &NodeInfo, key: &str) -> DataResponse {
        let url = format!("http://{}{}/{}", node.address(), ENDPOINT_DATA, key);

        match self.delete_with_retry(url).await {
            Ok(response) => match Self::parse_data_response(response).await {
                Ok(parsed) => parsed,
                Err(e) => DataResponse::failure(format!("Error communicating with node: {}", e)),
            },
            Err(e) => DataResponse::failure(format!("Error communicating with node: {}", e)),
        }
    }

    /// Pushes one key to `node`'s replica tier `level`. Best-effort.
    pub async fn replicate(&self, node: &NodeInfo, key: &str, value: &str, level: usize) {
        let url = format!("http://{}{}/{}", node.address(), ENDPOINT_REPLICA, level);
        let request = DataRequest {
            key: key.to_string(),
            value: value.to_string(),
        };

        if let Err(e) = self.post_with_retry(url, &request).await {
            error!("Error replicating key {} to node {} at level {}: {}", key, node.node_id, level, e);
        }
    }

    /// Merges a whole map into `node`'s replica tier `level`. Best-effort.
    pub async fn replicate_bulk(
        &self,
        node: &NodeInfo,
        data: &HashMap<String, String>,
        level: usize,
    ) {
        let url = format!("http://{}{}/{}", node.address(), ENDPOINT_REPLICA_BULK, level);
        let request = BulkDataRequest { data: data.clone() };

        debug!(
            "Sending bulk replication of {} entries to {} at level {}",
            data.len(),
            node.node_id,
            level
        );

        if let Err(e) = self.post_with_retry(url, &request).await {
            error!(
                "Error bulk-replicating {} entries to node {} at level {}: {}",
                data.len(),
                node.node_id,
                level,
                e
            );
        }
    }

    /// Removes one key from `node`'s replica tier `level`. Best-effort.
    pub async fn delete_replica(&self, node: &NodeInfo, key: &str, level: usize) {
        let url = format!(
            "http://{}{}/{}?replicaIndex={}",
            node.address(),
            ENDPOINT_REPLICA,
            key,
            level
        );

        if let Err(e) = self.delete_with_retry(url).await {
            error!(
                "Failed to delete replica key {} from node {} at level {}: {}",
                key, node.node_id, level, e
            );
        }
    }

    /// Asks `node` to shed data for a membership change. A transport failure
    /// becomes a synthetic unsuccessful response.
    pub async fn rebalance(&self, node: &NodeInfo, request: &RebalanceRequest) -> RebalanceResponse {
        let url = format!("http://{}{}", node.address(), ENDPOINT_REBALANCE);

        match self.post_with_retry(url, request).await {
            Ok(response) => match response.json::<RebalanceResponse>().await {
                Ok(parsed) => {
                    debug!("Rebalance response from {}: success={}", node.node_id, parsed.success);
                    parsed
                }
                Err(e) => RebalanceResponse::failure(format!("Communication error: {}", e)),
            },
            Err(e) => {
                error!("Error during rebalancing with node {}: {}", node.node_id, e);
                RebalanceResponse::failure(format!("Communication error: {}", e))
            }
        }
    }

    /// Fetches `node`'s full primary snapshot; empty on any failure.
    pub async fn fetch_all_primary(&self, node: &NodeInfo) -> HashMap<String, String> {
        let url = format!("http://{}{}", node.address(), ENDPOINT_DATA_PRIMARY);

        match self.get_with_retry(url).await {
            Ok(response) => match response.json::<HashMap<String, String>>().await {
                Ok(data) => {
                    debug!("Fetched {} primary entries from node {}", data.len(), node.node_id);
                    data
                }
                Err(e) => {
                    warn!("Unparseable primary dump from node {}: {}", node.node_id, e);
                    HashMap::new()
                }
            },
            Err(e) => {
                error!("Failed to fetch primary data from node {}: {}", node.node_id, e);
                HashMap::new()
            }
        }
    }
}

impl Default for PeerClient {
    fn default() -> Self {
        Self::new()
    }
}
