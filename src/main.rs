use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use ringkv::cluster::handlers::{
    handle_delete, handle_delete_replica, handle_get, handle_get_all, handle_get_internal,
    handle_get_primary, handle_health, handle_nodes, handle_put, handle_put_bulk_replica,
    handle_put_replica, handle_rebalance, handle_stats,
};
use ringkv::cluster::protocol::{
    ENDPOINT_DATA, ENDPOINT_DATA_ALL, ENDPOINT_DATA_INTERNAL, ENDPOINT_DATA_PRIMARY,
    ENDPOINT_HEALTH, ENDPOINT_NODES, ENDPOINT_REBALANCE, ENDPOINT_REPLICA, ENDPOINT_REPLICA_BULK,
    ENDPOINT_STATS,
};
use ringkv::cluster::{Coordinator, PeerClient};
use ringkv::config::NodeConfig;
use ringkv::membership::{MembershipWatcher, PeerRegistry};
use ringkv::ring::{HashRing, NodeInfo};
use ringkv::storage::DataStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ringkv=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} --bind <host:port> [--peer <host:port>]... [--registry <url>]", args[0]);
        eprintln!("Example: {} --bind 127.0.0.1:8080", args[0]);
        eprintln!(
            "Example: {} --bind 127.0.0.1:8081 --peer 127.0.0.1:8080",
            args[0]
        );
        std::process::exit(1);
    }

    let config = NodeConfig::from_args(&args)?;

    tracing::info!("Starting node {} (replication factor {})", config.node_id(), config.replication_factor);

    // 1. Core components:
    let local = NodeInfo::new(config.host.clone(), config.port);
    let ring = Arc::new(HashRing::new());
    let store = Arc::new(DataStore::new(config.replication_factor));
    let coordinator = Coordinator::new(local, ring, store, PeerClient::new());

    // 2. Peer registry. The local node is part of its own static view so the
    // first sweep produces the self-joined event.
    let registry = match &config.registry_url {
        Some(url) => {
            tracing::info!("Using HTTP peer registry at {}", url);
            PeerRegistry::http(url.clone())
        }
        None => {
            let mut peers = config.static_peers.clone();
            peers.push((config.host.clone(), config.port));
            tracing::info!("Using static peer registry with {} entries", peers.len());
            PeerRegistry::fixed(peers)
        }
    };

    // 3. HTTP router:
    let max_body_bytes = std::env::var("MAX_BODY_BYTES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(20 * 1024 * 1024);

    let app = Router::new()
        .route(ENDPOINT_DATA, post(handle_put))
        .route(ENDPOINT_DATA_ALL, get(handle_get_all))
        .route(ENDPOINT_DATA_PRIMARY, get(handle_get_primary))
        .route(
            &format!("{}/:key", ENDPOINT_DATA),
            get(handle_get).delete(handle_delete),
        )
        .route(
            &format!("{}/:key", ENDPOINT_DATA_INTERNAL),
            get(handle_get_internal),
        )
        .route(
            &format!("{}/:key", ENDPOINT_REPLICA),
            post(handle_put_replica).delete(handle_delete_replica),
        )
        .route(
            &format!("{}/:level", ENDPOINT_REPLICA_BULK),
            post(handle_put_bulk_replica),
        )
        .route(ENDPOINT_REBALANCE, post(handle_rebalance))
        .route(ENDPOINT_NODES, get(handle_nodes))
        .route(ENDPOINT_HEALTH, get(handle_health))
        .route(ENDPOINT_STATS, get(handle_stats))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(Extension(coordinator.clone()));

    // 4. Spawn the membership watcher:
    let watcher = MembershipWatcher::new(registry, coordinator.clone());
    tokio::spawn(async move {
        watcher.run().await;
    });

    // 5. Start the HTTP server:
    let listen_addr = format!("{}:{}", config.host, config.port);
    tracing::info!("HTTP server listening on {}", listen_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
