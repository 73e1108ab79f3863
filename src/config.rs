//! Node Configuration
//!
//! Startup settings come from the command line (`--bind`, `--registry`,
//! `--peer`) and the environment (`REPLICATION_FACTOR`). Invalid replication
//! factors fall back to 2 with a logged warning rather than failing startup.

use anyhow::{Result, bail};
use tracing::warn;

const DEFAULT_REPLICATION_FACTOR: usize = 2;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Host part of the listen address; `host:port` is the node id.
    pub host: String,
    pub port: u16,
    /// Total copies per key. 1 disables replica tiers.
    pub replication_factor: usize,
    /// Discovery service URL; when set it supersedes the static peer list.
    pub registry_url: Option<String>,
    /// Static registry entries. The local node is always added on top.
    pub static_peers: Vec<(String, u16)>,
}

impl NodeConfig {
    /// Parses `argv`-style arguments. `--bind host:port` is required;
    /// `--peer host:port` may repeat; `--registry url` switches discovery to
    /// the HTTP registry.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut bind: Option<(String, u16)> = None;
        let mut registry_url = None;
        let mut static_peers = Vec::new();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--bind" => {
                    let value = flag_value(args, i, "--bind")?;
                    bind = Some(parse_host_port(value)?);
                    i += 2;
                }
                "--registry" => {
                    registry_url = Some(flag_value(args, i, "--registry")?.to_string());
                    i += 2;
                }
                "--peer" => {
                    let value = flag_value(args, i, "--peer")?;
                    static_peers.push(parse_host_port(value)?);
                    i += 2;
                }
                _ => {
                    i += 1;
                }
            }
        }

        let Some((host, port)) = bind else {
            bail!("--bind is required");
        };

        Ok(Self {
            host,
            port,
            replication_factor: replication_factor_from_env(),
            registry_url,
            static_peers,
        })
    }

    pub fn node_id(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Reads `REPLICATION_FACTOR`; anything that is not an integer >= 1 yields
/// the default of 2 (with a warning when a value was actually supplied).
pub fn replication_factor_from_env() -> usize {
    match std::env::var("REPLICATION_FACTOR") {
        Ok(raw) => match raw.parse::<usize>() {
            Ok(value) if value >= 1 => value,
            _ => {
                warn!(
                    "Invalid REPLICATION_FACTOR '{}', defaulting to {}",
                    raw, DEFAULT_REPLICATION_FACTOR
                );
                DEFAULT_REPLICATION_FACTOR
            }
        },
        Err(_) => DEFAULT_REPLICATION_FACTOR,
    }
}

fn flag_value<'a>(args: &'a [String], index: usize, flag: &str) -> Result<&'a str> {
    args.get(index + 1)
        .map(|value| value.as_str())
        .ok_or_else(|| anyhow::anyhow!("{} requires a value", flag))
}

fn parse_host_port(value: &str) -> Result<(String, u16)> {
    let Some((host, port)) = value.rsplit_once(':') else {
        bail!("expected host:port, got '{}'", value);
    };
    if host.is_empty() {
        bail!("expected host:port, got '{}'", value);
    }
    let port: u16 = port
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid port in '{}'", value))?;
    Ok((host.to_string(), port))
}
