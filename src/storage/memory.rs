use std::collections::HashMap;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::ring::hash_key;

/// Default replication factor when the configured value is invalid.
const DEFAULT_REPLICATION_FACTOR: usize = 2;

/// In-memory storage for the primary tier and `R-1` replica tiers.
///
/// Replica level 0 is reserved: the primary tier is its logical equivalent
/// and level 0 is never materialised. Levels `1 ..= R-1` are allocated (empty)
/// at construction; writes addressed to any other level are dropped with a
/// warning. Each tier is individually safe for concurrent per-entry mutation;
/// bulk operations are atomic per key, not across the whole tier.
pub struct DataStore {
    replication_factor: usize,
    primary: DashMap<String, String>,
    /// Replica level `i` lives at index `i - 1`.
    replicas: Vec<DashMap<String, String>>,
}

impl DataStore {
    pub fn new(replication_factor: usize) -> Self {
        let replication_factor = if replication_factor < 1 {
            warn!(
                "Invalid replication factor {}, defaulting to {}",
                replication_factor, DEFAULT_REPLICATION_FACTOR
            );
            DEFAULT_REPLICATION_FACTOR
        } else {
            replication_factor
        };

        let replicas = (1..replication_factor).map(|_| DashMap::new()).collect();
        debug!(
            "Storage initialised with replication factor {} ({} replica levels)",
            replication_factor,
            replication_factor - 1
        );

        Self {
            replication_factor,
            primary: DashMap::new(),
            replicas,
        }
    }

    pub fn replication_factor(&self) -> usize {
        self.replication_factor
    }

    fn tier(&self, level: usize) -> Option<&DashMap<String, String>> {
        if level >= 1 && level < self.replication_factor {
            self.replicas.get(level - 1)
        } else {
            None
        }
    }

    // --- Primary tier ---

    pub fn put_primary(&self, key: impl Into<String>, value: impl Into<String>) {
        self.primary.insert(key.into(), value.into());
    }

    pub fn put_all_primary(&self, data: HashMap<String, String>) {
        let count = data.len();
        for (key, value) in data {
            self.primary.insert(key, value);
        }
        debug!("Added {} entries to primary data", count);
    }

    pub fn get_primary(&self, key: &str) -> Option<String> {
        self.primary.get(key).map(|entry| entry.value().clone())
    }

    /// Removes a primary entry, reporting whether it existed.
    pub fn delete_primary(&self, key: &str) -> bool {
        self.primary.remove(key).is_some()
    }

    pub fn primary_len(&self) -> usize {
        self.primary.len()
    }

    pub fn primary_snapshot(&self) -> HashMap<String, String> {
        self.primary
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    // --- Replica tiers ---

    pub fn put_replica(&self, level: usize, key: impl Into<String>, value: impl Into<String>) {
        match self.tier(level) {
            Some(tier) => {
                tier.insert(key.into(), value.into());
            }
            None => {
                warn!("Replica level {} not allocated, dropping write for key {}", level, key.into());
            }
        }
    }

    pub fn put_bulk_replica(&self, level: usize, data: HashMap<String, String>) {
        match self.tier(level) {
            Some(tier) => {
                let count = data.len();
                for (key, value) in data {
                    tier.insert(key, value);
                }
                debug!("Merged {} entries into replica level {}", count, level);
            }
            None => {
                warn!("Replica level {} not allocated, dropping bulk write of {} entries", level, data.len());
            }
        }
    }

    pub fn get_replica(&self, level: usize, key: &str) -> Option<String> {
        self.tier(level)?.get(key).map(|entry| entry.value().clone())
    }

    /// Removes a replica entry; `false` when the key or the level is absent.
    pub fn delete_replica(&self, level: usize, key: &str) -> bool {
        match self.tier(level) {
            Some(tier) => tier.remove(key).is_some(),
            None => {
                warn!("Replica level {} not allocated, cannot delete key {}", level, key);
                false
            }
        }
    }

    pub fn replica_len(&self, level: usize) -> usize {
        self.tier(level).map(|tier| tier.len()).unwrap_or(0)
    }

    pub fn replica_snapshot(&self, level: usize) -> HashMap<String, String> {
        self.tier(level)
            .map(|tier| {
                tier.iter()
                    .map(|entry| (entry.key().clone(), entry.value().clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Snapshot of every allocated replica tier, keyed by level.
    pub fn all_replica_snapshots(&self) -> HashMap<usize, HashMap<String, String>> {
        (1..self.replication_factor)
            .map(|level| (level, self.replica_snapshot(level)))
            .collect()
    }

    // --- Rebalance primitives ---

    /// Removes from the primary tier every key whose hash falls in the
    /// inclusive interval `[lo, hi]` and returns those entries. `lo > hi`
    /// denotes the wrapped interval `[lo, MAX] ∪ [0, hi]`. Atomic per key;
    /// concurrent puts may race the scan, which the caller tolerates by
    /// holding the rebalance flag.
    pub fn extract_range(&self, lo: u32, hi: u32) -> HashMap<String, String> {
        let candidates: Vec<String> = self
            .primary
            .iter()
            .filter(|entry| in_range(hash_key(entry.key()), lo, hi))
            .map(|entry| entry.key().clone())
            .collect();

        let mut extracted = HashMap::new();
        for key in candidates {
            if let Some((key, value)) = self.primary.remove(&key) {
                extracted.insert(key, value);
            }
        }

        debug!("Extracted {} keys from primary in range {}-{}", extracted.len(), lo, hi);
        extracted
    }

    /// Drains replica tier `level` entirely and returns its contents.
    pub fn extract_replica(&self, level: usize) -> HashMap<String, String> {
        let Some(tier) = self.tier(level) else {
            warn!("Replica level {} not allocated, nothing to extract", level);
            return HashMap::new();
        };

        let extracted: HashMap<String, String> = tier
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        tier.clear();

        debug!("Extracted {} keys from replica level {}", extracted.len(), level);
        extracted
    }

    /// Moves replica tier `level` into the primary tier and returns the tier
    /// snapshot. Keys already present in primary keep their primary value.
    /// A second call right after the first returns an empty map.
    pub fn promote_replica_to_primary(&self, level: usize) -> HashMap<String, String> {
        let Some(tier) = self.tier(level) else {
            warn!("Replica level {} not allocated, nothing to promote", level);
            return HashMap::new();
        };

        let snapshot: HashMap<String, String> = tier
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        if snapshot.is_empty() {
            debug!("No data at replica level {} to promote", level);
            return snapshot;
        }

        for (key, value) in &snapshot {
            self.primary
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        tier.clear();

        debug!("Promoted {} entries from replica level {} to primary", snapshot.len(), level);
        snapshot
    }
}

/// Inclusive hash-interval membership with wrap-around.
fn in_range(hash: u32, lo: u32, hi: u32) -> bool {
    if lo <= hi {
        hash >= lo && hash <= hi
    } else {
        hash >= lo || hash <= hi
    }
}
