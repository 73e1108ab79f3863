#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::ring::hash_key;
    use crate::storage::memory::DataStore;

    fn entries(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // ============================================================
    // PRIMARY TIER
    // ============================================================

    #[test]
    fn test_primary_put_get_delete() {
        let store = DataStore::new(2);

        store.put_primary("x", "1");
        assert_eq!(store.get_primary("x"), Some("1".to_string()));

        assert!(store.delete_primary("x"));
        assert_eq!(store.get_primary("x"), None);
        assert!(!store.delete_primary("x"), "second delete reports absence");
    }

    #[test]
    fn test_primary_overwrite_is_last_writer_wins() {
        let store = DataStore::new(2);
        store.put_primary("x", "old");
        store.put_primary("x", "new");
        assert_eq!(store.get_primary("x"), Some("new".to_string()));
    }

    #[test]
    fn test_put_all_primary_merges() {
        let store = DataStore::new(2);
        store.put_primary("a", "1");
        store.put_all_primary(entries(&[("a", "overwritten"), ("b", "2")]));

        assert_eq!(store.get_primary("a"), Some("overwritten".to_string()));
        assert_eq!(store.get_primary("b"), Some("2".to_string()));
        assert_eq!(store.primary_len(), 2);
    }

    // ============================================================
    // REPLICA TIERS
    // ============================================================

    #[test]
    fn test_invalid_replication_factor_defaults_to_two() {
        let store = DataStore::new(0);
        assert_eq!(store.replication_factor(), 2);
        store.put_replica(1, "x", "1");
        assert_eq!(store.get_replica(1, "x"), Some("1".to_string()));
    }

    #[test]
    fn test_replica_levels_are_allocated_up_to_factor() {
        let store = DataStore::new(3);

        store.put_replica(1, "a", "1");
        store.put_replica(2, "b", "2");
        assert_eq!(store.get_replica(1, "a"), Some("1".to_string()));
        assert_eq!(store.get_replica(2, "b"), Some("2".to_string()));

        // Level 0 is reserved and level R is out of range: both drop writes.
        store.put_replica(0, "c", "3");
        store.put_replica(3, "d", "4");
        assert_eq!(store.get_replica(0, "c"), None);
        assert_eq!(store.get_replica(3, "d"), None);
    }

    #[test]
    fn test_replica_tiers_do_not_touch_primary() {
        let store = DataStore::new(3);
        store.put_replica(1, "x", "replica");
        assert_eq!(store.get_primary("x"), None);

        store.put_primary("x", "primary");
        assert_eq!(store.get_replica(1, "x"), Some("replica".to_string()));
        assert_eq!(store.get_primary("x"), Some("primary".to_string()));
    }

    #[test]
    fn test_delete_replica_on_unallocated_level_is_false() {
        let store = DataStore::new(2);
        assert!(!store.delete_replica(0, "x"));
        assert!(!store.delete_replica(5, "x"));
    }

    #[test]
    fn test_bulk_replica_merge() {
        let store = DataStore::new(2);
        store.put_replica(1, "keep", "old");
        store.put_bulk_replica(1, entries(&[("keep", "new"), ("add", "1")]));

        assert_eq!(store.get_replica(1, "keep"), Some("new".to_string()));
        assert_eq!(store.get_replica(1, "add"), Some("1".to_string()));
        assert_eq!(store.replica_len(1), 2);
    }

    #[test]
    fn test_bulk_replica_to_unallocated_level_is_dropped() {
        let store = DataStore::new(1);
        store.put_bulk_replica(1, entries(&[("a", "1")]));
        assert_eq!(store.replica_len(1), 0);
    }

    // ============================================================
    // RANGE EXTRACTION
    // ============================================================

    #[test]
    fn test_extract_range_partitions_primary() {
        // Union of leftovers and extraction equals the original set, the
        // intersection is empty, and membership matches the hash predicate.
        let store = DataStore::new(2);
        let mut original = HashMap::new();
        for i in 0..200 {
            let key = format!("key_{}", i);
            store.put_primary(key.as_str(), "v");
            original.insert(key, "v".to_string());
        }

        let (lo, hi) = (0x4000_0000u32, 0xBFFF_FFFFu32);
        let extracted = store.extract_range(lo, hi);
        let remaining = store.primary_snapshot();

        assert_eq!(extracted.len() + remaining.len(), original.len());
        for key in extracted.keys() {
            let h = hash_key(key);
            assert!(h >= lo && h <= hi, "extracted key {} outside range", key);
            assert!(!remaining.contains_key(key));
        }
        for key in remaining.keys() {
            let h = hash_key(key);
            assert!(h < lo || h > hi, "remaining key {} inside range", key);
        }

        let mut union = remaining;
        union.extend(extracted);
        assert_eq!(union, original);
    }

    #[test]
    fn test_extract_range_wraps_around() {
        let store = DataStore::new(2);
        for i in 0..200 {
            store.put_primary(format!("key_{}", i), "v");
        }

        // lo > hi selects [lo, MAX] and [0, hi].
        let (lo, hi) = (0xC000_0000u32, 0x3FFF_FFFFu32);
        let extracted = store.extract_range(lo, hi);
        assert!(!extracted.is_empty());

        for key in extracted.keys() {
            let h = hash_key(key);
            assert!(h >= lo || h <= hi, "key {} outside wrapped range", key);
        }
        for key in store.primary_snapshot().keys() {
            let h = hash_key(key);
            assert!(h < lo && h > hi, "key {} should have been extracted", key);
        }
    }

    #[test]
    fn test_extract_full_range_drains_primary() {
        let store = DataStore::new(2);
        for i in 0..50 {
            store.put_primary(format!("key_{}", i), "v");
        }

        let extracted = store.extract_range(0, u32::MAX);
        assert_eq!(extracted.len(), 50);
        assert_eq!(store.primary_len(), 0);
    }

    // ============================================================
    // TIER DRAIN & PROMOTION
    // ============================================================

    #[test]
    fn test_extract_replica_drains_tier() {
        let store = DataStore::new(2);
        store.put_bulk_replica(1, entries(&[("a", "1"), ("b", "2")]));

        let drained = store.extract_replica(1);
        assert_eq!(drained.len(), 2);
        assert_eq!(store.replica_len(1), 0);

        assert!(store.extract_replica(1).is_empty());
        assert!(store.extract_replica(0).is_empty(), "reserved level yields nothing");
    }

    #[test]
    fn test_promotion_moves_replica_into_primary() {
        let store = DataStore::new(2);
        store.put_bulk_replica(1, entries(&[("a", "1"), ("b", "2")]));

        let promoted = store.promote_replica_to_primary(1);
        assert_eq!(promoted, entries(&[("a", "1"), ("b", "2")]));
        assert_eq!(store.get_primary("a"), Some("1".to_string()));
        assert_eq!(store.get_primary("b"), Some("2".to_string()));
        assert_eq!(store.replica_len(1), 0);
    }

    #[test]
    fn test_promotion_keeps_existing_primary_values() {
        let store = DataStore::new(2);
        store.put_primary("a", "primary");
        store.put_bulk_replica(1, entries(&[("a", "stale"), ("b", "2")]));

        let promoted = store.promote_replica_to_primary(1);
        // The snapshot reports everything the tier held...
        assert_eq!(promoted.len(), 2);
        // ...but a key already in primary keeps the primary value.
        assert_eq!(store.get_primary("a"), Some("primary".to_string()));
        assert_eq!(store.get_primary("b"), Some("2".to_string()));
    }

    #[test]
    fn test_promotion_is_idempotent() {
        let store = DataStore::new(2);
        store.put_bulk_replica(1, entries(&[("a", "1")]));

        store.promote_replica_to_primary(1);
        let before = store.primary_snapshot();

        let second = store.promote_replica_to_primary(1);
        assert!(second.is_empty());
        assert_eq!(store.primary_snapshot(), before);
    }

    // ============================================================
    // SNAPSHOTS
    // ============================================================

    #[test]
    fn test_all_replica_snapshots_cover_every_level() {
        let store = DataStore::new(4);
        store.put_replica(1, "a", "1");
        store.put_replica(3, "c", "3");

        let snapshots = store.all_replica_snapshots();
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[&1], entries(&[("a", "1")]));
        assert!(snapshots[&2].is_empty());
        assert_eq!(snapshots[&3], entries(&[("c", "3")]));
    }
}
