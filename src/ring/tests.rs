#[cfg(test)]
mod tests {
    use crate::ring::hashring::{HashRing, hash_key};
    use crate::ring::types::NodeInfo;

    fn ring_of(ports: &[u16]) -> HashRing {
        let ring = HashRing::new();
        for &port in ports {
            ring.add(NodeInfo::new("127.0.0.1", port));
        }
        ring
    }

    // ============================================================
    // HASHING
    // ============================================================

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_key("alpha"), hash_key("alpha"));
        assert_eq!(hash_key("127.0.0.1:8080"), hash_key("127.0.0.1:8080"));
    }

    #[test]
    fn test_hash_distinguishes_keys() {
        // Not a collision-freedom proof, just a sanity check that the hash
        // actually varies over nearby inputs.
        let hashes: std::collections::HashSet<u32> =
            (0..1000).map(|i| hash_key(&format!("key_{}", i))).collect();
        assert!(hashes.len() > 990, "unexpected collision rate: {}", hashes.len());
    }

    #[test]
    fn test_node_hash_matches_key_hash_of_node_id() {
        // Keys and node ids share one coordinate space.
        let node = NodeInfo::new("10.0.0.1", 9000);
        assert_eq!(node.hash_value, hash_key("10.0.0.1:9000"));
    }

    // ============================================================
    // MEMBERSHIP (add / remove)
    // ============================================================

    #[test]
    fn test_add_and_len() {
        let ring = ring_of(&[8080, 8081, 8082]);
        assert_eq!(ring.len(), 3);
        assert!(!ring.is_empty());
    }

    #[test]
    fn test_duplicate_add_is_noop() {
        let ring = HashRing::new();
        ring.add(NodeInfo::new("127.0.0.1", 8080));
        ring.add(NodeInfo::new("127.0.0.1", 8080));
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let ring = ring_of(&[8080]);
        ring.remove(&NodeInfo::new("127.0.0.1", 9999));
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_remove_present() {
        let ring = ring_of(&[8080, 8081]);
        ring.remove(&NodeInfo::new("127.0.0.1", 8081));
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.all_nodes()[0].node_id, "127.0.0.1:8080");
    }

    // ============================================================
    // EMPTY-RING BEHAVIOUR
    // ============================================================

    #[test]
    fn test_empty_ring_lookups() {
        let ring = HashRing::new();
        assert!(ring.owner_of("anything").is_none());
        assert!(ring.successor("127.0.0.1:8080").is_none());
        assert!(ring.predecessor("127.0.0.1:8080").is_none());
        assert!(ring.replicas("anything", 3).is_empty());
        assert!(ring.all_nodes().is_empty());
    }

    // ============================================================
    // PLACEMENT
    // ============================================================

    #[test]
    fn test_owner_closure() {
        // ownerOf always lands on a member of a non-empty ring.
        let ring = ring_of(&[8080, 8081, 8082, 8083]);
        let ids: std::collections::HashSet<String> =
            ring.all_nodes().into_iter().map(|n| n.node_id).collect();

        for i in 0..500 {
            let owner = ring.owner_of(&format!("key_{}", i)).expect("non-empty ring");
            assert!(ids.contains(&owner.node_id));
        }
    }

    #[test]
    fn test_owner_is_clockwise_successor() {
        // Recompute the expected owner from the raw positions: smallest
        // position >= hash(key), wrapping to the smallest overall.
        let ring = ring_of(&[8080, 8081, 8082, 8083, 8084]);
        let positions = ring.positions();

        for i in 0..500 {
            let key = format!("key_{}", i);
            let h = hash_key(&key);
            let expected = positions
                .iter()
                .find(|(_, p)| *p >= h)
                .or_else(|| positions.first())
                .map(|(id, _)| id.clone())
                .unwrap();

            assert_eq!(ring.owner_of(&key).unwrap().node_id, expected, "key {}", key);
        }
    }

    #[test]
    fn test_single_node_owns_everything() {
        let ring = ring_of(&[8080]);
        for i in 0..100 {
            let owner = ring.owner_of(&format!("key_{}", i)).unwrap();
            assert_eq!(owner.node_id, "127.0.0.1:8080");
        }
    }

    // ============================================================
    // NEIGHBOURS
    // ============================================================

    #[test]
    fn test_single_entry_successor_is_self() {
        let ring = ring_of(&[8080]);
        let succ = ring.successor("127.0.0.1:8080").unwrap();
        assert_eq!(succ.node_id, "127.0.0.1:8080");
    }

    #[test]
    fn test_successor_predecessor_symmetry() {
        let ring = ring_of(&[8080, 8081, 8082, 8083]);
        for node in ring.all_nodes() {
            let succ = ring.successor(&node.node_id).unwrap();
            let back = ring.predecessor(&succ.node_id).unwrap();
            assert_eq!(back.node_id, node.node_id);

            let pred = ring.predecessor(&node.node_id).unwrap();
            let forward = ring.successor(&pred.node_id).unwrap();
            assert_eq!(forward.node_id, node.node_id);
        }
    }

    #[test]
    fn test_successor_walk_visits_every_node_once() {
        let ring = ring_of(&[8080, 8081, 8082, 8083, 8084]);
        let start = ring.all_nodes()[0].clone();

        let mut visited = vec![start.node_id.clone()];
        let mut cursor = ring.successor(&start.node_id).unwrap();
        while cursor.node_id != start.node_id {
            visited.push(cursor.node_id.clone());
            cursor = ring.successor(&cursor.node_id).unwrap();
        }

        assert_eq!(visited.len(), 5);
        let unique: std::collections::HashSet<_> = visited.iter().collect();
        assert_eq!(unique.len(), 5);
    }

    // ============================================================
    // REPLICA SETS
    // ============================================================

    #[test]
    fn test_replicas_size_and_distinctness() {
        let ring = ring_of(&[8080, 8081, 8082, 8083]);

        for rf in 1..=6 {
            let set = ring.replicas("some_key", rf);
            assert_eq!(set.len(), rf.min(4));
            let unique: std::collections::HashSet<_> =
                set.iter().map(|n| n.node_id.clone()).collect();
            assert_eq!(unique.len(), set.len());
        }
    }

    #[test]
    fn test_replicas_start_at_owner() {
        let ring = ring_of(&[8080, 8081, 8082]);
        let owner = ring.owner_of("some_key").unwrap();
        let set = ring.replicas("some_key", 2);
        assert_eq!(set[0].node_id, owner.node_id);
    }

    #[test]
    fn test_replicas_follow_successor_order() {
        let ring = ring_of(&[8080, 8081, 8082, 8083]);
        let set = ring.replicas("some_key", 4);
        for pair in set.windows(2) {
            let succ = ring.successor(&pair[0].node_id).unwrap();
            assert_eq!(succ.node_id, pair[1].node_id);
        }
    }

    // ============================================================
    // ORDERING
    // ============================================================

    #[test]
    fn test_iteration_order_is_insertion_independent() {
        let forward = ring_of(&[8080, 8081, 8082, 8083]);
        let backward = ring_of(&[8083, 8082, 8081, 8080]);

        let a: Vec<String> = forward.all_nodes().into_iter().map(|n| n.node_id).collect();
        let b: Vec<String> = backward.all_nodes().into_iter().map(|n| n.node_id).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_positions_sorted_ascending() {
        let ring = ring_of(&[8080, 8081, 8082, 8083, 8084]);
        let positions = ring.positions();
        for pair in positions.windows(2) {
            assert!(pair[0].1 < pair[1].1);
        }
    }
}
