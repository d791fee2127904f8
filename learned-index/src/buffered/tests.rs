use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;

use super::*;
use crate::config::{IndexConfig, SecretKeys};
use crate::hash::Blake3Hasher;
use crate::traits::AuthenticatedIndex;
use crate::IndexError;

fn secret() -> Arc<SecretKeys> {
    SecretKeys::new(b"buffered-sk0".to_vec(), b"buffered-sk1".to_vec())
}

fn config(err: u32, fanout: usize) -> IndexConfig {
    IndexConfig::default().with_err(err).with_fanout(fanout)
}

fn curved_keys(n: i64) -> Vec<i64> {
    (0..n).map(|i| i * i * 2 + 5 * i).collect()
}

fn check_query(tree: &BufferedTree, oracle: &BTreeSet<i64>, low: i64, high: i64) {
    let result = tree.range_query(low, high).unwrap();
    let expected: Vec<i64> = oracle.range(low..high).copied().collect();
    assert_eq!(result.results(), expected, "range [{}, {})", low, high);
    assert!(
        tree.verify(low, high, &result.proof, &result.keys),
        "range [{}, {}) should verify",
        low,
        high
    );
}

#[test]
fn test_round_trip_small() {
    let mut tree: BufferedTree = BufferedTree::empty(&config(1, 32), secret());
    for key in [10, 20, 30, 40, 50] {
        tree = tree.insert(key).unwrap();
    }
    let result = tree.range_query(15, 45).unwrap();
    assert_eq!(result.results(), vec![20, 30, 40]);
    assert!(tree.verify(15, 45, &result.proof, &result.keys));
}

/// 找到第一个展开的连接叶子证明
fn first_open_leaf(vo: &mut UpperVo) -> Option<&mut crate::commitment::ChainProof> {
    match vo {
        UpperVo::Pruned(_) => None,
        UpperVo::Inner { children, .. } => children.iter_mut().find_map(first_open_leaf),
        UpperVo::Bottom { leaves, .. } => leaves.iter_mut().find_map(|leaf| match leaf {
            LeafVo::Open { proof, .. } => Some(proof),
            LeafVo::Pruned(_) => None,
        }),
    }
}

#[test]
fn test_out_of_range_chain_proof_rejected() {
    let mut tree: BufferedTree = BufferedTree::empty(&config(1, 32), secret());
    for key in [10, 20, 30, 40, 50] {
        tree = tree.insert(key).unwrap();
    }
    let result = tree.range_query(15, 45).unwrap();

    let mut forged = result.proof.clone();
    let proof = forged
        .root
        .as_mut()
        .and_then(first_open_leaf)
        .expect("query opens at least one leaf");
    proof.start = 0;
    proof.end = u32::MAX;
    assert!(!tree.verify(15, 45, &forged, &result.keys));
    assert!(matches!(
        tree.verify_detailed(15, 45, &forged, &result.keys),
        Err(IndexError::VerificationFailure(_))
    ));
}

#[test]
fn test_empty_tree() {
    let tree: BufferedTree = BufferedTree::build(&[], &IndexConfig::default(), secret()).unwrap();
    assert!(tree.is_empty());
    assert!(!tree.contains(1));
    let result = tree.range_query(-5, 5).unwrap();
    assert!(result.keys.is_empty());
    assert!(tree.verify(-5, 5, &result.proof, &result.keys));
    assert!(!tree.verify(-5, 5, &result.proof, &[1]));
}

#[test]
fn test_build_validates_input_and_config() {
    assert!(matches!(
        BufferedTree::<Blake3Hasher>::build(&[3, 2], &IndexConfig::default(), secret()),
        Err(IndexError::UnsortedInput { index: 1 })
    ));
    assert!(matches!(
        BufferedTree::<Blake3Hasher>::build(&[1, 2], &config(4, 1), secret()),
        Err(IndexError::InvalidConfig(_))
    ));
}

#[test]
fn test_built_tree_queries() {
    let keys = curved_keys(3000);
    let oracle: BTreeSet<i64> = keys.iter().copied().collect();
    let tree: BufferedTree = BufferedTree::build(&keys, &config(2, 4), secret()).unwrap();
    assert!(tree.leaf_count() > 4, "expected several connected leaves");
    assert_eq!(tree.keys(), keys);

    for &(low, high) in &[(-10, 0), (0, 1), (100, 5000), (40_000, 900_000), (i64::MIN, i64::MAX)] {
        check_query(&tree, &oracle, low, high);
    }
}

#[test]
fn test_empty_range_verifies_without_keys() {
    let keys = curved_keys(200);
    let tree: BufferedTree = BufferedTree::build(&keys, &config(2, 4), secret()).unwrap();
    let result = tree.range_query(500, 500).unwrap();
    assert!(result.results().is_empty());
    assert!(tree.verify(500, 500, &result.proof, &result.keys));
}

#[test]
fn test_buffer_absorbs_inserts_before_retrain() {
    // 10 个模型 key，buf_rate 0.3 时缓冲容量为 3
    let keys: Vec<i64> = (0..10).map(|i| i * 100).collect();
    let tree: BufferedTree = BufferedTree::build(&keys, &config(1, 8), secret()).unwrap();
    assert_eq!(tree.leaf_count(), 1);
    let old_model = tree.leaves()[0].model().model;

    let mut t = tree.clone();
    for key in [150, 250, 350] {
        t = t.insert(key).unwrap();
        let leaves = t.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].model_keys(), keys.as_slice());
    }
    assert_eq!(t.leaves()[0].buffer_len(), 3);

    // 第 4 个 key 触发重训练
    let t = t.insert(450).unwrap();
    let leaves = t.leaves();
    assert!(leaves.iter().all(|l| l.buffer_len() == 0));
    assert!(leaves.len() > 1 || leaves[0].model().model != old_model);
    assert_eq!(t.len(), 14);

    let oracle: BTreeSet<i64> = t.keys().into_iter().collect();
    assert_eq!(oracle.len(), 14);
    check_query(&t, &oracle, 120, 460);
    check_query(&tree, &keys.iter().copied().collect(), 120, 460);
}

#[test]
fn test_queries_cover_buffer_keys() {
    let keys: Vec<i64> = (0..400).map(|i| i * 50).collect();
    let mut tree: BufferedTree = BufferedTree::build(&keys, &config(8, 4), secret()).unwrap();
    let mut oracle: BTreeSet<i64> = keys.iter().copied().collect();

    for i in 0..60 {
        let key = i * 331 % 20_000 + 1;
        if oracle.insert(key) {
            tree = tree.insert(key).unwrap();
        }
    }
    assert!(tree.leaves().iter().any(|l| l.buffer_len() > 0));

    for &(low, high) in &[(0, 20_000), (1, 2), (3_000, 3_400), (19_999, 30_000)] {
        check_query(&tree, &oracle, low, high);
    }
}

#[test]
fn test_dropped_buffer_key_rejected() {
    let keys: Vec<i64> = (0..100).map(|i| i * 10).collect();
    let mut tree: BufferedTree = BufferedTree::build(&keys, &config(4, 4), secret()).unwrap();
    tree = tree.insert(55).unwrap();
    tree = tree.insert(57).unwrap();
    assert!(tree.leaves().iter().any(|l| l.buffer_len() > 0));

    let result = tree.range_query(50, 60).unwrap();
    assert_eq!(result.results(), vec![50, 55, 57]);

    let claimed: Vec<i64> = result.keys.iter().copied().filter(|&k| k != 55).collect();
    assert!(!tree.verify(50, 60, &result.proof, &claimed));
}

#[test]
fn test_pruning_intersecting_leaf_rejected() {
    let keys = curved_keys(2000);
    let tree: BufferedTree = BufferedTree::build(&keys, &config(1, 4), secret()).unwrap();
    let narrow = tree.range_query(0, 10).unwrap();

    // 用窄区间的证明冒充宽区间：被裁剪的兄弟与宽区间相交
    assert!(!tree.verify(0, 100_000, &narrow.proof, &narrow.keys));
}

#[test]
fn test_insert_duplicate_rejected() {
    let tree: BufferedTree = BufferedTree::build(&[1, 2, 3], &config(1, 4), secret()).unwrap();
    let tree = tree.insert(10).unwrap();
    assert_eq!(tree.insert(2).unwrap_err(), IndexError::DuplicateKey(2));
    assert_eq!(tree.insert(10).unwrap_err(), IndexError::DuplicateKey(10));
}

#[test]
fn test_insert_is_persistent() {
    let keys: Vec<i64> = (0..300).map(|i| i * 3).collect();
    let old: BufferedTree = BufferedTree::build(&keys, &config(2, 4), secret()).unwrap();
    let old_result = old.range_query(100, 200).unwrap();
    let new = old.insert(101).unwrap();

    assert!(new.contains(101));
    assert!(!old.contains(101));
    assert!(old.verify(100, 200, &old_result.proof, &old_result.keys));
    assert!(!new.verify(100, 200, &old_result.proof, &old_result.keys));
    assert_ne!(old.root_hash(), new.root_hash());
}

#[test]
fn test_upper_split_keeps_tree_valid() {
    // err 0 且扇出 3：重训练不断产生新叶子，迫使上层节点分裂
    let cfg = IndexConfig::default()
        .with_err(0)
        .with_fanout(3)
        .with_buf_rate(0.0);
    let mut tree: BufferedTree = BufferedTree::empty(&cfg, secret());
    let mut oracle = BTreeSet::new();
    for i in 0..300i64 {
        let key = (i * i * 7919) % 100_003;
        if oracle.insert(key) {
            tree = tree.insert(key).unwrap();
        }
    }
    assert_eq!(tree.keys(), oracle.iter().copied().collect::<Vec<_>>());
    for &(low, high) in &[(0, 100_003), (5_000, 6_000), (99_000, 99_500)] {
        check_query(&tree, &oracle, low, high);
    }
}

#[test]
fn test_index_size_shares_nodes() {
    let keys = curved_keys(2000);
    let old: BufferedTree = BufferedTree::build(&keys, &config(2, 8), secret()).unwrap();
    let new = old.insert(3).unwrap();

    let mut tracker = crate::size::SizeTracker::new();
    old.accumulate_size(&mut tracker);
    new.accumulate_size(&mut tracker);
    assert!(tracker.bytes() < 2 * old.index_size());
    assert!(old.index_size() > 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_inserts_query_and_verify(
        initial in prop::collection::btree_set(0i64..20_000, 0..300),
        extra in prop::collection::vec(0i64..20_000, 0..120),
        fanout in 3usize..9,
        err in 0u32..6,
        low in -100i64..20_100,
        width in 0i64..8_000,
    ) {
        let cfg = IndexConfig::default().with_err(err).with_fanout(fanout);
        let keys: Vec<i64> = initial.iter().copied().collect();
        let mut tree: BufferedTree = BufferedTree::build(&keys, &cfg, secret()).unwrap();
        let mut oracle = initial;
        for k in extra {
            match tree.insert(k) {
                Ok(next) => {
                    prop_assert!(oracle.insert(k));
                    tree = next;
                }
                Err(IndexError::DuplicateKey(d)) => prop_assert!(oracle.contains(&d)),
                Err(e) => return Err(TestCaseError::fail(e.to_string())),
            }
        }

        let high = low + width;
        let result = tree.range_query(low, high).unwrap();
        let expected: Vec<i64> = oracle.range(low..high).copied().collect();
        prop_assert_eq!(result.results(), expected);
        prop_assert!(tree.verify(low, high, &result.proof, &result.keys));
        prop_assert_eq!(tree.len(), oracle.len());
    }

    #[test]
    fn prop_flipped_claim_rejected(
        raw in prop::collection::btree_set(0i64..10_000, 2..200),
        extra in prop::collection::vec(0i64..10_000, 0..30),
        low in 0i64..10_000,
        width in 1i64..3_000,
        pick in any::<prop::sample::Index>(),
    ) {
        let keys: Vec<i64> = raw.into_iter().collect();
        let mut tree: BufferedTree =
            BufferedTree::build(&keys, &IndexConfig::default().with_err(3).with_fanout(4), secret())
                .unwrap();
        for k in extra {
            if let Ok(next) = tree.insert(k) {
                tree = next;
            }
        }
        let result = tree.range_query(low, low + width).unwrap();
        prop_assume!(!result.keys.is_empty());
        let mut claimed = result.keys.clone();
        let i = pick.index(claimed.len());
        claimed[i] = claimed[i].wrapping_add(1);
        prop_assert!(!tree.verify(low, low + width, &result.proof, &claimed));
    }
}
