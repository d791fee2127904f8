//! 更新优化树测试

use std::collections::BTreeSet;

use learned_index::{AuthenticatedIndex, BufferedTree, IndexConfig};

use crate::common::sample_data::{get_clustered_keys, get_random_keys, sorted};
use crate::common::test_helpers::{check_random_ranges, check_range, test_secret};
use crate::common::DeterministicRng;

fn config() -> IndexConfig {
    IndexConfig::default().with_err(4).with_fanout(8).with_buf_rate(0.3)
}

/// 测试：批量构建后继续插入
#[test]
fn test_build_then_insert() {
    let initial = sorted(&get_random_keys(1000, 1, 100_000));
    let mut tree: BufferedTree = BufferedTree::build(&initial, &config(), test_secret()).unwrap();
    let mut oracle: BTreeSet<i64> = initial.iter().copied().collect();

    let extra: Vec<i64> = get_random_keys(1500, 2, 100_000)
        .into_iter()
        .filter(|k| !oracle.contains(k))
        .take(400)
        .collect();
    for &key in &extra {
        tree = tree.insert(key).unwrap();
        oracle.insert(key);
    }
    assert_eq!(tree.len(), oracle.len());
    assert_eq!(tree.keys(), oracle.iter().copied().collect::<Vec<_>>());

    let mut rng = DeterministicRng::new(5);
    check_random_ranges(&tree, &oracle, &mut rng, 40, 0, 100_000);
}

/// 测试：成簇 key 从空树逐个插入，缓冲反复溢出重训练
#[test]
fn test_clustered_inserts() {
    let keys = get_clustered_keys(5, 120, 17);
    let mut tree: BufferedTree = BufferedTree::empty(&config(), test_secret());
    let mut oracle = BTreeSet::new();
    for &key in keys.iter().rev() {
        tree = tree.insert(key).unwrap();
        oracle.insert(key);
    }
    assert!(tree.leaf_count() >= 1);
    for c in 0..5 {
        check_range(&tree, &oracle, c * 1_000_000, c * 1_000_000 + 600);
    }
    check_range(&tree, &oracle, i64::MIN, i64::MAX);
}

/// 测试：旧版本在后续插入后保持不变
#[test]
fn test_old_roots_remain_valid() {
    let keys = get_random_keys(300, 8, 10_000);
    let mut trees = vec![BufferedTree::<learned_index::Blake3Hasher>::empty(
        &config(),
        test_secret(),
    )];
    for &key in &keys {
        let next = trees.last().unwrap().insert(key).unwrap();
        trees.push(next);
    }
    for (n, tree) in trees.iter().enumerate().step_by(50) {
        let oracle: BTreeSet<i64> = keys[..n].iter().copied().collect();
        check_range(tree, &oracle, 0, 10_000);
    }
}
