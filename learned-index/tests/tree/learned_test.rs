//! 查询优化树测试

use std::collections::BTreeSet;

use learned_index::{AuthenticatedIndex, Keccak256Hasher, LearnedTree, QueryResult};

use crate::common::sample_data::{get_clustered_keys, get_random_keys, get_sequential_keys, sorted};
use crate::common::test_helpers::{check_random_ranges, check_range, test_secret};
use crate::common::DeterministicRng;

/// 测试：顺序 key 批量构建后区间查询
#[test]
fn test_sequential_build_and_query() {
    let keys = get_sequential_keys(2000, 3);
    let tree: LearnedTree = LearnedTree::build(&keys, 8, test_secret()).unwrap();
    let oracle: BTreeSet<i64> = keys.iter().copied().collect();

    // 等间距 key 一条直线就能覆盖
    assert_eq!(tree.leaf_count(), 1);
    check_range(&tree, &oracle, 300, 3300);
    check_range(&tree, &oracle, -100, 1);
    check_range(&tree, &oracle, 5999, 7000);
}

/// 测试：随机 key 批量构建，多层树
#[test]
fn test_random_build_and_query() {
    let keys = sorted(&get_random_keys(5000, 12345, 1_000_000));
    let tree: LearnedTree = LearnedTree::build(&keys, 4, test_secret()).unwrap();
    let oracle: BTreeSet<i64> = keys.iter().copied().collect();
    assert!(tree.height() >= 2);
    assert_eq!(tree.len(), 5000);
    assert_eq!(tree.keys(), keys);

    let mut rng = DeterministicRng::new(777);
    check_random_ranges(&tree, &oracle, &mut rng, 50, 0, 1_000_000);
}

/// 测试：成簇 key，批量查询
#[test]
fn test_clustered_batch_query() {
    let keys = get_clustered_keys(20, 200, 99);
    let tree: LearnedTree = LearnedTree::build(&keys, 2, test_secret()).unwrap();
    let oracle: BTreeSet<i64> = keys.iter().copied().collect();

    let ranges: Vec<(i64, i64)> = (0..20)
        .map(|c| (c * 1_000_000 + 500, c * 1_000_000 + 1500))
        .collect();
    let results: Vec<QueryResult<_>> = tree.range_query_batch(&ranges).unwrap();
    for (&(low, high), result) in ranges.iter().zip(&results) {
        let expected: Vec<i64> = oracle.range(low..high).copied().collect();
        assert_eq!(result.results(), expected);
        assert!(tree.verify(low, high, &result.proof, &result.keys));
    }
}

/// 测试：随机顺序逐个插入
#[test]
fn test_random_inserts() {
    let keys = get_random_keys(600, 4242, 50_000);
    let mut tree: LearnedTree = LearnedTree::empty(4, test_secret());
    let mut oracle = BTreeSet::new();
    for (i, &key) in keys.iter().enumerate() {
        tree = tree.insert(key).unwrap();
        oracle.insert(key);
        if i % 100 == 99 {
            check_range(&tree, &oracle, 0, 50_000);
        }
    }
    let mut rng = DeterministicRng::new(31);
    check_random_ranges(&tree, &oracle, &mut rng, 30, 0, 50_000);
}

/// 测试：VO 编码后可在另一端解码并校验
#[test]
fn test_proof_survives_encoding() {
    let keys = get_sequential_keys(500, 7);
    let tree: LearnedTree<Keccak256Hasher> = LearnedTree::build(&keys, 4, test_secret()).unwrap();
    let result = tree.range_query(700, 1400).unwrap();
    let bytes = result.proof_bytes().unwrap();
    assert_eq!(bytes.len() as u64, result.vo_size());

    let decoded = QueryResult::<learned_index::LearnedProof>::decode_proof(&bytes).unwrap();
    assert!(tree.verify(700, 1400, &decoded, &result.keys));
}
