//! 边界情况测试

use std::collections::BTreeSet;

use learned_index::{
    AuthenticatedIndex, BufferedTree, IndexConfig, IndexError, LearnedTree, OptPla,
};

use crate::common::test_helpers::{check_range, test_secret};

/// 测试：极端 key 值
#[test]
fn test_extreme_keys() {
    let keys = vec![i64::MIN, -1, 0, 1, i64::MAX - 1];
    let oracle: BTreeSet<i64> = keys.iter().copied().collect();

    let learned: LearnedTree = LearnedTree::build(&keys, 1, test_secret()).unwrap();
    check_range(&learned, &oracle, i64::MIN, i64::MAX);
    check_range(&learned, &oracle, -1, 1);

    let buffered: BufferedTree =
        BufferedTree::build(&keys, &IndexConfig::default(), test_secret()).unwrap();
    check_range(&buffered, &oracle, i64::MIN, i64::MAX);
    check_range(&buffered, &oracle, 0, i64::MAX);
}

/// 测试：单个 key
#[test]
fn test_single_key() {
    let oracle: BTreeSet<i64> = [42].into_iter().collect();
    let learned: LearnedTree = LearnedTree::build(&[42], 0, test_secret()).unwrap();
    check_range(&learned, &oracle, 0, 42);
    check_range(&learned, &oracle, 42, 43);
    check_range(&learned, &oracle, 43, 100);

    let empty: BufferedTree = BufferedTree::empty(&IndexConfig::default(), test_secret());
    let buffered = empty.insert(42).unwrap();
    check_range(&buffered, &oracle, 0, 42);
    check_range(&buffered, &oracle, 42, 43);
}

/// 测试：误差为 0 时每段仍满足误差界
#[test]
fn test_zero_error_segments() {
    let keys: Vec<i64> = (0..200).map(|i| i * i).collect();
    let segments = OptPla::build(&keys, 0);
    let mut pos = 0usize;
    for seg in &segments {
        for (j, &key) in seg.keys.iter().enumerate() {
            let predicted = seg.model.predict(key);
            assert!((predicted - j as i64).abs() <= 1, "key {} at {}", key, pos + j);
        }
        pos += seg.keys.len();
    }
    assert_eq!(pos, keys.len());
}

/// 测试：非法输入
#[test]
fn test_invalid_inputs() {
    assert!(matches!(
        LearnedTree::<learned_index::Blake3Hasher>::build(&[1, 3, 2], 4, test_secret()),
        Err(IndexError::UnsortedInput { .. })
    ));
    let tree: LearnedTree = LearnedTree::build(&[1, 2, 3], 4, test_secret()).unwrap();
    assert!(matches!(tree.range_query(5, 1), Err(IndexError::InvalidRange { .. })));
    assert!(matches!(tree.insert(2), Err(IndexError::DuplicateKey(2))));
    assert!(matches!(
        IndexConfig::default().with_fanout(2).validate(),
        Err(IndexError::InvalidConfig(_))
    ));
}
