use std::collections::BTreeSet;
use std::sync::Arc;

use super::*;
use crate::config::{IndexConfig, SecretKeys};
use crate::IndexError;

fn secret() -> Arc<SecretKeys> {
    SecretKeys::new(b"versioned-sk0".to_vec(), b"versioned-sk1".to_vec())
}

fn config(capacity: usize) -> IndexConfig {
    IndexConfig::default()
        .with_err(2)
        .with_fanout(4)
        .with_level_errs(vec![2, 4])
        .with_chain_capacity(capacity)
}

/// 互不相同、无序的 key 序列
fn scattered_keys(n: usize) -> Vec<i64> {
    (0..n as i64).map(|i| (i * 7919) % 1009 * 3).collect()
}

fn check_version(index: &VersionedIndex, version: u64, inserted: &[i64]) {
    let oracle: BTreeSet<i64> = inserted[..version as usize].iter().copied().collect();
    let snapshot = index.snapshot(version).unwrap();
    assert_eq!(snapshot.version(), version);
    assert_eq!(
        snapshot.keys(),
        oracle.iter().copied().collect::<Vec<_>>(),
        "keys of version {}",
        version
    );

    for (low, high) in [(0, 100), (250, 1200), (i64::MIN, i64::MAX), (1500, 1501)] {
        let result = index.range_query(low, high, version).unwrap();
        let expected: Vec<i64> = oracle.range(low..high).copied().collect();
        assert_eq!(result.results(), expected, "version {} range [{}, {})", version, low, high);
        assert!(
            index.verify(low, high, &result),
            "version {} range [{}, {}) should verify",
            version,
            low,
            high
        );
    }
}

#[test]
fn test_empty_index_version_zero() {
    let index: VersionedIndex = VersionedIndex::new(config(3), secret()).unwrap();
    assert_eq!(index.current_version(), 0);

    let digest = index.digest(0).unwrap();
    assert_eq!(digest.fast, None);
    assert_eq!(digest.pending, None);
    assert!(digest.levels.is_empty());

    let result = index.range_query(0, 100, 0).unwrap();
    assert!(result.results().is_empty());
    assert!(index.verify(0, 100, &result));
}

#[test]
fn test_invalid_config_rejected() {
    let bad = IndexConfig::default().with_chain_capacity(0);
    assert!(matches!(
        VersionedIndex::<crate::Blake3Hasher>::new(bad, secret()),
        Err(IndexError::InvalidConfig(_))
    ));
}

#[test]
fn test_versions_within_first_run() {
    let keys = scattered_keys(5);
    let mut index: VersionedIndex = VersionedIndex::new(config(8), secret()).unwrap();
    for (i, &key) in keys.iter().enumerate() {
        assert_eq!(index.insert(key).unwrap(), i as u64 + 1);
    }
    for version in 0..=5 {
        check_version(&index, version, &keys);
    }
}

#[test]
fn test_capacity_one_keeps_boundaries() {
    let keys = scattered_keys(2);
    let mut index: VersionedIndex = VersionedIndex::new(config(1), secret()).unwrap();
    index.insert_batch(&keys).unwrap();

    // 版本 2 在链上，版本 1 与 0 是新旧两代慢速层的边界
    for version in 0..=2 {
        check_version(&index, version, &keys);
    }
}

#[test]
fn test_retention_window_after_flushes() {
    let keys = scattered_keys(7);
    let mut index: VersionedIndex = VersionedIndex::new(config(3), secret()).unwrap();
    index.insert_batch(&keys).unwrap();
    assert_eq!(index.current_version(), 7);
    assert_eq!(index.oldest_version(), 3);

    for version in [3, 5, 6, 7] {
        check_version(&index, version, &keys);
    }
    for version in [0, 1, 2, 4, 8] {
        assert!(
            matches!(
                index.snapshot(version),
                Err(IndexError::VersionOutOfWindow { requested, current: 7 })
                    if requested == version
            ),
            "version {} should be outside the window",
            version
        );
    }
}

#[test]
fn test_levels_carry_like_binary_counter() {
    let keys = scattered_keys(19);
    let mut index: VersionedIndex = VersionedIndex::new(config(3), secret()).unwrap();

    index.insert_batch(&keys[..7]).unwrap();
    assert_eq!(index.level_sizes(), vec![6]);

    index.insert_batch(&keys[7..13]).unwrap();
    assert_eq!(index.level_sizes(), vec![0, 12]);

    index.insert_batch(&keys[13..]).unwrap();
    assert_eq!(index.level_sizes(), vec![6, 12]);

    check_version(&index, 19, &keys);
    check_version(&index, 18, &keys);
}

#[test]
fn test_duplicate_rejected_across_components() {
    let keys = scattered_keys(10);
    let mut index: VersionedIndex = VersionedIndex::new(config(3), secret()).unwrap();
    index.insert_batch(&keys).unwrap();

    // keys[0] 已进入慢速层，keys[9] 在链上
    for key in [keys[0], keys[9]] {
        assert!(index.contains(key));
        assert!(matches!(index.insert(key), Err(IndexError::DuplicateKey(k)) if k == key));
    }
    assert_eq!(index.current_version(), 10);
}

#[test]
fn test_invalid_range_rejected() {
    let mut index: VersionedIndex = VersionedIndex::new(config(3), secret()).unwrap();
    index.insert(5).unwrap();
    assert!(matches!(
        index.range_query(10, 5, 1),
        Err(IndexError::InvalidRange { low: 10, high: 5 })
    ));
    assert!(index.range_query(10, 10, 1).unwrap().results().is_empty());
}

#[test]
fn test_tampered_results_rejected() {
    let keys = scattered_keys(11);
    let mut index: VersionedIndex = VersionedIndex::new(config(3), secret()).unwrap();
    index.insert_batch(&keys).unwrap();
    let version = index.current_version();
    let digest = index.digest(version).unwrap();
    let result = index.range_query(0, 3100, version).unwrap();
    assert!(verify_version::<crate::Blake3Hasher>(&digest, 0, 3100, &result, &secret()).is_ok());

    // 篡改快速部分的根哈希
    let mut bad_digest = digest.clone();
    if let Some(hash) = bad_digest.fast.as_mut() {
        hash[0] ^= 1;
    }
    assert!(
        verify_version::<crate::Blake3Hasher>(&bad_digest, 0, 3100, &result, &secret()).is_err()
    );

    // 丢掉一层
    let mut missing_level = result.clone();
    missing_level.levels.pop();
    assert!(!index.verify(0, 3100, &missing_level));

    // 从学习型层的结果中删掉一个 key
    let mut dropped = result.clone();
    let part = dropped
        .levels
        .iter_mut()
        .flatten()
        .next()
        .expect("a level exists after two flushes");
    let mid = part.keys.len() / 2;
    part.keys.remove(mid);
    assert!(!index.verify(0, 3100, &dropped));

    // 结果挂到了另一个版本上
    let mut relabeled = result.clone();
    relabeled.version = version - 1;
    assert!(!index.verify(0, 3100, &relabeled));

    // 错误的密钥
    let other = SecretKeys::new(b"x".to_vec(), b"y".to_vec());
    assert!(verify_version::<crate::Blake3Hasher>(&digest, 0, 3100, &result, &other).is_err());
}

#[test]
fn test_snapshots_survive_later_inserts() {
    let keys = scattered_keys(30);
    let mut index: VersionedIndex = VersionedIndex::new(config(4), secret()).unwrap();
    index.insert_batch(&keys[..10]).unwrap();
    let snapshot = index.snapshot(10).unwrap();
    let digest = snapshot.digest();

    index.insert_batch(&keys[10..]).unwrap();
    assert!(index.snapshot(10).is_err());

    let mut expected = keys[..10].to_vec();
    expected.sort_unstable();
    assert_eq!(snapshot.keys(), expected);
    let result = snapshot.range_query(i64::MIN, i64::MAX).unwrap();
    assert_eq!(result.results(), expected);
    assert!(verify_version::<crate::Blake3Hasher>(
        &digest,
        i64::MIN,
        i64::MAX,
        &result,
        &secret()
    )
    .is_ok());
}

#[test]
fn test_concurrent_snapshot_queries() {
    let keys = scattered_keys(40);
    let mut index: VersionedIndex = VersionedIndex::new(config(5), secret()).unwrap();
    index.insert_batch(&keys).unwrap();
    let snapshot = index.snapshot(index.current_version()).unwrap();
    let digest = snapshot.digest();
    let oracle: BTreeSet<i64> = keys.iter().copied().collect();

    std::thread::scope(|s| {
        for t in 0..4i64 {
            let snapshot = snapshot.clone();
            let digest = digest.clone();
            let oracle = &oracle;
            s.spawn(move || {
                let (low, high) = (t * 700, t * 700 + 900);
                let result = snapshot.range_query(low, high).unwrap();
                let expected: Vec<i64> = oracle.range(low..high).copied().collect();
                assert_eq!(result.results(), expected);
                assert!(verify_version::<crate::Blake3Hasher>(
                    &digest,
                    low,
                    high,
                    &result,
                    &secret()
                )
                .is_ok());
            });
        }
    });
}

#[test]
fn test_index_size_shares_chain_nodes() {
    let keys = scattered_keys(6);
    let mut index: VersionedIndex = VersionedIndex::new(config(8), secret()).unwrap();
    index.insert_batch(&keys).unwrap();
    let latest = index.snapshot(6).unwrap();
    let latest_size = latest.fast().map_or(0, |t| t.index_size());
    assert!(latest_size > 0);
    // 链上各版本共享未改动的节点，总量远小于各版本独立计数之和
    let naive: u64 = (1..=6)
        .map(|v| {
            index
                .snapshot(v)
                .unwrap()
                .fast()
                .map_or(0, |t| t.index_size())
        })
        .sum();
    assert!(index.index_size() <= naive);
    assert!(index.index_size() >= latest_size);
}
