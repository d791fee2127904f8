//! 多版本索引测试

use std::collections::BTreeSet;

use learned_index::{IndexConfig, IndexError, Verifier, VersionedIndex};

use crate::common::sample_data::get_random_keys;
use crate::common::test_helpers::test_secret;
use crate::common::DeterministicRng;

/// 测试：长序列插入，窗口内每个版本都能查询并校验
#[test]
fn test_long_history() {
    let keys = get_random_keys(200, 2024, 1_000_000);
    let config = IndexConfig::default()
        .with_err(4)
        .with_fanout(8)
        .with_level_errs(vec![4, 8, 16])
        .with_chain_capacity(16);
    let mut index: VersionedIndex = VersionedIndex::new(config, test_secret()).unwrap();
    index.insert_batch(&keys).unwrap();
    assert_eq!(index.current_version(), 200);
    // 200 = 12 轮满 + 8，已吸收 12 轮：待合并树为空，第 2、3 层各一棵
    assert_eq!(index.level_sizes(), vec![0, 64, 128]);

    let verifier: Verifier = Verifier::new(test_secret());
    let mut rng = DeterministicRng::new(9);
    let oldest = index.oldest_version();
    for version in oldest..=200 {
        let snapshot = match index.snapshot(version) {
            Ok(snapshot) => snapshot,
            Err(IndexError::VersionOutOfWindow { .. }) => continue,
            Err(e) => panic!("unexpected error: {}", e),
        };
        let oracle: BTreeSet<i64> = keys[..version as usize].iter().copied().collect();
        assert_eq!(snapshot.len(), oracle.len());

        let low = rng.next_i64(0, 900_000);
        let high = low + 100_000;
        let result = snapshot.range_query(low, high).unwrap();
        let expected: Vec<i64> = oracle.range(low..high).copied().collect();
        assert_eq!(result.results(), expected, "version {}", version);
        assert!(verifier.verify_version(&snapshot.digest(), &result));
    }
}

/// 测试：版本摘要可以序列化后交给客户端
#[test]
fn test_digest_encoding() {
    let mut index: VersionedIndex =
        VersionedIndex::new(IndexConfig::default().with_chain_capacity(4), test_secret()).unwrap();
    index.insert_batch(&get_random_keys(10, 3, 1000)).unwrap();
    let digest = index.digest(10).unwrap();
    let bytes = learned_index::codec::to_bytes(&digest).unwrap();
    let decoded: learned_index::VersionDigest = learned_index::codec::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, digest);

    let result = index.range_query(0, 1000, 10).unwrap();
    assert_eq!(result.results().len(), 10);
    let verifier: Verifier = Verifier::new(test_secret());
    assert!(verifier.verify_version(&decoded, &result));
}
