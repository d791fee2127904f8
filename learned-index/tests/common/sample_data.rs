//! 测试样本数据：几种典型 key 分布

use std::collections::BTreeSet;

use super::DeterministicRng;

/// 等间距 key
pub fn get_sequential_keys(count: usize, step: i64) -> Vec<i64> {
    (0..count as i64).map(|i| i * step).collect()
}

/// 互不相同的随机 key（确定性），按生成顺序返回
pub fn get_random_keys(count: usize, seed: u64, max: i64) -> Vec<i64> {
    let mut rng = DeterministicRng::new(seed);
    let mut seen = BTreeSet::new();
    let mut keys = Vec::with_capacity(count);
    while keys.len() < count {
        let key = rng.next_i64(0, max);
        if seen.insert(key) {
            keys.push(key);
        }
    }
    keys
}

/// 成簇分布：簇内稠密、簇间间隔很大，分段数明显多于均匀分布
pub fn get_clustered_keys(clusters: usize, per_cluster: usize, seed: u64) -> Vec<i64> {
    let mut rng = DeterministicRng::new(seed);
    let mut keys = BTreeSet::new();
    for c in 0..clusters as i64 {
        let base = c * 1_000_000 + rng.next_i64(0, 1000);
        let mut key = base;
        for _ in 0..per_cluster {
            key += rng.next_i64(1, 8);
            keys.insert(key);
        }
    }
    keys.into_iter().collect()
}

/// 排序后的副本
pub fn sorted(keys: &[i64]) -> Vec<i64> {
    let mut sorted = keys.to_vec();
    sorted.sort_unstable();
    sorted
}
