//! 测试辅助函数

use std::collections::BTreeSet;
use std::sync::Arc;

use learned_index::{AuthenticatedIndex, SecretKeys};

/// 确定性随机数生成器（用于可重复测试）
pub struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        // xorshift 的状态不能为 0
        Self { state: seed.max(1) }
    }

    /// 生成下一个随机 u64
    pub fn next_u64(&mut self) -> u64 {
        // xorshift64
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    /// 生成 [min, max) 范围内的随机数
    pub fn next_range(&mut self, min: u64, max: u64) -> u64 {
        min + (self.next_u64() % (max - min))
    }

    /// 生成 [min, max) 范围内的随机 i64
    pub fn next_i64(&mut self, min: i64, max: i64) -> i64 {
        let span = max.wrapping_sub(min) as u64;
        min.wrapping_add((self.next_u64() % span) as i64)
    }
}

/// 固定密钥
pub fn test_secret() -> Arc<SecretKeys> {
    SecretKeys::new(b"integration-sk0".to_vec(), b"integration-sk1".to_vec())
}

/// 在 `[low, high)` 上查询并与有序集合对比，同时要求校验通过
pub fn check_range<T: AuthenticatedIndex>(index: &T, oracle: &BTreeSet<i64>, low: i64, high: i64) {
    let result = index.range_query(low, high).unwrap();
    let expected: Vec<i64> = oracle.range(low..high).copied().collect();
    assert_eq!(result.results(), expected, "range [{}, {})", low, high);
    assert!(
        index.verify(low, high, &result.proof, &result.keys),
        "range [{}, {}) should verify",
        low,
        high
    );
}

/// 随机生成若干区间并逐一检查
pub fn check_random_ranges<T: AuthenticatedIndex>(
    index: &T,
    oracle: &BTreeSet<i64>,
    rng: &mut DeterministicRng,
    rounds: usize,
    key_min: i64,
    key_max: i64,
) {
    for _ in 0..rounds {
        let a = rng.next_i64(key_min - 10, key_max + 10);
        let b = rng.next_i64(key_min - 10, key_max + 10);
        let (low, high) = if a < b { (a, b) } else { (b, a + 1) };
        check_range(index, oracle, low, high);
    }
}
