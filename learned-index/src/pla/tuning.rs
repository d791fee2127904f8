//! 误差界预训练
//!
//! 对数据集的每个前缀规模 n，均匀抽取 n 个代表 key，枚举误差界 err，
//! 以 `speed[segments - 1] + floor(log2(2 * err))` 作为查找速度估计，
//! 选出得分最高的 err。结果用于为慢速层挑选 `level_errs`。

use super::opt_pla::OptPla;

/// 预训练结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PretrainTable {
    /// `speed[i]`：规模 i + 1 时的最佳得分
    pub speed: Vec<u32>,
    /// `best_err[i]`：规模 i + 1 时的最佳误差界
    pub best_err: Vec<u32>,
}

impl PretrainTable {
    /// 规模 `n` 的最佳误差界，超出训练范围时沿用最大规模的结果
    pub fn err_for(&self, n: usize) -> Option<u32> {
        if self.best_err.is_empty() || n == 0 {
            return None;
        }
        let idx = (n - 1).min(self.best_err.len() - 1);
        Some(self.best_err[idx].max(1))
    }
}

/// 从有序数组中均匀抽取 `n` 个元素（取每个区间的中点）
pub fn uniform_selection(sorted: &[i64], n: usize) -> Vec<i64> {
    if n == 0 || sorted.is_empty() {
        return Vec::new();
    }
    let n = n.min(sorted.len());
    let interval = sorted.len() / n;
    let remainder = sorted.len() % n;

    (0..n)
        .map(|i| {
            let start = i * interval + i.min(remainder);
            sorted[start + interval / 2]
        })
        .collect()
}

/// 在误差界 `err` 下的分段数
pub fn segment_count(keys: &[i64], err: u32) -> usize {
    let mut pla = OptPla::new(err);
    for &key in keys {
        pla.add_key(key);
    }
    pla.segment_count()
}

/// 对每个前缀规模计算最佳误差界
///
/// 复杂度较高，只适合在小样本上离线运行。
pub fn pretrain(dataset: &[i64]) -> PretrainTable {
    let n = dataset.len();
    let mut speed = vec![0u32; n];
    let mut best_err = vec![0u32; n];
    if n == 0 {
        return PretrainTable { speed, best_err };
    }
    speed[0] = 1;

    for i in 1..n {
        let selection = uniform_selection(dataset, i + 1);
        let mut best: Option<(u32, u32)> = None;
        let mut err = 1u32;

        loop {
            let segments = segment_count(&selection, err);
            let score = speed[segments - 1] + (2 * err as u64).ilog2();
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, err));
            }
            if segments <= 1 {
                break;
            }
            err += 1;
        }

        if let Some((score, err)) = best {
            speed[i] = score;
            best_err[i] = err;
        }
    }

    PretrainTable { speed, best_err }
}
