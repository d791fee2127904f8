//! 线性模型与分段

use serde::{Deserialize, Serialize};

/// 线性模型：`predict(key) = floor(slope * (key - intercept))`
///
/// `intercept` 是模型直线与位置 0 相交处的 key 坐标。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub slope: f64,
    pub intercept: f64,
}

impl Model {
    #[inline]
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    /// 预测 key 的位置（可能为负或越界，由调用方截断）
    #[inline]
    pub fn predict(&self, key: i64) -> i64 {
        let pos = (self.slope * (key as f64 - self.intercept)).floor();
        if pos.is_nan() {
            0
        } else {
            // f64 -> i64 的 `as` 转换是饱和的
            pos as i64
        }
    }

    /// 查找最后一个 `<= target` 的位置
    ///
    /// 先在模型预测位置附近 `±(err + 1)` 的窗口内二分，
    /// 窗口无法确认答案时退化为整段二分，结果总是精确的。
    ///
    /// # 参数
    /// - `keys`: 该模型覆盖的严格递增 key
    /// - `target`: 查找目标
    /// - `err`: 训练该模型时使用的误差界
    ///
    /// # 返回
    /// `target` 小于所有 key 时返回 `None`
    pub fn find_left_bound(&self, keys: &[i64], target: i64, err: u32) -> Option<usize> {
        let first = *keys.first()?;
        if target < first {
            return None;
        }

        let n = keys.len() as i64;
        let pred = self.predict(target);
        let radius = err as i64 + 1;
        let lo = pred.saturating_sub(radius).clamp(0, n - 1) as usize;
        let hi = pred.saturating_add(radius + 1).clamp(0, n) as usize;

        if lo < hi && keys[lo] <= target && (hi == keys.len() || keys[hi] > target) {
            let offset = keys[lo..hi].partition_point(|&k| k <= target);
            return Some(lo + offset - 1);
        }

        Some(keys.partition_point(|&k| k <= target) - 1)
    }

    /// 判断 key 是否存在
    pub fn contains(&self, keys: &[i64], key: i64, err: u32) -> bool {
        self.find_left_bound(keys, key, err)
            .map_or(false, |idx| keys[idx] == key)
    }
}

/// 分段：一段连续的有序 key 及其满足误差界的模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub model: Model,
    pub keys: Vec<i64>,
}

impl Segment {
    #[inline]
    pub fn first_key(&self) -> Option<i64> {
        self.keys.first().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
