//! 有序序列归并

use crate::error::{IndexError, Result};

/// 归并两个有序序列，保留重复值
pub fn merge_sorted(a: &[i64], b: &[i64]) -> Vec<i64> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] < b[j] {
            out.push(a[i]);
            i += 1;
        } else {
            out.push(b[j]);
            j += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// 检查输入严格递增
pub fn check_strictly_increasing(keys: &[i64]) -> Result<()> {
    match keys.windows(2).position(|w| w[0] >= w[1]) {
        Some(i) => Err(IndexError::UnsortedInput { index: i + 1 }),
        None => Ok(()),
    }
}
