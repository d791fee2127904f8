//! 索引大小统计
//!
//! 持久化更新后新旧版本共享大量节点，同一个 `Arc` 只计一次。

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::codec::encoded_size;

/// 按 `Arc` 地址去重的大小累加器
#[derive(Debug, Default)]
pub struct SizeTracker {
    seen: HashSet<usize>,
    bytes: u64,
}

impl SizeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 首次访问该节点时返回 true
    #[inline]
    pub fn first_visit<T>(&mut self, node: &Arc<T>) -> bool {
        self.seen.insert(Arc::as_ptr(node) as *const () as usize)
    }

    /// 累加节点内容的序列化大小
    #[inline]
    pub fn add<T: Serialize>(&mut self, content: &T) {
        self.bytes += encoded_size(content);
    }

    #[inline]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// 已统计的不同节点数
    #[inline]
    pub fn node_count(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_arc_counted_once() {
        let node = Arc::new(vec![1i64, 2, 3]);
        let alias = Arc::clone(&node);
        let other = Arc::new(vec![1i64, 2, 3]);

        let mut tracker = SizeTracker::new();
        for n in [&node, &alias, &other] {
            if tracker.first_visit(n) {
                tracker.add(n.as_ref());
            }
        }
        assert_eq!(tracker.node_count(), 2);
        // 8 字节长度前缀 + 3 个 i64
        assert_eq!(tracker.bytes(), 2 * 32);
    }
}
