//! 上层 B 树节点
//!
//! 连接叶子之上是按分隔 key 路由的 B 树，最大扇出为 `fanout`。
//! 分隔 key 参与节点哈希，校验端据此得知每个子树负责的 key 区间。

use std::sync::Arc;

use serde::Serialize;

use crate::crypto::{keys_bytes, TAG_UPPER_BOTTOM, TAG_UPPER_INNER};
use crate::hash::{HashOutput, Hasher};
use crate::size::SizeTracker;

use super::connected::ConnectedLeaf;

/// 上层节点
#[derive(Debug, Clone, Serialize)]
pub enum UpperNode {
    /// 直接指向连接叶子的节点
    Bottom {
        keys: Vec<i64>,
        #[serde(skip)]
        leaves: Vec<Arc<ConnectedLeaf>>,
        hash: HashOutput,
    },
    Inner {
        keys: Vec<i64>,
        #[serde(skip)]
        children: Vec<Arc<UpperNode>>,
        hash: HashOutput,
    },
}

impl UpperNode {
    pub fn bottom<H: Hasher>(keys: Vec<i64>, leaves: Vec<Arc<ConnectedLeaf>>) -> Self {
        let hashes: Vec<HashOutput> = leaves.iter().map(|l| *l.hash()).collect();
        let hash = node_hash::<H>(TAG_UPPER_BOTTOM, &keys, &hashes);
        UpperNode::Bottom { keys, leaves, hash }
    }

    pub fn inner<H: Hasher>(keys: Vec<i64>, children: Vec<Arc<UpperNode>>) -> Self {
        let hashes: Vec<HashOutput> = children.iter().map(|c| *c.hash()).collect();
        let hash = node_hash::<H>(TAG_UPPER_INNER, &keys, &hashes);
        UpperNode::Inner {
            keys,
            children,
            hash,
        }
    }

    #[inline]
    pub fn hash(&self) -> &HashOutput {
        match self {
            UpperNode::Bottom { hash, .. } | UpperNode::Inner { hash, .. } => hash,
        }
    }

    /// 分隔 key
    #[inline]
    pub fn keys(&self) -> &[i64] {
        match self {
            UpperNode::Bottom { keys, .. } | UpperNode::Inner { keys, .. } => keys,
        }
    }

    /// 沿路由找到负责 key 的连接叶子
    pub fn leaf_for(&self, key: i64) -> &Arc<ConnectedLeaf> {
        match self {
            UpperNode::Bottom { keys, leaves, .. } => &leaves[route(keys, key)],
            UpperNode::Inner { keys, children, .. } => children[route(keys, key)].leaf_for(key),
        }
    }

    /// 按序遍历连接叶子
    pub fn for_each_leaf<'a>(&'a self, f: &mut impl FnMut(&'a Arc<ConnectedLeaf>)) {
        match self {
            UpperNode::Bottom { leaves, .. } => leaves.iter().for_each(|l| f(l)),
            UpperNode::Inner { children, .. } => {
                for child in children {
                    child.for_each_leaf(f);
                }
            }
        }
    }

    pub(crate) fn accumulate_size(node: &Arc<UpperNode>, tracker: &mut SizeTracker) {
        if !tracker.first_visit(node) {
            return;
        }
        tracker.add(node.as_ref());
        match node.as_ref() {
            UpperNode::Bottom { leaves, .. } => {
                for leaf in leaves {
                    ConnectedLeaf::accumulate_size(leaf, tracker);
                }
            }
            UpperNode::Inner { children, .. } => {
                for child in children {
                    UpperNode::accumulate_size(child, tracker);
                }
            }
        }
    }
}

/// 上层节点哈希：H(tag || separators || child_hash_0 || ...)
pub(crate) fn node_hash<H: Hasher>(
    tag: u8,
    keys: &[i64],
    child_hashes: &[HashOutput],
) -> HashOutput {
    let tag = [tag];
    let key_bytes = keys_bytes(keys);
    let mut parts: Vec<&[u8]> = Vec::with_capacity(child_hashes.len() + 2);
    parts.push(&tag);
    parts.push(&key_bytes);
    parts.extend(child_hashes.iter().map(|h| h.as_slice()));
    H::hash_parts(&parts)
}

/// 负责 key 的子节点下标
#[inline]
pub(crate) fn route(separators: &[i64], key: i64) -> usize {
    separators.partition_point(|&s| s <= key)
}

/// 第 `i` 个子节点负责的区间 `[lo, hi)`，`None` 表示无界
#[inline]
pub(crate) fn child_bounds(
    separators: &[i64],
    i: usize,
    lo: Option<i64>,
    hi: Option<i64>,
) -> (Option<i64>, Option<i64>) {
    let child_lo = if i == 0 { lo } else { Some(separators[i - 1]) };
    let child_hi = if i == separators.len() { hi } else { Some(separators[i]) };
    (child_lo, child_hi)
}

/// 区间 `[lo, hi)` 是否与查询区间 `[low, high)` 相交
#[inline]
pub(crate) fn intersects(lo: Option<i64>, hi: Option<i64>, low: i64, high: i64) -> bool {
    low < high && hi.map_or(true, |h| h > low) && lo.map_or(true, |l| l < high)
}

/// 将条目序列按扇出均衡切分
///
/// `separators` 长度为 `entries.len() - 1`。返回每个分片的条目与内部分隔 key，
/// 以及分片之间被提升的分隔 key。条目数不超过 `fanout` 时只有一个分片。
pub(crate) fn split_balanced<T>(
    entries: Vec<T>,
    separators: Vec<i64>,
    fanout: usize,
) -> (Vec<(Vec<T>, Vec<i64>)>, Vec<i64>) {
    let n = entries.len();
    let parts = ((n + fanout - 1) / fanout).max(1);
    let base = n / parts;
    let rem = n % parts;

    let mut entries = entries.into_iter();
    let mut separators = separators.into_iter();
    let mut out = Vec::with_capacity(parts);
    let mut promoted = Vec::with_capacity(parts - 1);

    for j in 0..parts {
        let size = base + usize::from(j < rem);
        let chunk: Vec<T> = entries.by_ref().take(size).collect();
        let inner: Vec<i64> = separators.by_ref().take(size.saturating_sub(1)).collect();
        if j + 1 < parts {
            promoted.extend(separators.next());
        }
        out.push((chunk, inner));
    }
    (out, promoted)
}
