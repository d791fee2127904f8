//! 学习型树节点
//!
//! 节点在承诺建立后不可变，任何内容变化都产生新节点。

use std::sync::Arc;

use serde::Serialize;

use crate::commitment::{NodeDigest, PositionalCommitment};
use crate::config::SecretKeys;
use crate::crypto::leaf_item;
use crate::hash::{HashOutput, Hasher};
use crate::pla::{Model, Segment};
use crate::size::SizeTracker;

/// 叶子节点：数据 key 及其模型和承诺
#[derive(Debug, Clone, Serialize)]
pub struct LeafNode {
    pub(crate) model: Model,
    pub(crate) keys: Vec<i64>,
    pub(crate) commitment: PositionalCommitment,
}

impl LeafNode {
    /// 由分段建立叶子，对原始 key 做承诺
    pub fn from_segment<H: Hasher>(segment: Segment, secret: &SecretKeys) -> Self {
        let items: Vec<HashOutput> = segment
            .keys
            .iter()
            .map(|&k| leaf_item::<H>(secret, k))
            .collect();
        let commitment = PositionalCommitment::commit::<H>(&items, secret);
        Self {
            model: segment.model,
            keys: segment.keys,
            commitment,
        }
    }
}

/// 内部节点：每个条目对应一个子节点，key 为子节点的第一个 key
#[derive(Debug, Clone, Serialize)]
pub struct InternalNode {
    pub(crate) model: Model,
    pub(crate) keys: Vec<i64>,
    #[serde(skip)]
    pub(crate) children: Vec<Arc<LearnedNode>>,
    pub(crate) child_digests: Vec<NodeDigest>,
    pub(crate) commitment: PositionalCommitment,
}

impl InternalNode {
    /// 由模型与子节点建立内部节点，对 `(child_nonce, child_len)` 做承诺
    pub fn new<H: Hasher>(
        model: Model,
        children: Vec<Arc<LearnedNode>>,
        secret: &SecretKeys,
    ) -> Self {
        let keys: Vec<i64> = children.iter().map(|c| c.first_key()).collect();
        let child_digests: Vec<NodeDigest> = children.iter().map(|c| c.digest()).collect();
        let items: Vec<HashOutput> = child_digests.iter().map(|d| d.item::<H>(secret)).collect();
        let commitment = PositionalCommitment::commit::<H>(&items, secret);
        Self {
            model,
            keys,
            children,
            child_digests,
            commitment,
        }
    }
}

/// 学习型树节点
#[derive(Debug, Clone, Serialize)]
pub enum LearnedNode {
    Leaf(LeafNode),
    Internal(InternalNode),
}

impl LearnedNode {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, LearnedNode::Leaf(_))
    }

    #[inline]
    pub fn model(&self) -> &Model {
        match self {
            LearnedNode::Leaf(leaf) => &leaf.model,
            LearnedNode::Internal(node) => &node.model,
        }
    }

    /// 叶子为数据 key，内部节点为各子节点的第一个 key
    #[inline]
    pub fn keys(&self) -> &[i64] {
        match self {
            LearnedNode::Leaf(leaf) => &leaf.keys,
            LearnedNode::Internal(node) => &node.keys,
        }
    }

    #[inline]
    pub fn commitment(&self) -> &PositionalCommitment {
        match self {
            LearnedNode::Leaf(leaf) => &leaf.commitment,
            LearnedNode::Internal(node) => &node.commitment,
        }
    }

    #[inline]
    pub fn children(&self) -> &[Arc<LearnedNode>] {
        match self {
            LearnedNode::Leaf(_) => &[],
            LearnedNode::Internal(node) => &node.children,
        }
    }

    #[inline]
    pub fn digest(&self) -> NodeDigest {
        self.commitment().digest()
    }

    /// 节点非空，构建保证至少一个条目
    #[inline]
    pub fn first_key(&self) -> i64 {
        self.keys()[0]
    }

    /// 条目数
    #[inline]
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// 以模型定位最后一个 `<= target` 的条目
    #[inline]
    pub fn locate(&self, target: i64, err: u32) -> Option<usize> {
        self.model().find_left_bound(self.keys(), target, err)
    }

    /// 子树中的 key 数
    pub fn key_count(&self) -> usize {
        match self {
            LearnedNode::Leaf(leaf) => leaf.keys.len(),
            LearnedNode::Internal(node) => node.children.iter().map(|c| c.key_count()).sum(),
        }
    }

    /// 按序收集子树中的全部 key
    pub fn collect_keys(&self, out: &mut Vec<i64>) {
        match self {
            LearnedNode::Leaf(leaf) => out.extend_from_slice(&leaf.keys),
            LearnedNode::Internal(node) => {
                for child in &node.children {
                    child.collect_keys(out);
                }
            }
        }
    }

    /// 子树中的叶子数
    pub fn leaf_count(&self) -> usize {
        match self {
            LearnedNode::Leaf(_) => 1,
            LearnedNode::Internal(node) => node.children.iter().map(|c| c.leaf_count()).sum(),
        }
    }
}

/// 累加子树大小，已统计过的共享节点跳过
pub(crate) fn accumulate_size(node: &Arc<LearnedNode>, tracker: &mut SizeTracker) {
    if !tracker.first_visit(node) {
        return;
    }
    tracker.add(node.as_ref());
    for child in node.children() {
        accumulate_size(child, tracker);
    }
}
