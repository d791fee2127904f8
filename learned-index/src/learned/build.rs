//! 批量构建

use std::marker::PhantomData;
use std::sync::Arc;

use rayon::prelude::*;

use crate::config::SecretKeys;
use crate::error::Result;
use crate::hash::Hasher;
use crate::pla::{check_strictly_increasing, OptPla, Segment};

use super::core::LearnedTree;
use super::node::{InternalNode, LeafNode, LearnedNode};

impl<H: Hasher> LearnedTree<H> {
    /// 在严格递增的 key 上构建树
    ///
    /// # 参数
    /// - `keys`: 严格递增的数据 key
    /// - `err`: 每层模型的误差界
    /// - `secret`: 承诺密钥
    ///
    /// # 返回
    /// 输入非严格递增时返回 `UnsortedInput`
    pub fn build(keys: &[i64], err: u32, secret: Arc<SecretKeys>) -> Result<Self> {
        check_strictly_increasing(keys)?;
        if keys.is_empty() {
            return Ok(Self::empty(err, secret));
        }

        let leaves: Vec<Arc<LearnedNode>> = OptPla::build(keys, err)
            .into_par_iter()
            .map(|seg| Arc::new(LearnedNode::Leaf(LeafNode::from_segment::<H>(seg, &secret))))
            .collect();
        let leaf_count = leaves.len();

        let mut level = leaves;
        let mut height = 1;
        while level.len() > 1 {
            level = build_level::<H>(level, err, &secret);
            height += 1;
        }

        log::debug!(
            "learned tree built: {} keys, {} leaves, height {}, err {}",
            keys.len(),
            leaf_count,
            height,
            err
        );

        Ok(Self {
            root: level.pop(),
            err,
            len: keys.len(),
            height,
            secret,
            _marker: PhantomData,
        })
    }
}

/// 对一层节点的第一个 key 分段，生成上一层内部节点
pub(super) fn build_level<H: Hasher>(
    nodes: Vec<Arc<LearnedNode>>,
    err: u32,
    secret: &SecretKeys,
) -> Vec<Arc<LearnedNode>> {
    let first_keys: Vec<i64> = nodes.iter().map(|n| n.first_key()).collect();
    let segments = OptPla::build(&first_keys, err);

    group_by_segments(nodes, segments)
        .into_par_iter()
        .map(|(seg, children)| {
            Arc::new(LearnedNode::Internal(InternalNode::new::<H>(
                seg.model, children, secret,
            )))
        })
        .collect()
}

/// 按分段长度切分节点序列
fn group_by_segments(
    nodes: Vec<Arc<LearnedNode>>,
    segments: Vec<Segment>,
) -> Vec<(Segment, Vec<Arc<LearnedNode>>)> {
    let mut iter = nodes.into_iter();
    segments
        .into_iter()
        .map(|seg| {
            let children: Vec<Arc<LearnedNode>> = iter.by_ref().take(seg.len()).collect();
            (seg, children)
        })
        .collect()
}
