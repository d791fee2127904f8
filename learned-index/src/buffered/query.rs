//! 区间查询

use crate::error::{check_range, Result};
use crate::hash::Hasher;
use crate::learned::extract_leaf;
use crate::traits::QueryResult;

use super::buffer::BufferNode;
use super::connected::ConnectedLeaf;
use super::core::BufferedTree;
use super::node::{child_bounds, intersects, UpperNode};
use super::proof::{BufferVo, BufferedProof, LeafVo, UpperVo};

impl<H: Hasher> BufferedTree<H> {
    /// 区间查询
    ///
    /// 展开所有负责区间与 `[low, high)` 相交的子树；连接叶子的模型部分
    /// 与学习型叶子一样返回左右边界 key，缓冲部分返回展开叶子的全部 key。
    pub fn range_query(&self, low: i64, high: i64) -> Result<QueryResult<BufferedProof>> {
        check_range(low, high)?;

        let mut keys = Vec::new();
        let root = self
            .root
            .as_ref()
            .map(|root| query_upper(root, None, None, low, high, self.err, &mut keys));

        log::trace!(
            "buffered range [{}, {}): {} keys returned",
            low,
            high,
            keys.len()
        );

        Ok(QueryResult {
            low,
            high,
            keys,
            proof: BufferedProof { root },
        })
    }
}

fn query_upper(
    node: &UpperNode,
    lo: Option<i64>,
    hi: Option<i64>,
    low: i64,
    high: i64,
    err: u32,
    out: &mut Vec<i64>,
) -> UpperVo {
    match node {
        UpperNode::Bottom { keys, leaves, .. } => {
            let leaves = leaves
                .iter()
                .enumerate()
                .map(|(i, leaf)| {
                    let (clo, chi) = child_bounds(keys, i, lo, hi);
                    if intersects(clo, chi, low, high) {
                        query_leaf(leaf, low, high, err, out)
                    } else {
                        LeafVo::Pruned(*leaf.hash())
                    }
                })
                .collect();
            UpperVo::Bottom {
                keys: keys.clone(),
                leaves,
            }
        }
        UpperNode::Inner { keys, children, .. } => {
            let children = children
                .iter()
                .enumerate()
                .map(|(i, child)| {
                    let (clo, chi) = child_bounds(keys, i, lo, hi);
                    if intersects(clo, chi, low, high) {
                        query_upper(child, clo, chi, low, high, err, out)
                    } else {
                        UpperVo::Pruned(*child.hash())
                    }
                })
                .collect();
            UpperVo::Inner {
                keys: keys.clone(),
                children,
            }
        }
    }
}

fn query_leaf(leaf: &ConnectedLeaf, low: i64, high: i64, err: u32, out: &mut Vec<i64>) -> LeafVo {
    let model = leaf.model();
    let start = model.model.find_left_bound(&model.keys, low, err).unwrap_or(0);
    let proof = extract_leaf(model, start, high, out);
    let buffer = leaf
        .buffer()
        .map(|buf| query_buffer(buf, None, None, low, high, out));

    LeafVo::Open {
        digest: model.commitment.digest(),
        proof,
        buffer,
    }
}

fn query_buffer(
    node: &BufferNode,
    lo: Option<i64>,
    hi: Option<i64>,
    low: i64,
    high: i64,
    out: &mut Vec<i64>,
) -> BufferVo {
    match node {
        BufferNode::Leaf { keys, .. } => {
            out.extend_from_slice(keys);
            BufferVo::Leaf {
                len: keys.len() as u32,
            }
        }
        BufferNode::Inner { keys, children, .. } => {
            let children = children
                .iter()
                .enumerate()
                .map(|(i, child)| {
                    let (clo, chi) = child_bounds(keys, i, lo, hi);
                    if intersects(clo, chi, low, high) {
                        query_buffer(child, clo, chi, low, high, out)
                    } else {
                        BufferVo::Pruned(*child.hash())
                    }
                })
                .collect();
            BufferVo::Inner {
                keys: keys.clone(),
                children,
            }
        }
    }
}
