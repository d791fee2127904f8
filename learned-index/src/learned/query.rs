//! 区间查询

use crate::commitment::ChainProof;
use crate::error::{check_range, Result};
use crate::hash::Hasher;
use crate::traits::QueryResult;

use super::core::LearnedTree;
use super::node::{LeafNode, LearnedNode};
use super::proof::{LearnedProof, VoNode};

impl<H: Hasher> LearnedTree<H> {
    /// 区间查询
    ///
    /// 从 `low` 的左边界（最后一个 `<= low` 的 key）开始向右收集，
    /// 直到收集到第一个 `>= high` 的 key 或到达末尾。
    /// 对外可见结果为 `[low, high)`，边界 key 只用于校验。
    pub fn range_query(&self, low: i64, high: i64) -> Result<QueryResult<LearnedProof>> {
        check_range(low, high)?;

        let mut keys = Vec::new();
        let root = self
            .root
            .as_ref()
            .map(|root| query_node(root, low, high, self.err, &mut keys));

        log::trace!(
            "learned range [{}, {}): {} keys returned",
            low,
            high,
            keys.len()
        );

        Ok(QueryResult {
            low,
            high,
            keys,
            proof: LearnedProof { root },
        })
    }
}

/// 在一个节点上提取结果与 VO 片段
fn query_node(node: &LearnedNode, low: i64, high: i64, err: u32, out: &mut Vec<i64>) -> VoNode {
    let start = node.locate(low, err).unwrap_or(0);

    match node {
        LearnedNode::Leaf(leaf) => VoNode::Leaf {
            digest: leaf.commitment.digest(),
            proof: extract_leaf(leaf, start, high, out),
        },
        LearnedNode::Internal(inner) => {
            let mut children = Vec::new();
            let mut end = start;
            for idx in start..inner.children.len() {
                children.push(query_node(&inner.children[idx], low, high, err, out));
                end = idx;
                if out.last().map_or(false, |&k| k >= high) {
                    break;
                }
            }
            VoNode::Internal {
                digest: inner.commitment.digest(),
                proof: inner.commitment.prove(start, end),
                children,
            }
        }
    }
}

/// 从叶子第 `start` 个 key 起收集 `< high` 的 key 及一个右边界 key
///
/// # 返回
/// 覆盖所收集区间的链式证明
pub(crate) fn extract_leaf(
    leaf: &LeafNode,
    start: usize,
    high: i64,
    out: &mut Vec<i64>,
) -> ChainProof {
    let keys = &leaf.keys;
    let mut i = start;
    while i < keys.len() && keys[i] < high {
        out.push(keys[i]);
        i += 1;
    }
    let end = if i < keys.len() {
        // 右边界 key
        out.push(keys[i]);
        i
    } else {
        keys.len() - 1
    };
    leaf.commitment.prove(start, end)
}
