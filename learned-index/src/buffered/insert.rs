//! 持久化插入
//!
//! 沿分隔 key 找到连接叶子插入；叶子重训练产生的多个新叶子
//! 拼接回父节点，父节点超过扇出时均衡分裂，分裂一路向上传播。

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::Result;
use crate::hash::Hasher;
use crate::pla::{Model, Segment};

use super::connected::{ConnectedLeaf, LeafParams};
use super::core::{raise, BufferedTree};
use super::node::{route, split_balanced, UpperNode};

impl<H: Hasher> BufferedTree<H> {
    /// 插入 key，返回新树
    ///
    /// key 已存在时返回 `DuplicateKey`，原树不受影响。
    pub fn insert(&self, key: i64) -> Result<Self> {
        let root = match &self.root {
            Some(root) => root,
            None => {
                let segment = Segment {
                    model: Model::new(0.0, 0.0),
                    keys: vec![key],
                };
                let leaf = Arc::new(ConnectedLeaf::from_segment::<H>(segment, &self.secret));
                let root = Arc::new(UpperNode::bottom::<H>(Vec::new(), vec![leaf]));
                return Ok(self.with_root(root, 1));
            }
        };

        let params = self.leaf_params();
        let (mut level, mut seps) = insert_into::<H>(root, key, &params, self.fanout)?;
        raise::<H>(&mut level, &mut seps, self.fanout);
        let new_root = level.swap_remove(0);

        Ok(self.with_root(new_root, self.len + 1))
    }

    fn with_root(&self, root: Arc<UpperNode>, len: usize) -> Self {
        Self {
            root: Some(root),
            err: self.err,
            fanout: self.fanout,
            buf_rate: self.buf_rate,
            len,
            secret: Arc::clone(&self.secret),
            _marker: PhantomData,
        }
    }
}

/// 将 key 插入子树，返回替换节点与其间的分隔 key
fn insert_into<H: Hasher>(
    node: &Arc<UpperNode>,
    key: i64,
    params: &LeafParams<'_>,
    fanout: usize,
) -> Result<(Vec<Arc<UpperNode>>, Vec<i64>)> {
    match node.as_ref() {
        UpperNode::Bottom { keys, leaves, .. } => {
            let idx = route(keys, key);
            let replacement = leaves[idx].insert::<H>(key, params)?;
            let new_seps: Vec<i64> = replacement.iter().skip(1).map(|l| l.min_key()).collect();

            let (leaves, seps) = splice(leaves, keys, idx, replacement, new_seps);
            let (parts, promoted) = split_balanced(leaves, seps, fanout);
            Ok((
                parts
                    .into_iter()
                    .map(|(leaves, keys)| Arc::new(UpperNode::bottom::<H>(keys, leaves)))
                    .collect(),
                promoted,
            ))
        }
        UpperNode::Inner { keys, children, .. } => {
            let idx = route(keys, key);
            let (replacement, new_seps) = insert_into::<H>(&children[idx], key, params, fanout)?;

            let (children, seps) = splice(children, keys, idx, replacement, new_seps);
            let (parts, promoted) = split_balanced(children, seps, fanout);
            Ok((
                parts
                    .into_iter()
                    .map(|(children, keys)| Arc::new(UpperNode::inner::<H>(keys, children)))
                    .collect(),
                promoted,
            ))
        }
    }
}

/// 用 `replacement` 替换第 `idx` 个条目，并在相应位置插入新的分隔 key
fn splice<T: Clone>(
    entries: &[T],
    separators: &[i64],
    idx: usize,
    replacement: Vec<T>,
    new_separators: Vec<i64>,
) -> (Vec<T>, Vec<i64>) {
    let mut out = Vec::with_capacity(entries.len() + replacement.len());
    out.extend_from_slice(&entries[..idx]);
    out.extend(replacement);
    out.extend_from_slice(&entries[idx + 1..]);

    let mut seps = Vec::with_capacity(separators.len() + new_separators.len());
    seps.extend_from_slice(&separators[..idx]);
    seps.extend(new_separators);
    seps.extend_from_slice(&separators[idx..]);

    (out, seps)
}
