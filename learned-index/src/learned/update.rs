//! 持久化插入
//!
//! 只重建从目标叶子到根的路径：叶子合并新 key 后重新分段，
//! 可能分裂成多个兄弟叶子；父节点对新的子节点序列重新分段。
//! 路径外的子树与旧树共享。

use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::SecretKeys;
use crate::error::{IndexError, Result};
use crate::hash::Hasher;
use crate::pla::OptPla;

use super::build::build_level;
use super::core::LearnedTree;
use super::node::{LeafNode, LearnedNode};

impl<H: Hasher> LearnedTree<H> {
    /// 插入 key，返回新树
    ///
    /// key 已存在时返回 `DuplicateKey`，原树不受影响。
    pub fn insert(&self, key: i64) -> Result<Self> {
        let root = match &self.root {
            Some(root) => root,
            None => return Self::build(&[key], self.err, Arc::clone(&self.secret)),
        };

        let mut level = insert_into::<H>(root, key, self.err, &self.secret)?;
        let mut height = self.height;
        while level.len() > 1 {
            level = build_level::<H>(level, self.err, &self.secret);
            height += 1;
        }

        Ok(Self {
            root: level.pop(),
            err: self.err,
            len: self.len + 1,
            height,
            secret: Arc::clone(&self.secret),
            _marker: PhantomData,
        })
    }
}

/// 将 key 插入子树，返回替换该子树的一个或多个新节点
fn insert_into<H: Hasher>(
    node: &Arc<LearnedNode>,
    key: i64,
    err: u32,
    secret: &SecretKeys,
) -> Result<Vec<Arc<LearnedNode>>> {
    let pos = node.locate(key, err);

    match node.as_ref() {
        LearnedNode::Leaf(leaf) => {
            if pos.map_or(false, |i| leaf.keys[i] == key) {
                return Err(IndexError::DuplicateKey(key));
            }
            let at = pos.map_or(0, |i| i + 1);
            let mut merged = Vec::with_capacity(leaf.keys.len() + 1);
            merged.extend_from_slice(&leaf.keys[..at]);
            merged.push(key);
            merged.extend_from_slice(&leaf.keys[at..]);

            Ok(OptPla::build(&merged, err)
                .into_iter()
                .map(|seg| Arc::new(LearnedNode::Leaf(LeafNode::from_segment::<H>(seg, secret))))
                .collect())
        }
        LearnedNode::Internal(inner) => {
            let idx = pos.unwrap_or(0);
            let replacement = insert_into::<H>(&inner.children[idx], key, err, secret)?;

            let mut children = Vec::with_capacity(inner.children.len() + replacement.len());
            children.extend(inner.children[..idx].iter().cloned());
            children.extend(replacement);
            children.extend(inner.children[idx + 1..].iter().cloned());

            Ok(build_level::<H>(children, err, secret))
        }
    }
}
