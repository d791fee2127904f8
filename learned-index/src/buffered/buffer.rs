//! 认证缓冲：持久化 Merkle B+ 树
//!
//! 叶子保存有序 key，内部节点保存分隔 key（第 i 个分隔 key 是第 i + 1
//! 个子树的下界）与子节点。节点哈希为 Merkle 组合：
//!
//! ```text
//! leaf  = H(0x10 || keys)
//! inner = H(0x11 || separators || child_hash_0 || ... || child_hash_n)
//! ```

use std::sync::Arc;

use serde::Serialize;

use crate::crypto::{keys_bytes, TAG_BUFFER_INNER, TAG_BUFFER_LEAF};
use crate::hash::{HashOutput, Hasher};
use crate::size::SizeTracker;

use super::node::{route, split_balanced};

/// 缓冲树节点
#[derive(Debug, Clone, Serialize)]
pub enum BufferNode {
    Leaf {
        keys: Vec<i64>,
        hash: HashOutput,
    },
    Inner {
        keys: Vec<i64>,
        #[serde(skip)]
        children: Vec<Arc<BufferNode>>,
        hash: HashOutput,
    },
}

impl BufferNode {
    pub fn leaf<H: Hasher>(keys: Vec<i64>) -> Self {
        let hash = leaf_hash::<H>(&keys);
        BufferNode::Leaf { keys, hash }
    }

    pub fn inner<H: Hasher>(keys: Vec<i64>, children: Vec<Arc<BufferNode>>) -> Self {
        let child_hashes: Vec<HashOutput> = children.iter().map(|c| *c.hash()).collect();
        let hash = inner_hash::<H>(&keys, &child_hashes);
        BufferNode::Inner {
            keys,
            children,
            hash,
        }
    }

    #[inline]
    pub fn hash(&self) -> &HashOutput {
        match self {
            BufferNode::Leaf { hash, .. } | BufferNode::Inner { hash, .. } => hash,
        }
    }

    pub fn min_key(&self) -> Option<i64> {
        match self {
            BufferNode::Leaf { keys, .. } => keys.first().copied(),
            BufferNode::Inner { children, .. } => children.first().and_then(|c| c.min_key()),
        }
    }

    pub fn contains(&self, key: i64) -> bool {
        match self {
            BufferNode::Leaf { keys, .. } => keys.binary_search(&key).is_ok(),
            BufferNode::Inner { keys, children, .. } => children[route(keys, key)].contains(key),
        }
    }

    /// 按序收集全部 key
    pub fn collect_keys(&self, out: &mut Vec<i64>) {
        match self {
            BufferNode::Leaf { keys, .. } => out.extend_from_slice(keys),
            BufferNode::Inner { children, .. } => {
                for child in children {
                    child.collect_keys(out);
                }
            }
        }
    }

    /// 持久化插入，返回替换节点及其间的分隔 key
    ///
    /// 调用方保证 key 不存在。节点条目超过 `fanout` 时对半分裂。
    pub fn insert<H: Hasher>(
        &self,
        key: i64,
        fanout: usize,
    ) -> (Vec<Arc<BufferNode>>, Vec<i64>) {
        match self {
            BufferNode::Leaf { keys, .. } => {
                let at = keys.partition_point(|&k| k < key);
                let mut merged = Vec::with_capacity(keys.len() + 1);
                merged.extend_from_slice(&keys[..at]);
                merged.push(key);
                merged.extend_from_slice(&keys[at..]);

                if merged.len() <= fanout {
                    return (vec![Arc::new(BufferNode::leaf::<H>(merged))], Vec::new());
                }
                let right = merged.split_off(merged.len() / 2);
                let sep = right[0];
                (
                    vec![
                        Arc::new(BufferNode::leaf::<H>(merged)),
                        Arc::new(BufferNode::leaf::<H>(right)),
                    ],
                    vec![sep],
                )
            }
            BufferNode::Inner { keys, children, .. } => {
                let idx = route(keys, key);
                let (replacement, new_seps) = children[idx].insert::<H>(key, fanout);

                let mut seps = Vec::with_capacity(keys.len() + new_seps.len());
                seps.extend_from_slice(&keys[..idx]);
                seps.extend(new_seps);
                seps.extend_from_slice(&keys[idx..]);

                let mut kids = Vec::with_capacity(children.len() + replacement.len());
                kids.extend(children[..idx].iter().cloned());
                kids.extend(replacement);
                kids.extend(children[idx + 1..].iter().cloned());

                let (parts, promoted) = split_balanced(kids, seps, fanout);
                let nodes = parts
                    .into_iter()
                    .map(|(children, keys)| Arc::new(BufferNode::inner::<H>(keys, children)))
                    .collect();
                (nodes, promoted)
            }
        }
    }
}

/// 向可选的缓冲根插入 key，返回新根
pub fn insert_root<H: Hasher>(
    root: Option<&Arc<BufferNode>>,
    key: i64,
    fanout: usize,
) -> Arc<BufferNode> {
    let root = match root {
        Some(root) => root,
        None => return Arc::new(BufferNode::leaf::<H>(vec![key])),
    };

    let (mut nodes, mut seps) = root.insert::<H>(key, fanout);
    loop {
        nodes = match <[Arc<BufferNode>; 1]>::try_from(nodes) {
            Ok([node]) => return node,
            Err(nodes) => nodes,
        };
        let (parts, promoted) = split_balanced(nodes, seps, fanout);
        nodes = parts
            .into_iter()
            .map(|(children, keys)| Arc::new(BufferNode::inner::<H>(keys, children)))
            .collect();
        seps = promoted;
    }
}

pub(crate) fn leaf_hash<H: Hasher>(keys: &[i64]) -> HashOutput {
    H::hash_parts(&[&[TAG_BUFFER_LEAF], &keys_bytes(keys)])
}

pub(crate) fn inner_hash<H: Hasher>(keys: &[i64], child_hashes: &[HashOutput]) -> HashOutput {
    let key_bytes = keys_bytes(keys);
    let mut parts: Vec<&[u8]> = Vec::with_capacity(child_hashes.len() + 2);
    parts.push(&[TAG_BUFFER_INNER]);
    parts.push(&key_bytes);
    parts.extend(child_hashes.iter().map(|h| h.as_slice()));
    H::hash_parts(&parts)
}

pub(crate) fn accumulate_size(node: &Arc<BufferNode>, tracker: &mut SizeTracker) {
    if !tracker.first_visit(node) {
        return;
    }
    tracker.add(node.as_ref());
    if let BufferNode::Inner { children, .. } = node.as_ref() {
        for child in children {
            accumulate_size(child, tracker);
        }
    }
}
