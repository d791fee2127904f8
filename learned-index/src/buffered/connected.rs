//! 连接叶子：学习型叶子模型 + 认证缓冲
//!
//! 缓冲未满时新 key 进入缓冲；缓冲满时把模型 key、缓冲 key 与新 key
//! 归并后重新分段，得到一个或多个缓冲为空的新连接叶子。

use std::sync::Arc;

use serde::Serialize;

use crate::config::{buffer_capacity, SecretKeys};
use crate::crypto::{Nonce, TAG_CONNECTED_LEAF, ZERO_HASH};
use crate::error::{IndexError, Result};
use crate::hash::{HashOutput, Hasher};
use crate::learned::LeafNode;
use crate::pla::{merge_sorted, OptPla, Segment};
use crate::size::SizeTracker;

use super::buffer::{self, BufferNode};

/// 插入连接叶子时需要的树参数
#[derive(Debug, Clone, Copy)]
pub(crate) struct LeafParams<'a> {
    pub err: u32,
    pub fanout: usize,
    pub buf_rate: f64,
    pub secret: &'a SecretKeys,
}

impl LeafParams<'_> {
    #[inline]
    fn capacity(&self, model_len: usize) -> usize {
        buffer_capacity(model_len, self.buf_rate)
    }
}

/// 连接叶子
#[derive(Debug, Clone, Serialize)]
pub struct ConnectedLeaf {
    #[serde(skip)]
    model: Arc<LeafNode>,
    #[serde(skip)]
    buffer: Option<Arc<BufferNode>>,
    buffer_len: usize,
    hash: HashOutput,
}

impl ConnectedLeaf {
    /// 由分段建立缓冲为空的连接叶子
    pub fn from_segment<H: Hasher>(segment: Segment, secret: &SecretKeys) -> Self {
        Self::new::<H>(Arc::new(LeafNode::from_segment::<H>(segment, secret)), None, 0)
    }

    fn new<H: Hasher>(
        model: Arc<LeafNode>,
        buffer: Option<Arc<BufferNode>>,
        buffer_len: usize,
    ) -> Self {
        let digest = model.commitment.digest();
        let buffer_hash = buffer.as_ref().map_or(ZERO_HASH, |b| *b.hash());
        let hash = leaf_hash::<H>(&digest.nonce, digest.len, &buffer_hash);
        Self {
            model,
            buffer,
            buffer_len,
            hash,
        }
    }

    #[inline]
    pub fn model(&self) -> &LeafNode {
        &self.model
    }

    #[inline]
    pub fn model_keys(&self) -> &[i64] {
        &self.model.keys
    }

    #[inline]
    pub fn buffer(&self) -> Option<&Arc<BufferNode>> {
        self.buffer.as_ref()
    }

    /// 缓冲中的 key 数
    #[inline]
    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    #[inline]
    pub fn hash(&self) -> &HashOutput {
        &self.hash
    }

    /// 模型 key 与缓冲 key 的总数
    #[inline]
    pub fn len(&self) -> usize {
        self.model.keys.len() + self.buffer_len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 叶子中的最小 key
    pub fn min_key(&self) -> i64 {
        let model_min = self.model.keys[0];
        self.buffer
            .as_ref()
            .and_then(|b| b.min_key())
            .map_or(model_min, |k| k.min(model_min))
    }

    pub fn contains(&self, key: i64, err: u32) -> bool {
        self.model.model.contains(&self.model.keys, key, err)
            || self.buffer.as_ref().map_or(false, |b| b.contains(key))
    }

    /// 缓冲中的 key，升序
    pub fn buffer_keys(&self) -> Vec<i64> {
        let mut out = Vec::with_capacity(self.buffer_len);
        if let Some(buf) = &self.buffer {
            buf.collect_keys(&mut out);
        }
        out
    }

    /// 模型 key 与缓冲 key 归并后的全部 key
    pub fn all_keys(&self) -> Vec<i64> {
        merge_sorted(&self.model.keys, &self.buffer_keys())
    }

    /// 持久化插入
    ///
    /// # 返回
    /// 替换本叶子的新叶子（缓冲插入时为 1 个，重训练时为 1..k 个）
    pub(crate) fn insert<H: Hasher>(
        &self,
        key: i64,
        params: &LeafParams<'_>,
    ) -> Result<Vec<Arc<ConnectedLeaf>>> {
        if self.contains(key, params.err) {
            return Err(IndexError::DuplicateKey(key));
        }

        if self.buffer_len < params.capacity(self.model.keys.len()) {
            let root = buffer::insert_root::<H>(self.buffer.as_ref(), key, params.fanout);
            let leaf = Self::new::<H>(Arc::clone(&self.model), Some(root), self.buffer_len + 1);
            return Ok(vec![Arc::new(leaf)]);
        }

        let mut merged = self.all_keys();
        let at = merged.partition_point(|&k| k < key);
        merged.insert(at, key);

        let leaves: Vec<Arc<ConnectedLeaf>> = OptPla::build(&merged, params.err)
            .into_iter()
            .map(|seg| Arc::new(Self::from_segment::<H>(seg, params.secret)))
            .collect();

        log::debug!(
            "connected leaf retrained: {} model + {} buffered keys -> {} segments",
            self.model.keys.len(),
            self.buffer_len + 1,
            leaves.len()
        );
        Ok(leaves)
    }

    pub(crate) fn accumulate_size(leaf: &Arc<ConnectedLeaf>, tracker: &mut SizeTracker) {
        if !tracker.first_visit(leaf) {
            return;
        }
        tracker.add(leaf.as_ref());
        if tracker.first_visit(&leaf.model) {
            tracker.add(leaf.model.as_ref());
        }
        if let Some(buf) = &leaf.buffer {
            buffer::accumulate_size(buf, tracker);
        }
    }
}

/// 连接叶子哈希：H(0x12 || model_nonce || model_len || buffer_hash)
pub(crate) fn leaf_hash<H: Hasher>(
    nonce: &Nonce,
    len: u32,
    buffer_hash: &HashOutput,
) -> HashOutput {
    H::hash_parts(&[&[TAG_CONNECTED_LEAF], nonce, &len.to_be_bytes(), buffer_hash])
}
