//! LearnedTree 核心结构体

use std::marker::PhantomData;
use std::sync::Arc;

use crate::commitment::NodeDigest;
use crate::config::SecretKeys;
use crate::error::{IndexError, Result};
use crate::hash::{Blake3Hasher, Hasher};
use crate::size::SizeTracker;
use crate::traits::{AuthenticatedIndex, QueryResult};

use super::node::{accumulate_size, LearnedNode};
use super::proof::LearnedProof;

/// 查询优化的认证学习型树
///
/// # 类型参数
///
/// - `H`: 哈希算法，默认 Blake3
///
/// 克隆只复制根指针；插入返回新树，与旧树共享未改动的子树。
pub struct LearnedTree<H: Hasher = Blake3Hasher> {
    pub(super) root: Option<Arc<LearnedNode>>,
    pub(super) err: u32,
    pub(super) len: usize,
    pub(super) height: usize,
    pub(super) secret: Arc<SecretKeys>,
    pub(super) _marker: PhantomData<H>,
}

impl<H: Hasher> Clone for LearnedTree<H> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            err: self.err,
            len: self.len,
            height: self.height,
            secret: Arc::clone(&self.secret),
            _marker: PhantomData,
        }
    }
}

impl<H: Hasher> std::fmt::Debug for LearnedTree<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearnedTree")
            .field("hasher", &H::name())
            .field("err", &self.err)
            .field("len", &self.len)
            .field("height", &self.height)
            .field("digest", &self.root_digest())
            .finish()
    }
}

impl<H: Hasher> LearnedTree<H> {
    /// 创建空树
    pub fn empty(err: u32, secret: Arc<SecretKeys>) -> Self {
        Self {
            root: None,
            err,
            len: 0,
            height: 0,
            secret,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn root(&self) -> Option<&Arc<LearnedNode>> {
        self.root.as_ref()
    }

    /// 根摘要，客户端以此作为可信值
    #[inline]
    pub fn root_digest(&self) -> Option<NodeDigest> {
        self.root.as_ref().map(|r| r.digest())
    }

    #[inline]
    pub fn err(&self) -> u32 {
        self.err
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// 层数，只有叶子的树为 1
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn secret(&self) -> &Arc<SecretKeys> {
        &self.secret
    }

    pub fn leaf_count(&self) -> usize {
        self.root.as_ref().map_or(0, |r| r.leaf_count())
    }

    /// 最小 key
    pub fn min_key(&self) -> Result<i64> {
        self.root
            .as_ref()
            .map(|r| r.first_key())
            .ok_or(IndexError::EmptyIndex)
    }

    /// 最大 key
    pub fn max_key(&self) -> Result<i64> {
        let mut node = self.root.as_ref().ok_or(IndexError::EmptyIndex)?;
        while let Some(last) = node.children().last() {
            node = last;
        }
        node.keys().last().copied().ok_or(IndexError::EmptyIndex)
    }

    /// 全部 key，升序
    pub fn keys(&self) -> Vec<i64> {
        let mut out = Vec::with_capacity(self.len);
        if let Some(root) = &self.root {
            root.collect_keys(&mut out);
        }
        out
    }

    /// 点查询
    pub fn contains(&self, key: i64) -> bool {
        let mut node = match &self.root {
            Some(root) => root,
            None => return false,
        };
        loop {
            let idx = match node.locate(key, self.err) {
                Some(idx) => idx,
                None => return false,
            };
            match node.as_ref() {
                LearnedNode::Leaf(leaf) => return leaf.keys[idx] == key,
                LearnedNode::Internal(inner) => node = &inner.children[idx],
            }
        }
    }

    /// 节点内容序列化后的总字节数
    pub fn index_size(&self) -> u64 {
        let mut tracker = SizeTracker::new();
        self.accumulate_size(&mut tracker);
        tracker.bytes()
    }

    /// 累加到外部统计器（与其他版本共享节点时去重）
    pub fn accumulate_size(&self, tracker: &mut SizeTracker) {
        if let Some(root) = &self.root {
            accumulate_size(root, tracker);
        }
    }
}

// ============================================================================
// AuthenticatedIndex 实现
// ============================================================================

impl<H: Hasher> AuthenticatedIndex for LearnedTree<H> {
    type Digest = NodeDigest;
    type Proof = LearnedProof;

    fn len(&self) -> usize {
        self.len
    }

    fn digest(&self) -> Option<NodeDigest> {
        self.root_digest()
    }

    fn insert(&self, key: i64) -> Result<Self> {
        LearnedTree::insert(self, key)
    }

    fn contains(&self, key: i64) -> bool {
        LearnedTree::contains(self, key)
    }

    fn keys(&self) -> Vec<i64> {
        LearnedTree::keys(self)
    }

    fn range_query(&self, low: i64, high: i64) -> Result<QueryResult<LearnedProof>> {
        LearnedTree::range_query(self, low, high)
    }

    fn verify_detailed(
        &self,
        low: i64,
        high: i64,
        proof: &LearnedProof,
        claimed: &[i64],
    ) -> Result<()> {
        LearnedTree::verify_detailed(self, low, high, proof, claimed)
    }

    fn index_size(&self) -> u64 {
        LearnedTree::index_size(self)
    }
}
