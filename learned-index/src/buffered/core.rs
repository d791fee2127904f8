//! BufferedTree 核心结构体与批量构建

use std::marker::PhantomData;
use std::sync::Arc;

use rayon::prelude::*;

use crate::config::{IndexConfig, SecretKeys};
use crate::error::Result;
use crate::hash::{Blake3Hasher, HashOutput, Hasher};
use crate::pla::{check_strictly_increasing, OptPla};
use crate::size::SizeTracker;
use crate::traits::{AuthenticatedIndex, QueryResult};

use super::connected::{ConnectedLeaf, LeafParams};
use super::node::{split_balanced, UpperNode};
use super::proof::BufferedProof;

/// 更新优化的认证学习型树
///
/// # 类型参数
///
/// - `H`: 哈希算法，默认 Blake3
///
/// 可信根摘要为根节点的 Merkle 哈希。
pub struct BufferedTree<H: Hasher = Blake3Hasher> {
    pub(super) root: Option<Arc<UpperNode>>,
    pub(super) err: u32,
    pub(super) fanout: usize,
    pub(super) buf_rate: f64,
    pub(super) len: usize,
    pub(super) secret: Arc<SecretKeys>,
    pub(super) _marker: PhantomData<H>,
}

impl<H: Hasher> Clone for BufferedTree<H> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            err: self.err,
            fanout: self.fanout,
            buf_rate: self.buf_rate,
            len: self.len,
            secret: Arc::clone(&self.secret),
            _marker: PhantomData,
        }
    }
}

impl<H: Hasher> std::fmt::Debug for BufferedTree<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedTree")
            .field("hasher", &H::name())
            .field("err", &self.err)
            .field("fanout", &self.fanout)
            .field("buf_rate", &self.buf_rate)
            .field("len", &self.len)
            .finish()
    }
}

impl<H: Hasher> BufferedTree<H> {
    /// 创建空树，使用配置中的 `err`、`fanout` 与 `buf_rate`
    pub fn empty(config: &IndexConfig, secret: Arc<SecretKeys>) -> Self {
        Self {
            root: None,
            err: config.err,
            fanout: config.fanout,
            buf_rate: config.buf_rate,
            len: 0,
            secret,
            _marker: PhantomData,
        }
    }

    /// 在严格递增的 key 上批量构建
    pub fn build(keys: &[i64], config: &IndexConfig, secret: Arc<SecretKeys>) -> Result<Self> {
        config.validate()?;
        check_strictly_increasing(keys)?;

        let mut tree = Self::empty(config, secret);
        if keys.is_empty() {
            return Ok(tree);
        }

        let leaves: Vec<Arc<ConnectedLeaf>> = OptPla::build(keys, tree.err)
            .into_par_iter()
            .map(|seg| Arc::new(ConnectedLeaf::from_segment::<H>(seg, &tree.secret)))
            .collect();
        let leaf_count = leaves.len();
        let seps: Vec<i64> = leaves.iter().skip(1).map(|l| l.min_key()).collect();

        tree.root = Some(assemble::<H>(leaves, seps, tree.fanout));
        tree.len = keys.len();

        log::debug!(
            "buffered tree built: {} keys, {} connected leaves, fanout {}",
            keys.len(),
            leaf_count,
            tree.fanout
        );
        Ok(tree)
    }

    #[inline]
    pub fn root(&self) -> Option<&Arc<UpperNode>> {
        self.root.as_ref()
    }

    /// 根哈希，客户端以此作为可信值
    #[inline]
    pub fn root_hash(&self) -> Option<HashOutput> {
        self.root.as_ref().map(|r| *r.hash())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    #[inline]
    pub fn err(&self) -> u32 {
        self.err
    }

    #[inline]
    pub fn secret(&self) -> &Arc<SecretKeys> {
        &self.secret
    }

    pub(super) fn leaf_params(&self) -> LeafParams<'_> {
        LeafParams {
            err: self.err,
            fanout: self.fanout,
            buf_rate: self.buf_rate,
            secret: &self.secret,
        }
    }

    /// 按序列出连接叶子
    pub fn leaves(&self) -> Vec<Arc<ConnectedLeaf>> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            root.for_each_leaf(&mut |leaf| out.push(Arc::clone(leaf)));
        }
        out
    }

    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        if let Some(root) = &self.root {
            root.for_each_leaf(&mut |_| count += 1);
        }
        count
    }

    pub fn contains(&self, key: i64) -> bool {
        self.root
            .as_ref()
            .map_or(false, |r| r.leaf_for(key).contains(key, self.err))
    }

    /// 全部 key（模型与缓冲归并），升序
    pub fn keys(&self) -> Vec<i64> {
        let mut out = Vec::with_capacity(self.len);
        if let Some(root) = &self.root {
            root.for_each_leaf(&mut |leaf| out.extend(leaf.all_keys()));
        }
        out
    }

    pub fn index_size(&self) -> u64 {
        let mut tracker = SizeTracker::new();
        self.accumulate_size(&mut tracker);
        tracker.bytes()
    }

    pub fn accumulate_size(&self, tracker: &mut SizeTracker) {
        if let Some(root) = &self.root {
            UpperNode::accumulate_size(root, tracker);
        }
    }
}

/// 将连接叶子逐层组装成上层 B 树，返回根
pub(super) fn assemble<H: Hasher>(
    leaves: Vec<Arc<ConnectedLeaf>>,
    seps: Vec<i64>,
    fanout: usize,
) -> Arc<UpperNode> {
    let (parts, mut seps) = split_balanced(leaves, seps, fanout);
    let mut level: Vec<Arc<UpperNode>> = parts
        .into_iter()
        .map(|(leaves, keys)| Arc::new(UpperNode::bottom::<H>(keys, leaves)))
        .collect();
    raise::<H>(&mut level, &mut seps, fanout);
    level.swap_remove(0)
}

/// 在多于一个节点时逐层向上建立内部节点，结束时 `level` 只剩根
pub(super) fn raise<H: Hasher>(
    level: &mut Vec<Arc<UpperNode>>,
    seps: &mut Vec<i64>,
    fanout: usize,
) {
    while level.len() > 1 {
        let (parts, promoted) = split_balanced(std::mem::take(level), std::mem::take(seps), fanout);
        *level = parts
            .into_iter()
            .map(|(children, keys)| Arc::new(UpperNode::inner::<H>(keys, children)))
            .collect();
        *seps = promoted;
    }
}

// ============================================================================
// AuthenticatedIndex 实现
// ============================================================================

impl<H: Hasher> AuthenticatedIndex for BufferedTree<H> {
    type Digest = HashOutput;
    type Proof = BufferedProof;

    fn len(&self) -> usize {
        self.len
    }

    fn digest(&self) -> Option<HashOutput> {
        self.root_hash()
    }

    fn insert(&self, key: i64) -> Result<Self> {
        BufferedTree::insert(self, key)
    }

    fn contains(&self, key: i64) -> bool {
        BufferedTree::contains(self, key)
    }

    fn keys(&self) -> Vec<i64> {
        BufferedTree::keys(self)
    }

    fn range_query(&self, low: i64, high: i64) -> Result<QueryResult<BufferedProof>> {
        BufferedTree::range_query(self, low, high)
    }

    fn verify_detailed(
        &self,
        low: i64,
        high: i64,
        proof: &BufferedProof,
        claimed: &[i64],
    ) -> Result<()> {
        BufferedTree::verify_detailed(self, low, high, proof, claimed)
    }

    fn index_size(&self) -> u64 {
        BufferedTree::index_size(self)
    }
}
