//! 多版本索引管理
//!
//! 最近 `chain_capacity` 个版本的增量保存在版本链上（快速部分），更早的 key
//! 由慢速层承载。每一轮写满 `chain_capacity` 个版本后，本轮最新的更新优化树
//! 被整体吸收进慢速层，新一轮从空树开始。慢速层保留新旧两代：链上的每个版本
//! 都与写入时的那一代配对。

use std::sync::Arc;

use rayon::prelude::*;

use crate::buffered::BufferedTree;
use crate::config::{IndexConfig, SecretKeys};
use crate::error::{check_range, IndexError, Result};
use crate::hash::{Blake3Hasher, Hasher};
use crate::pla::merge_sorted;
use crate::size::SizeTracker;
use crate::traits::QueryResult;

use super::chain::{ChainSlot, VersionChain};
use super::levels::LevelState;
use super::result::{verify_version, VersionDigest, VersionedResult};

/// 多版本认证索引
///
/// 版本号从 1 开始，每次插入产生一个新版本；版本 0 表示空索引。
pub struct VersionedIndex<H: Hasher = Blake3Hasher> {
    config: IndexConfig,
    secret: Arc<SecretKeys>,
    chain: VersionChain<H>,
    current: u64,
    /// 本轮已写入的版本数
    run_len: usize,
    state_new: Arc<LevelState<H>>,
    state_old: Arc<LevelState<H>>,
}

impl<H: Hasher> std::fmt::Debug for VersionedIndex<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedIndex")
            .field("hasher", &H::name())
            .field("current", &self.current)
            .field("run_len", &self.run_len)
            .field("chain_len", &self.chain.len())
            .field("generation", &self.state_new.generation())
            .field("levels", &self.state_new.level_sizes())
            .finish()
    }
}

impl<H: Hasher> VersionedIndex<H> {
    /// 创建空索引
    pub fn new(config: IndexConfig, secret: Arc<SecretKeys>) -> Result<Self> {
        config.validate()?;
        let chain = VersionChain::new(config.chain_capacity);
        let empty = Arc::new(LevelState::empty());
        Ok(Self {
            config,
            secret,
            chain,
            current: 0,
            run_len: 0,
            state_new: Arc::clone(&empty),
            state_old: empty,
        })
    }

    #[inline]
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    #[inline]
    pub fn secret(&self) -> &Arc<SecretKeys> {
        &self.secret
    }

    /// 当前（最新）版本号
    #[inline]
    pub fn current_version(&self) -> u64 {
        self.current
    }

    /// 仍可查询的最旧版本
    pub fn oldest_version(&self) -> u64 {
        self.state_old.boundary()
    }

    /// 插入一个 key，产生新版本并返回其版本号
    ///
    /// 已存在于当前版本的 key 返回 [`IndexError::DuplicateKey`]，索引不变。
    pub fn insert(&mut self, key: i64) -> Result<u64> {
        if self.contains(key) {
            return Err(IndexError::DuplicateKey(key));
        }

        let base = match self.chain.latest() {
            Some(slot) if self.run_len == self.config.chain_capacity => {
                let absorbed = self.state_new.absorb(
                    slot.tree.clone(),
                    self.current,
                    &self.config,
                    &self.secret,
                )?;
                log::debug!(
                    "flushed run ending at version {} ({} keys) into generation {} (levels {:?})",
                    self.current,
                    slot.tree.len(),
                    absorbed.generation(),
                    absorbed.level_sizes()
                );
                self.state_old = std::mem::replace(&mut self.state_new, Arc::new(absorbed));
                self.run_len = 0;
                None
            }
            Some(slot) if self.run_len > 0 => Some(slot.tree.clone()),
            _ => None,
        };

        let tree = match base {
            Some(tree) => tree.insert(key)?,
            None => BufferedTree::empty(&self.config, Arc::clone(&self.secret)).insert(key)?,
        };

        self.current += 1;
        self.run_len += 1;
        self.chain.push(ChainSlot {
            version: self.current,
            generation: self.state_new.generation(),
            tree,
        });
        Ok(self.current)
    }

    /// 依次插入，返回最后一个版本号
    pub fn insert_batch(&mut self, keys: &[i64]) -> Result<u64> {
        for &key in keys {
            self.insert(key)?;
        }
        Ok(self.current)
    }

    /// 当前版本是否包含 `key`
    pub fn contains(&self, key: i64) -> bool {
        self.snapshot(self.current)
            .map_or(false, |snapshot| snapshot.contains(key))
    }

    /// 取某一版本的只读视图
    ///
    /// # 返回
    /// 版本超出保留窗口时返回 [`IndexError::VersionOutOfWindow`]
    pub fn snapshot(&self, version: u64) -> Result<VersionSnapshot<H>> {
        let out_of_window = IndexError::VersionOutOfWindow {
            requested: version,
            current: self.current,
        };
        if version > self.current {
            return Err(out_of_window);
        }

        if let Some(slot) = self.chain.get(version, self.current) {
            let state = if slot.generation == self.state_new.generation() {
                &self.state_new
            } else if slot.generation == self.state_old.generation() {
                &self.state_old
            } else {
                return Err(out_of_window);
            };
            return Ok(VersionSnapshot {
                version,
                fast: Some(slot.tree.clone()),
                state: Arc::clone(state),
            });
        }

        for state in [&self.state_new, &self.state_old] {
            if state.boundary() == version {
                return Ok(VersionSnapshot {
                    version,
                    fast: None,
                    state: Arc::clone(state),
                });
            }
        }
        Err(out_of_window)
    }

    /// 某一版本的可信摘要
    pub fn digest(&self, version: u64) -> Result<VersionDigest> {
        Ok(self.snapshot(version)?.digest())
    }

    /// 在某一版本上做区间查询
    pub fn range_query(&self, low: i64, high: i64, version: u64) -> Result<VersionedResult> {
        self.snapshot(version)?.range_query(low, high)
    }

    /// 用结果所属版本的摘要校验
    pub fn verify_detailed(&self, low: i64, high: i64, result: &VersionedResult) -> Result<()> {
        let digest = self.digest(result.version)?;
        verify_version::<H>(&digest, low, high, result, &self.secret)
    }

    pub fn verify(&self, low: i64, high: i64, result: &VersionedResult) -> bool {
        match self.verify_detailed(low, high, result) {
            Ok(()) => true,
            Err(e) => {
                log::warn!(
                    "version {} range [{}, {}) rejected: {}",
                    result.version,
                    low,
                    high,
                    e
                );
                false
            }
        }
    }

    /// 当前慢速层每层的 key 数
    pub fn level_sizes(&self) -> Vec<usize> {
        self.state_new.level_sizes()
    }

    /// 版本链上的版本数
    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }

    /// 链上全部树与两代慢速层的总字节数，共享节点只计一次
    pub fn index_size(&self) -> u64 {
        let mut tracker = SizeTracker::new();
        for slot in self.chain.iter() {
            slot.tree.accumulate_size(&mut tracker);
        }
        self.state_new.accumulate_size(&mut tracker);
        self.state_old.accumulate_size(&mut tracker);
        tracker.bytes()
    }
}

// ============================================================
// 版本快照
// ============================================================

/// 某一版本的只读视图，可跨线程并发查询
pub struct VersionSnapshot<H: Hasher = Blake3Hasher> {
    version: u64,
    fast: Option<BufferedTree<H>>,
    state: Arc<LevelState<H>>,
}

impl<H: Hasher> Clone for VersionSnapshot<H> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            fast: self.fast.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<H: Hasher> std::fmt::Debug for VersionSnapshot<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionSnapshot")
            .field("version", &self.version)
            .field("fast", &self.fast.as_ref().map(|t| t.len()))
            .field("generation", &self.state.generation())
            .finish()
    }
}

impl<H: Hasher> VersionSnapshot<H> {
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// 快速部分，慢速层边界版本为 `None`
    #[inline]
    pub fn fast(&self) -> Option<&BufferedTree<H>> {
        self.fast.as_ref()
    }

    #[inline]
    pub fn state(&self) -> &Arc<LevelState<H>> {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.fast.as_ref().map_or(0, |t| t.len()) + self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: i64) -> bool {
        self.fast.as_ref().map_or(false, |t| t.contains(key)) || self.state.contains(key)
    }

    /// 该版本的全部 key，升序
    pub fn keys(&self) -> Vec<i64> {
        let mut keys = self.fast.as_ref().map(|t| t.keys()).unwrap_or_default();
        if let Some(pending) = self.state.pending() {
            keys = merge_sorted(&keys, &pending.keys());
        }
        for level in self.state.levels().iter().flatten() {
            keys = merge_sorted(&keys, &level.keys());
        }
        keys
    }

    pub fn digest(&self) -> VersionDigest {
        VersionDigest {
            version: self.version,
            fast: self.fast.as_ref().and_then(|t| t.root_hash()),
            pending: self.state.pending().and_then(|t| t.root_hash()),
            levels: self
                .state
                .levels()
                .iter()
                .map(|l| l.as_ref().and_then(|t| t.root_digest()))
                .collect(),
        }
    }

    /// 区间查询，各层学习型树并行回答
    pub fn range_query(&self, low: i64, high: i64) -> Result<VersionedResult> {
        check_range(low, high)?;
        let fast = self
            .fast
            .as_ref()
            .map(|t| t.range_query(low, high))
            .transpose()?;
        let pending = self
            .state
            .pending()
            .map(|t| t.range_query(low, high))
            .transpose()?;
        let levels = self
            .state
            .levels()
            .par_iter()
            .map(|level| level.as_ref().map(|t| t.range_query(low, high)).transpose())
            .collect::<Result<Vec<Option<QueryResult<_>>>>>()?;

        Ok(VersionedResult {
            version: self.version,
            low,
            high,
            fast,
            pending,
            levels,
        })
    }
}
