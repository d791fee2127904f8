//! 慢速层：二进制进位的学习型树层级
//!
//! 链淘汰出的一轮 key 先整体作为待合并的更新优化树（`pending`）保留；
//! 下一次淘汰时与 `pending` 归并，再像二进制计数器一样向上进位：
//! 遇到空层就在该层重建查询优化树，遇到非空层就归并后继续进位。

use std::sync::Arc;

use crate::buffered::BufferedTree;
use crate::config::{IndexConfig, SecretKeys};
use crate::error::Result;
use crate::hash::Hasher;
use crate::learned::LearnedTree;
use crate::pla::merge_sorted;
use crate::size::SizeTracker;

/// 一代慢速层状态
#[derive(Debug)]
pub struct LevelState<H: Hasher> {
    /// 代数，每次吸收递增
    pub(crate) generation: u64,
    /// 本状态的 key 集合恰好等于该版本的 key 集合
    pub(crate) boundary: u64,
    pub(crate) pending: Option<BufferedTree<H>>,
    pub(crate) levels: Vec<Option<LearnedTree<H>>>,
}

impl<H: Hasher> LevelState<H> {
    /// 初始空状态（对应版本 0）
    pub fn empty() -> Self {
        Self {
            generation: 0,
            boundary: 0,
            pending: None,
            levels: Vec::new(),
        }
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn boundary(&self) -> u64 {
        self.boundary
    }

    #[inline]
    pub fn pending(&self) -> Option<&BufferedTree<H>> {
        self.pending.as_ref()
    }

    #[inline]
    pub fn levels(&self) -> &[Option<LearnedTree<H>>] {
        &self.levels
    }

    /// 每层的 key 数，空层为 0
    pub fn level_sizes(&self) -> Vec<usize> {
        self.levels
            .iter()
            .map(|l| l.as_ref().map_or(0, |t| t.len()))
            .collect()
    }

    /// key 总数
    pub fn len(&self) -> usize {
        self.pending.as_ref().map_or(0, |p| p.len()) + self.level_sizes().iter().sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: i64) -> bool {
        self.pending.as_ref().map_or(false, |p| p.contains(key))
            || self
                .levels
                .iter()
                .flatten()
                .any(|level| level.contains(key))
    }

    /// 吸收一轮淘汰的 key，返回下一代状态
    ///
    /// # 参数
    /// - `run`: 被淘汰的一轮更新优化树（含该轮全部 key）
    /// - `boundary`: 吸收后状态对应的版本
    pub fn absorb(
        &self,
        run: BufferedTree<H>,
        boundary: u64,
        config: &IndexConfig,
        secret: &Arc<SecretKeys>,
    ) -> Result<Self> {
        let (pending, mut carry) = match &self.pending {
            None => (Some(run), None),
            Some(pending) => (None, Some(merge_sorted(&run.keys(), &pending.keys()))),
        };

        let mut levels = Vec::with_capacity(self.levels.len() + 1);
        for (i, level) in self.levels.iter().enumerate() {
            match (carry.take(), level) {
                (Some(keys), None) => {
                    levels.push(Some(build_level::<H>(i, &keys, config, secret)?));
                }
                (Some(keys), Some(tree)) => {
                    carry = Some(merge_sorted(&keys, &tree.keys()));
                    levels.push(None);
                }
                (None, level) => levels.push(level.clone()),
            }
        }
        if let Some(keys) = carry {
            let i = levels.len();
            levels.push(Some(build_level::<H>(i, &keys, config, secret)?));
        }

        Ok(Self {
            generation: self.generation + 1,
            boundary,
            pending,
            levels,
        })
    }

    pub fn accumulate_size(&self, tracker: &mut SizeTracker) {
        if let Some(pending) = &self.pending {
            pending.accumulate_size(tracker);
        }
        for level in self.levels.iter().flatten() {
            level.accumulate_size(tracker);
        }
    }
}

fn build_level<H: Hasher>(
    level: usize,
    keys: &[i64],
    config: &IndexConfig,
    secret: &Arc<SecretKeys>,
) -> Result<LearnedTree<H>> {
    let err = config.level_err(level);
    log::debug!("level {} rebuilt with {} keys (err {})", level, keys.len(), err);
    LearnedTree::build(keys, err, Arc::clone(secret))
}
