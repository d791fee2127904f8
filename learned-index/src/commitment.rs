//! 位置哈希链承诺
//!
//! 对有序条目序列 `item_0 .. item_{n-1}`（已是带密钥的条目哈希）：
//!
//! ```text
//! acc_i = acc_{i-1} XOR item_i          (acc_{-1} = 0)
//! pie_i = acc_i XOR pad(sk1, nonce, i)
//! ```
//!
//! 证明区间 `[start, end]` 只需 `pie_{start-1}`（start > 0 时）与 `pie_end`，
//! 校验端用声明的条目重算累加器并比较。节点摘要 [`NodeDigest`] 为
//! `(nonce, len)`，父节点对子节点摘要再做一次承诺。

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::SecretKeys;
use crate::crypto::{internal_item, position_pad, random_nonce, xor, xor_into, Nonce, ZERO_HASH};
use crate::error::{IndexError, Result};
use crate::hash::{HashOutput, Hasher};

/// 并行计算位置掩码的阈值
const PARALLEL_THRESHOLD: usize = 1024;

/// 节点摘要：nonce 与条目数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeDigest {
    pub nonce: Nonce,
    pub len: u32,
}

impl NodeDigest {
    /// 父节点承诺中对应本节点的条目哈希
    #[inline]
    pub fn item<H: Hasher>(&self, keys: &SecretKeys) -> HashOutput {
        internal_item::<H>(keys, &self.nonce, self.len)
    }
}

/// 证明覆盖的区间是否贴合节点两端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// 区间从节点第一个条目开始
    pub at_start: bool,
    /// 区间在节点最后一个条目结束
    pub at_end: bool,
}

/// 一个节点的位置承诺数组
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionalCommitment {
    nonce: Nonce,
    pies: Vec<HashOutput>,
}

impl PositionalCommitment {
    /// 使用新 nonce 为条目序列建立承诺
    pub fn commit<H: Hasher>(items: &[HashOutput], keys: &SecretKeys) -> Self {
        Self::commit_with_nonce::<H>(items, keys, random_nonce())
    }

    /// 使用给定 nonce 建立承诺
    pub fn commit_with_nonce<H: Hasher>(
        items: &[HashOutput],
        keys: &SecretKeys,
        nonce: Nonce,
    ) -> Self {
        let pads: Vec<HashOutput> = if items.len() >= PARALLEL_THRESHOLD {
            (0..items.len() as u32)
                .into_par_iter()
                .map(|i| position_pad::<H>(keys, &nonce, i))
                .collect()
        } else {
            (0..items.len() as u32)
                .map(|i| position_pad::<H>(keys, &nonce, i))
                .collect()
        };

        let mut acc = ZERO_HASH;
        let pies = items
            .iter()
            .zip(pads.iter())
            .map(|(item, pad)| {
                xor_into(&mut acc, item);
                xor(&acc, pad)
            })
            .collect();

        Self { nonce, pies }
    }

    #[inline]
    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pies.is_empty()
    }

    #[inline]
    pub fn pies(&self) -> &[HashOutput] {
        &self.pies
    }

    #[inline]
    pub fn digest(&self) -> NodeDigest {
        NodeDigest {
            nonce: self.nonce,
            len: self.pies.len() as u32,
        }
    }

    /// 生成区间 `[start, end]` 的证明，调用方保证 `start <= end < len`
    pub fn prove(&self, start: usize, end: usize) -> ChainProof {
        debug_assert!(start <= end && end < self.pies.len());
        ChainProof {
            start: start as u32,
            end: end as u32,
            start_pie: start.checked_sub(1).map(|i| self.pies[i]),
            end_pie: self.pies[end],
        }
    }
}

/// 区间 `[start, end]` 的链式证明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainProof {
    pub start: u32,
    pub end: u32,
    /// `pie_{start-1}`，start 为 0 时为空
    pub start_pie: Option<HashOutput>,
    pub end_pie: HashOutput,
}

impl ChainProof {
    /// 区间条目数
    #[inline]
    pub fn count(&self) -> usize {
        (self.end as usize).saturating_sub(self.start as usize) + 1
    }

    /// 检查区间落在节点内：`start <= end < digest.len`
    pub fn check_shape(&self, digest: &NodeDigest) -> Result<()> {
        if self.start > self.end || self.end >= digest.len {
            return Err(IndexError::verification(format!(
                "chain proof range [{}, {}] outside node of length {}",
                self.start, self.end, digest.len
            )));
        }
        Ok(())
    }

    /// 用声明的条目哈希重算累加器并与 `pie_end` 比较
    ///
    /// # 参数
    /// - `digest`: 节点摘要（由父节点或可信根提供）
    /// - `items`: 区间内每个位置的条目哈希，按位置顺序
    /// - `keys`: 承诺密钥
    ///
    /// # 返回
    /// 成功时返回区间是否贴合节点两端
    pub fn verify<H: Hasher>(
        &self,
        digest: &NodeDigest,
        items: &[HashOutput],
        keys: &SecretKeys,
    ) -> Result<Span> {
        self.check_shape(digest)?;
        if items.len() != self.count() {
            return Err(IndexError::verification(format!(
                "chain proof covers {} items but {} were claimed",
                self.count(),
                items.len()
            )));
        }

        let mut acc = match (self.start, &self.start_pie) {
            (0, None) => ZERO_HASH,
            (s, Some(pie)) if s > 0 => xor(pie, &position_pad::<H>(keys, &digest.nonce, s - 1)),
            _ => {
                return Err(IndexError::verification(
                    "chain proof start boundary does not match its start position",
                ))
            }
        };
        for item in items {
            xor_into(&mut acc, item);
        }

        let expected = xor(&acc, &position_pad::<H>(keys, &digest.nonce, self.end));
        if expected != self.end_pie {
            return Err(IndexError::verification(format!(
                "positional commitment mismatch at [{}, {}]",
                self.start, self.end
            )));
        }

        Ok(Span {
            at_start: self.start == 0,
            at_end: self.end + 1 == digest.len,
        })
    }
}
