//! 客户端校验
//!
//! 自底向上重算 Merkle 哈希并与可信根比较；沿途检查：
//! - 与查询区间相交的子树没有被裁剪
//! - 展开的连接叶子模型部分承诺链吻合，且左右边界都已确认
//! - 所有声明的 key 都被证明消费

use std::marker::PhantomData;

use crate::config::SecretKeys;
use crate::crypto::{leaf_item, ZERO_HASH, TAG_UPPER_BOTTOM, TAG_UPPER_INNER};
use crate::error::{check_range, IndexError, Result};
use crate::hash::{HashOutput, Hasher};
use crate::learned::{check_bounds, check_strictly_increasing_claim};

use super::buffer;
use super::connected;
use super::core::BufferedTree;
use super::node::{child_bounds, intersects, node_hash};
use super::proof::{BufferVo, BufferedProof, LeafVo, UpperVo};

impl<H: Hasher> BufferedTree<H> {
    /// 以本树的根哈希校验
    pub fn verify_detailed(
        &self,
        low: i64,
        high: i64,
        proof: &BufferedProof,
        claimed: &[i64],
    ) -> Result<()> {
        verify_buffered::<H>(
            self.root_hash().as_ref(),
            low,
            high,
            proof,
            claimed,
            &self.secret,
        )
    }

    pub fn verify(&self, low: i64, high: i64, proof: &BufferedProof, claimed: &[i64]) -> bool {
        self.verify_detailed(low, high, proof, claimed).is_ok()
    }
}

/// 校验更新优化树的查询结果
///
/// # 参数
/// - `trusted`: 可信根哈希，空树为 `None`
/// - `claimed`: 服务端声明的原始结果，顺序与 VO 一致
pub fn verify_buffered<H: Hasher>(
    trusted: Option<&HashOutput>,
    low: i64,
    high: i64,
    proof: &BufferedProof,
    claimed: &[i64],
    secret: &SecretKeys,
) -> Result<()> {
    check_range(low, high)?;

    let (trusted, root) = match (trusted, &proof.root) {
        (None, None) if claimed.is_empty() => return Ok(()),
        (None, None) => {
            return Err(IndexError::verification(
                "empty tree cannot return results",
            ))
        }
        (Some(trusted), Some(root)) => (trusted, root),
        _ => {
            return Err(IndexError::verification(
                "proof shape does not match the trusted root",
            ))
        }
    };

    let mut checker = Checker::<H> {
        low,
        high,
        claimed,
        cursor: 0,
        secret,
        _marker: PhantomData,
    };
    let hash = checker.upper(root, None, None)?;
    if &hash != trusted {
        return Err(IndexError::verification("root hash mismatch"));
    }
    if checker.cursor != claimed.len() {
        return Err(IndexError::verification(format!(
            "{} claimed keys not covered by the proof",
            claimed.len() - checker.cursor
        )));
    }
    Ok(())
}

struct Checker<'a, H: Hasher> {
    low: i64,
    high: i64,
    claimed: &'a [i64],
    cursor: usize,
    secret: &'a SecretKeys,
    _marker: PhantomData<H>,
}

impl<'a, H: Hasher> Checker<'a, H> {
    /// 消费接下来的 `count` 个声明 key
    fn take(&mut self, count: usize) -> Result<&'a [i64]> {
        let end = self
            .cursor
            .checked_add(count)
            .filter(|&e| e <= self.claimed.len())
            .ok_or_else(|| IndexError::verification("proof covers more keys than claimed"))?;
        let slice = &self.claimed[self.cursor..end];
        self.cursor = end;
        Ok(slice)
    }

    fn pruned(&self, hash: &HashOutput, lo: Option<i64>, hi: Option<i64>) -> Result<HashOutput> {
        if intersects(lo, hi, self.low, self.high) {
            return Err(IndexError::verification(
                "pruned subtree intersects the query range",
            ));
        }
        Ok(*hash)
    }

    fn upper(&mut self, vo: &UpperVo, lo: Option<i64>, hi: Option<i64>) -> Result<HashOutput> {
        match vo {
            UpperVo::Pruned(hash) => self.pruned(hash, lo, hi),
            UpperVo::Inner { keys, children } => {
                check_fanout(keys, children.len())?;
                let hashes = children
                    .iter()
                    .enumerate()
                    .map(|(i, child)| {
                        let (clo, chi) = child_bounds(keys, i, lo, hi);
                        self.upper(child, clo, chi)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(node_hash::<H>(TAG_UPPER_INNER, keys, &hashes))
            }
            UpperVo::Bottom { keys, leaves } => {
                check_fanout(keys, leaves.len())?;
                let hashes = leaves
                    .iter()
                    .enumerate()
                    .map(|(i, leaf)| {
                        let (clo, chi) = child_bounds(keys, i, lo, hi);
                        self.leaf(leaf, clo, chi)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(node_hash::<H>(TAG_UPPER_BOTTOM, keys, &hashes))
            }
        }
    }

    fn leaf(&mut self, vo: &LeafVo, lo: Option<i64>, hi: Option<i64>) -> Result<HashOutput> {
        let (digest, proof, buffer) = match vo {
            LeafVo::Pruned(hash) => return self.pruned(hash, lo, hi),
            LeafVo::Open {
                digest,
                proof,
                buffer,
            } => (digest, proof, buffer),
        };

        proof.check_shape(digest)?;
        let model_keys = self.take(proof.count())?;
        check_strictly_increasing_claim(model_keys)?;
        let items: Vec<HashOutput> = model_keys
            .iter()
            .map(|&k| leaf_item::<H>(self.secret, k))
            .collect();
        let span = proof.verify::<H>(digest, &items, self.secret)?;
        if intersects(lo, hi, self.low, self.high) {
            check_bounds(span, model_keys, self.low, self.high)?;
        }

        let buffer_hash = match buffer {
            Some(vo) => self.buffer(vo, None, None)?,
            None => ZERO_HASH,
        };
        Ok(connected::leaf_hash::<H>(&digest.nonce, digest.len, &buffer_hash))
    }

    fn buffer(&mut self, vo: &BufferVo, lo: Option<i64>, hi: Option<i64>) -> Result<HashOutput> {
        match vo {
            BufferVo::Pruned(hash) => self.pruned(hash, lo, hi),
            BufferVo::Leaf { len } => {
                let keys = self.take(*len as usize)?;
                Ok(buffer::leaf_hash::<H>(keys))
            }
            BufferVo::Inner { keys, children } => {
                check_fanout(keys, children.len())?;
                let hashes = children
                    .iter()
                    .enumerate()
                    .map(|(i, child)| {
                        let (clo, chi) = child_bounds(keys, i, lo, hi);
                        self.buffer(child, clo, chi)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(buffer::inner_hash::<H>(keys, &hashes))
            }
        }
    }
}

fn check_fanout(keys: &[i64], children: usize) -> Result<()> {
    if children != keys.len() + 1 {
        return Err(IndexError::verification(format!(
            "node with {} separators has {} children",
            keys.len(),
            children
        )));
    }
    Ok(())
}
