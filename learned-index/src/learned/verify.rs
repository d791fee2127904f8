//! 客户端校验

use crate::commitment::{NodeDigest, Span};
use crate::config::SecretKeys;
use crate::crypto::leaf_item;
use crate::error::{check_range, IndexError, Result};
use crate::hash::{HashOutput, Hasher};

use super::core::LearnedTree;
use super::proof::{LearnedProof, VoNode};

impl<H: Hasher> LearnedTree<H> {
    /// 以本树的根摘要校验
    pub fn verify_detailed(
        &self,
        low: i64,
        high: i64,
        proof: &LearnedProof,
        claimed: &[i64],
    ) -> Result<()> {
        verify_learned::<H>(
            self.root_digest().as_ref(),
            low,
            high,
            proof,
            claimed,
            &self.secret,
        )
    }

    pub fn verify(&self, low: i64, high: i64, proof: &LearnedProof, claimed: &[i64]) -> bool {
        self.verify_detailed(low, high, proof, claimed).is_ok()
    }
}

/// 校验学习型树的查询结果
///
/// # 参数
/// - `trusted`: 可信根摘要，空树为 `None`
/// - `low`/`high`: 查询区间
/// - `proof`: 服务端返回的 VO
/// - `claimed`: 服务端声明的原始结果（含边界 key）
/// - `secret`: 承诺密钥
///
/// # 返回
/// 承诺链全部吻合、声明结果严格递增且两端边界都已确认时返回 `Ok(())`
pub fn verify_learned<H: Hasher>(
    trusted: Option<&NodeDigest>,
    low: i64,
    high: i64,
    proof: &LearnedProof,
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

    if root.digest() != trusted {
        return Err(IndexError::verification("root digest mismatch"));
    }
    check_strictly_increasing_claim(claimed)?;

    let mut cursor = 0;
    let span = verify_node::<H>(root, claimed, &mut cursor, secret)?;
    if cursor != claimed.len() {
        return Err(IndexError::verification(format!(
            "{} claimed keys not covered by the proof",
            claimed.len() - cursor
        )));
    }

    check_bounds(span, claimed, low, high)
}

/// 声明结果必须严格递增，否则同一节点内的重排无法被异或累加器发现
pub(crate) fn check_strictly_increasing_claim(claimed: &[i64]) -> Result<()> {
    if claimed.windows(2).any(|w| w[0] >= w[1]) {
        return Err(IndexError::verification(
            "claimed keys are not strictly increasing",
        ));
    }
    Ok(())
}

/// 检查左右边界：要么到达全局端点，要么越过查询区间
pub(crate) fn check_bounds(span: Span, claimed: &[i64], low: i64, high: i64) -> Result<()> {
    let (first, last) = match (claimed.first(), claimed.last()) {
        (Some(&f), Some(&l)) => (f, l),
        _ => return Err(IndexError::verification("non-empty tree returned no keys")),
    };
    if !(span.at_start || first <= low) {
        return Err(IndexError::verification("missing left boundary"));
    }
    if !(span.at_end || last >= high) {
        return Err(IndexError::verification("missing right boundary"));
    }
    Ok(())
}

/// 递归校验节点，消费 `claimed[cursor..]` 中属于该子树的 key
pub(crate) fn verify_node<H: Hasher>(
    vo: &VoNode,
    claimed: &[i64],
    cursor: &mut usize,
    secret: &SecretKeys,
) -> Result<Span> {
    match vo {
        VoNode::Leaf { digest, proof } => {
            proof.check_shape(digest)?;
            let count = proof.count();
            let end = cursor
                .checked_add(count)
                .filter(|&e| e <= claimed.len())
                .ok_or_else(|| {
                    IndexError::verification("leaf proof covers more keys than claimed")
                })?;
            let items: Vec<HashOutput> = claimed[*cursor..end]
                .iter()
                .map(|&k| leaf_item::<H>(secret, k))
                .collect();
            let span = proof.verify::<H>(digest, &items, secret)?;
            *cursor = end;
            Ok(span)
        }
        VoNode::Internal {
            digest,
            proof,
            children,
        } => {
            proof.check_shape(digest)?;
            if children.is_empty() || children.len() != proof.count() {
                return Err(IndexError::verification(
                    "internal proof range does not match visited children",
                ));
            }
            let items: Vec<HashOutput> = children
                .iter()
                .map(|c| c.digest().item::<H>(secret))
                .collect();
            let own = proof.verify::<H>(digest, &items, secret)?;

            let last = children.len() - 1;
            let mut first_span = Span::default();
            let mut last_span = Span::default();
            for (i, child) in children.iter().enumerate() {
                let span = verify_node::<H>(child, claimed, cursor, secret)?;
                if i > 0 && !span.at_start {
                    return Err(IndexError::verification("gap before a visited child"));
                }
                if i < last && !span.at_end {
                    return Err(IndexError::verification("gap after a visited child"));
                }
                if i == 0 {
                    first_span = span;
                }
                if i == last {
                    last_span = span;
                }
            }

            Ok(Span {
                at_start: own.at_start && first_span.at_start,
                at_end: own.at_end && last_span.at_end,
            })
        }
    }
}
