//! 多版本查询结果与摘要

use serde::{Deserialize, Serialize};

use crate::buffered::{verify_buffered, BufferedProof};
use crate::commitment::NodeDigest;
use crate::config::SecretKeys;
use crate::error::{check_range, IndexError, Result};
use crate::hash::{HashOutput, Hasher};
use crate::learned::{verify_learned, LearnedProof};
use crate::traits::QueryResult;

/// 某一版本的可信摘要
///
/// 由快速部分（链上该版本的更新优化树）、待合并树以及各层学习型树的根摘要组成，
/// 空组件为 `None`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDigest {
    pub version: u64,
    pub fast: Option<HashOutput>,
    pub pending: Option<HashOutput>,
    pub levels: Vec<Option<NodeDigest>>,
}

/// 某一版本上的区间查询结果，每个非空组件各带一份结果与 VO
#[derive(Debug, Clone)]
pub struct VersionedResult {
    pub version: u64,
    pub low: i64,
    pub high: i64,
    pub fast: Option<QueryResult<BufferedProof>>,
    pub pending: Option<QueryResult<BufferedProof>>,
    pub levels: Vec<Option<QueryResult<LearnedProof>>>,
}

impl VersionedResult {
    /// 全部组件在 `[low, high)` 内结果的并集，升序
    pub fn results(&self) -> Vec<i64> {
        let mut all: Vec<i64> = self
            .fast
            .iter()
            .chain(self.pending.iter())
            .flat_map(|r| r.results())
            .chain(self.levels.iter().flatten().flat_map(|r| r.results()))
            .collect();
        all.sort_unstable();
        all
    }

    /// 全部组件 VO 的字节数之和
    pub fn vo_size(&self) -> u64 {
        self.fast.iter().map(|r| r.vo_size()).sum::<u64>()
            + self.pending.iter().map(|r| r.vo_size()).sum::<u64>()
            + self
                .levels
                .iter()
                .flatten()
                .map(|r| r.vo_size())
                .sum::<u64>()
    }
}

/// 校验某一版本的查询结果
///
/// 结果的组件形状必须与摘要一致，每个组件分别用各自的可信根校验。
pub fn verify_version<H: Hasher>(
    digest: &VersionDigest,
    low: i64,
    high: i64,
    result: &VersionedResult,
    secret: &SecretKeys,
) -> Result<()> {
    check_range(low, high)?;
    if result.version != digest.version {
        return Err(IndexError::verification(format!(
            "result for version {} checked against digest of version {}",
            result.version, digest.version
        )));
    }
    if result.low != low || result.high != high {
        return Err(IndexError::verification("result answers a different range"));
    }

    check_buffered::<H>("fast", digest.fast.as_ref(), result.fast.as_ref(), low, high, secret)?;
    check_buffered::<H>(
        "pending",
        digest.pending.as_ref(),
        result.pending.as_ref(),
        low,
        high,
        secret,
    )?;

    if digest.levels.len() != result.levels.len() {
        return Err(IndexError::verification(format!(
            "expected {} levels, got {}",
            digest.levels.len(),
            result.levels.len()
        )));
    }
    for (i, (trusted, part)) in digest.levels.iter().zip(&result.levels).enumerate() {
        match (trusted, part) {
            (None, None) => {}
            (Some(trusted), Some(part)) => {
                check_part_range(part, low, high)?;
                verify_learned::<H>(Some(trusted), low, high, &part.proof, &part.keys, secret)
                    .map_err(|e| IndexError::verification(format!("level {}: {}", i, e)))?;
            }
            _ => {
                return Err(IndexError::verification(format!(
                    "level {} does not match the digest",
                    i
                )))
            }
        }
    }
    Ok(())
}

fn check_buffered<H: Hasher>(
    name: &str,
    trusted: Option<&HashOutput>,
    part: Option<&QueryResult<BufferedProof>>,
    low: i64,
    high: i64,
    secret: &SecretKeys,
) -> Result<()> {
    match (trusted, part) {
        (None, None) => Ok(()),
        (Some(trusted), Some(part)) => {
            check_part_range(part, low, high)?;
            verify_buffered::<H>(Some(trusted), low, high, &part.proof, &part.keys, secret)
                .map_err(|e| IndexError::verification(format!("{}: {}", name, e)))
        }
        _ => Err(IndexError::verification(format!(
            "{} component does not match the digest",
            name
        ))),
    }
}

fn check_part_range<P>(part: &QueryResult<P>, low: i64, high: i64) -> Result<()> {
    if part.low != low || part.high != high {
        return Err(IndexError::verification("component answers a different range"));
    }
    Ok(())
}
