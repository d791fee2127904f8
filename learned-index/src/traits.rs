//! 两种树共用的查询结果与接口

use rayon::prelude::*;
use serde::{de::DeserializeOwned, Serialize};

use crate::codec::{encoded_size, from_bytes, to_bytes};
use crate::error::Result;

/// 一次区间查询的结果
///
/// `keys` 为服务端声明的原始结果（含左右边界 key，顺序与证明一致），
/// [`QueryResult::results`] 给出对外可见的 `[low, high)` 部分。
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<P> {
    pub low: i64,
    pub high: i64,
    pub keys: Vec<i64>,
    pub proof: P,
}

impl<P: Serialize + DeserializeOwned> QueryResult<P> {
    /// `[low, high)` 内的 key，升序
    pub fn results(&self) -> Vec<i64> {
        let mut visible: Vec<i64> = self
            .keys
            .iter()
            .copied()
            .filter(|&k| k >= self.low && k < self.high)
            .collect();
        visible.sort_unstable();
        visible
    }

    /// VO 序列化后的字节数
    pub fn vo_size(&self) -> u64 {
        encoded_size(&self.proof)
    }

    /// 编码 VO
    pub fn proof_bytes(&self) -> Result<Vec<u8>> {
        to_bytes(&self.proof)
    }

    /// 解码 VO
    pub fn decode_proof(bytes: &[u8]) -> Result<P> {
        from_bytes(bytes)
    }
}

/// 认证区间索引
///
/// 由查询优化树与更新优化树实现。所有修改都是持久化的：
/// `insert` 返回新树，原树保持可查询、可校验。
pub trait AuthenticatedIndex: Clone + Send + Sync + Sized {
    /// 可信根摘要
    type Digest: Clone + PartialEq + std::fmt::Debug + Send + Sync;
    /// 查询证明
    type Proof: Serialize + DeserializeOwned + Clone + Send + Sync;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 根摘要，空树为 `None`
    fn digest(&self) -> Option<Self::Digest>;

    /// 持久化插入
    fn insert(&self, key: i64) -> Result<Self>;

    fn contains(&self, key: i64) -> bool;

    /// 全部 key，升序
    fn keys(&self) -> Vec<i64>;

    /// 区间查询，返回结果与 VO
    fn range_query(&self, low: i64, high: i64) -> Result<QueryResult<Self::Proof>>;

    /// 以本树根摘要校验声明结果
    fn verify_detailed(
        &self,
        low: i64,
        high: i64,
        proof: &Self::Proof,
        claimed: &[i64],
    ) -> Result<()>;

    /// 校验，失败时返回 false
    fn verify(&self, low: i64, high: i64, proof: &Self::Proof, claimed: &[i64]) -> bool {
        match self.verify_detailed(low, high, proof, claimed) {
            Ok(()) => true,
            Err(e) => {
                log::trace!("range [{}, {}) rejected: {}", low, high, e);
                false
            }
        }
    }

    /// 批量区间查询，各区间独立并行回答
    fn range_query_batch(&self, ranges: &[(i64, i64)]) -> Result<Vec<QueryResult<Self::Proof>>> {
        ranges
            .par_iter()
            .map(|&(low, high)| self.range_query(low, high))
            .collect()
    }

    /// 节点内容序列化后的总字节数
    fn index_size(&self) -> u64;
}
