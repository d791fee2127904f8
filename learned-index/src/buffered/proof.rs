//! 更新优化树的验证对象（VO）
//!
//! 与查询区间相交的子树必须展开，不相交的子树只给出哈希。
//! 声明结果的顺序：按叶子顺序，每个展开叶子先是模型 key，
//! 再是缓冲中展开叶子的 key（深度优先）。

use serde::{Deserialize, Serialize};

use crate::commitment::{ChainProof, NodeDigest};
use crate::hash::HashOutput;

/// 上层节点 VO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpperVo {
    Pruned(HashOutput),
    Inner {
        keys: Vec<i64>,
        children: Vec<UpperVo>,
    },
    Bottom {
        keys: Vec<i64>,
        leaves: Vec<LeafVo>,
    },
}

/// 连接叶子 VO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeafVo {
    Pruned(HashOutput),
    Open {
        digest: NodeDigest,
        proof: ChainProof,
        buffer: Option<BufferVo>,
    },
}

/// 缓冲节点 VO，叶子只给出 key 数，key 本身来自声明结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferVo {
    Pruned(HashOutput),
    Leaf {
        len: u32,
    },
    Inner {
        keys: Vec<i64>,
        children: Vec<BufferVo>,
    },
}

/// 更新优化树的查询证明，空树为 `None`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferedProof {
    pub root: Option<UpperVo>,
}
