//! 学习型树的验证对象（VO）

use serde::{Deserialize, Serialize};

use crate::commitment::{ChainProof, NodeDigest};

/// 一个被访问节点的 VO 片段
///
/// 结构与查询路径一致：内部节点的 `children` 依次对应 `proof`
/// 覆盖的 `[start, end]` 中每个子节点。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoNode {
    Leaf {
        digest: NodeDigest,
        proof: ChainProof,
    },
    Internal {
        digest: NodeDigest,
        proof: ChainProof,
        children: Vec<VoNode>,
    },
}

impl VoNode {
    #[inline]
    pub fn digest(&self) -> &NodeDigest {
        match self {
            VoNode::Leaf { digest, .. } | VoNode::Internal { digest, .. } => digest,
        }
    }

    #[inline]
    pub fn digest_mut(&mut self) -> &mut NodeDigest {
        match self {
            VoNode::Leaf { digest, .. } | VoNode::Internal { digest, .. } => digest,
        }
    }

    #[inline]
    pub fn proof(&self) -> &ChainProof {
        match self {
            VoNode::Leaf { proof, .. } | VoNode::Internal { proof, .. } => proof,
        }
    }

    #[inline]
    pub fn proof_mut(&mut self) -> &mut ChainProof {
        match self {
            VoNode::Leaf { proof, .. } | VoNode::Internal { proof, .. } => proof,
        }
    }
}

/// 学习型树的查询证明，空树为 `None`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnedProof {
    pub root: Option<VoNode>,
}
