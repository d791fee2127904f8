//! LearnedIndex: 认证学习型区间索引的 Rust 实现
//!
//! 本 crate 用分段线性模型替代传统 B 树的内部路由，同时为区间查询生成
//! 可校验的证明（VO）。服务端不可信，客户端持有密钥与根摘要即可确认
//! 结果既正确又完整。
//!
//! # 核心数据结构
//!
//! - **OptPla**: 误差有界的最优分段线性拟合（凸包流式算法）
//! - **PositionalCommitment**: 带随机 nonce 的位置哈希链承诺
//! - **LearnedTree**: 查询优化树，批量构建，节点内按模型预测定位
//! - **BufferedTree**: 更新优化树，叶子带认证缓冲，上层为 B 树
//! - **VersionedIndex**: 版本链 + 分层进位合并的多版本管理
//!
//! # 核心设计决策
//!
//! 1. **持久化**：所有插入返回新树，未改动的子树通过 `Arc` 共享
//! 2. **哈希可替换**：`Hasher` trait，默认 Blake3，可选 Keccak256
//! 3. **区间半开**：查询区间为 `[low, high)`，证明携带两侧边界 key
//! 4. **按版本校验**：每个可查询版本都有独立摘要

pub mod buffered;
pub mod codec;
pub mod commitment;
pub mod config;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod learned;
pub mod pla;
pub mod size;
pub mod traits;
pub mod verifier;
pub mod versioned;

// error.rs 导出
pub use error::{IndexError, Result};

// hash.rs 导出
pub use hash::{Blake3Hasher, HashOutput, Hasher, Keccak256Hasher};

// config.rs 导出
pub use config::{IndexConfig, SecretKeys};

// pla 导出
pub use pla::{Model, OptPla, Segment};

// commitment.rs 导出
pub use commitment::{ChainProof, NodeDigest, PositionalCommitment, Span};

// 两种树导出
pub use buffered::{BufferedProof, BufferedTree};
pub use learned::{LearnedProof, LearnedTree};

// versioned 导出
pub use versioned::{VersionDigest, VersionSnapshot, VersionedIndex, VersionedResult};

// 其他
pub use size::SizeTracker;
pub use traits::{AuthenticatedIndex, QueryResult};
pub use verifier::Verifier;
