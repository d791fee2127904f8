//! 查询优化的认证学习型树
//!
//! 一次性在有序 key 上构建：OptPLA 分段得到叶子，再对每层节点的
//! 第一个 key 重复分段，直到只剩一个根。每个节点携带位置承诺，
//! 内部节点对子节点摘要做承诺。
//!
//! - `build.rs`: 批量构建（逐层并行）
//! - `query.rs`: 区间查询与 VO 生成
//! - `verify.rs`: 客户端校验
//! - `update.rs`: 持久化插入（路径重分段）

mod build;
mod core;
mod node;
mod proof;
mod query;
mod update;
mod verify;


pub use self::core::LearnedTree;
pub use self::node::{InternalNode, LeafNode, LearnedNode};
pub use self::proof::{LearnedProof, VoNode};
pub use self::verify::verify_learned;

pub(crate) use self::node::accumulate_size;
pub(crate) use self::query::extract_leaf;
pub(crate) use self::verify::{check_bounds, check_strictly_increasing_claim};
