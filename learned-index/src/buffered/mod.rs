//! 更新优化的认证学习型树
//!
//! 每个叶子是一个 [`ConnectedLeaf`]：学习型叶子模型 + 小型认证缓冲。
//! 插入先进入缓冲，缓冲满时局部重新分段；叶子之上是按分隔 key
//! 路由的 B 树，节点超过扇出时均衡分裂。
//!
//! - `buffer.rs`: 持久化 Merkle B+ 树缓冲
//! - `connected.rs`: 连接叶子与重训练
//! - `node.rs`: 上层 B 树节点
//! - `insert.rs`: 持久化插入
//! - `query.rs` / `verify.rs`: 区间查询与校验

mod buffer;
mod connected;
mod core;
mod insert;
mod node;
mod proof;
mod query;
mod verify;

#[cfg(test)]
mod tests;

pub use self::buffer::BufferNode;
pub use self::connected::ConnectedLeaf;
pub use self::core::BufferedTree;
pub use self::node::UpperNode;
pub use self::proof::{BufferVo, BufferedProof, LeafVo, UpperVo};
pub use self::verify::verify_buffered;
